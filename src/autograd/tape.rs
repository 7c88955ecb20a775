//! Operation tape for reverse-mode differentiation over graphs

use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::ops::{compose, score};
use ndarray::Array1;

/// Operation kinds that can be replayed backwards, each carrying the side
/// information its gradient rule needs.
///
/// Leaves (graphs built directly by the caller) have no entry on the tape.
#[derive(Debug, Clone)]
pub enum GradOp {
    /// Output arc `k` was formed from `arc_sources[k] = (first arc, second arc)`;
    /// one side is `None` when the other advanced alone over ε.
    Compose {
        arc_sources: Vec<(Option<usize>, Option<usize>)>,
    },
    /// Forward accumulators from the forward pass.
    ForwardScore {
        order: Vec<usize>,
        alpha: Vec<f64>,
        score: f64,
    },
    /// Arcs of the best path.
    ViterbiScore { path: Vec<usize> },
    /// Arcs of the best path; output arc `k` copies `path[k]`.
    ViterbiPath { path: Vec<usize> },
    Add,
    Subtract,
    Negate,
    /// Output arc `k` copies input arc `k`.
    Clone,
    ProjectInput,
    ProjectOutput,
    /// Arcs of input `i` occupy `arc_offsets[i]..arc_offsets[i + 1]` of the output.
    Union { arc_offsets: Vec<usize> },
    /// `(input, arc)` copied by each output arc; `None` for ε bridge arcs.
    Concat {
        arc_sources: Vec<Option<(usize, usize)>>,
    },
    /// Input arc copied by each output arc; `None` for ε arcs added by the closure.
    Closure { arc_sources: Vec<Option<usize>> },
}

impl GradOp {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            GradOp::Compose { .. } => "compose",
            GradOp::ForwardScore { .. } => "forward_score",
            GradOp::ViterbiScore { .. } => "viterbi_score",
            GradOp::ViterbiPath { .. } => "viterbi_path",
            GradOp::Add => "add",
            GradOp::Subtract => "subtract",
            GradOp::Negate => "negate",
            GradOp::Clone => "clone",
            GradOp::ProjectInput => "project_input",
            GradOp::ProjectOutput => "project_output",
            GradOp::Union { .. } => "union",
            GradOp::Concat { .. } => "concat",
            GradOp::Closure { .. } => "closure",
        }
    }

    /// Gradient contribution for each input given the gradient on the output.
    ///
    /// Inputs that do not track gradients get `None`.
    pub(crate) fn input_grads(
        &self,
        inputs: &[Graph],
        grad: &Array1<f32>,
    ) -> Result<Vec<Option<Array1<f32>>>> {
        let wants: Vec<bool> = inputs.iter().map(Graph::calc_grad).collect();
        let grads = match self {
            GradOp::Compose { arc_sources } => {
                let (first, second) = compose::compose_grad(
                    arc_sources,
                    inputs[0].num_arcs(),
                    inputs[1].num_arcs(),
                    grad,
                );
                vec![Some(first), Some(second)]
            }
            GradOp::ForwardScore {
                order,
                alpha,
                score,
            } => {
                if !wants[0] {
                    return Ok(vec![None]);
                }
                let data = inputs[0].data();
                vec![Some(score::forward_score_grad(
                    &data,
                    order,
                    alpha,
                    *score,
                    scalar_grad(grad)?,
                ))]
            }
            GradOp::ViterbiScore { path } => {
                let upstream = scalar_grad(grad)?;
                let mut input_grad = Array1::zeros(inputs[0].num_arcs());
                for &arc in path {
                    input_grad[arc] += upstream;
                }
                vec![Some(input_grad)]
            }
            GradOp::ViterbiPath { path } => {
                let mut input_grad = Array1::zeros(inputs[0].num_arcs());
                for (k, &arc) in path.iter().enumerate() {
                    input_grad[arc] += grad[k];
                }
                vec![Some(input_grad)]
            }
            GradOp::Add => vec![Some(grad.clone()), Some(grad.clone())],
            GradOp::Subtract => vec![Some(grad.clone()), Some(-grad)],
            GradOp::Negate => vec![Some(-grad)],
            GradOp::Clone | GradOp::ProjectInput | GradOp::ProjectOutput => {
                vec![Some(grad.clone())]
            }
            GradOp::Union { arc_offsets } => arc_offsets
                .windows(2)
                .map(|w| Some(grad.slice(ndarray::s![w[0]..w[1]]).to_owned()))
                .collect(),
            GradOp::Concat { arc_sources } => {
                let mut input_grads: Vec<Array1<f32>> = inputs
                    .iter()
                    .map(|g| Array1::zeros(g.num_arcs()))
                    .collect();
                for (k, source) in arc_sources.iter().enumerate() {
                    if let Some((input, arc)) = source {
                        input_grads[*input][*arc] += grad[k];
                    }
                }
                input_grads.into_iter().map(Some).collect()
            }
            GradOp::Closure { arc_sources } => {
                let mut input_grad = Array1::zeros(inputs[0].num_arcs());
                for (k, source) in arc_sources.iter().enumerate() {
                    if let Some(arc) = source {
                        input_grad[*arc] += grad[k];
                    }
                }
                vec![Some(input_grad)]
            }
        };
        Ok(grads
            .into_iter()
            .zip(wants)
            .map(|(g, want)| if want { g } else { None })
            .collect())
    }
}

fn scalar_grad(grad: &Array1<f32>) -> Result<f32> {
    if grad.len() != 1 {
        return Err(Error::Shape(format!(
            "scalar output expected a single gradient entry, got {}",
            grad.len()
        )));
    }
    Ok(grad[0])
}

/// One recorded operation
#[derive(Debug, Clone)]
pub struct TapeEntry {
    pub op: GradOp,
    pub inputs: Vec<Graph>,
    pub output: Graph,
}

/// Operations in creation order. Entries hold shared handles to their input
/// and output graphs, so every graph lives at least as long as the tape.
#[derive(Debug, Default)]
pub struct Tape {
    entries: Vec<TapeEntry>,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: GradOp, inputs: Vec<Graph>, output: Graph) {
        log::trace!(
            "tape[{}]: {} -> graph {}",
            self.entries.len(),
            op.name(),
            output.id()
        );
        self.entries.push(TapeEntry { op, inputs, output });
    }

    pub fn entries(&self) -> &[TapeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Index of the entry that produced `graph`
    pub fn producer_of(&self, graph: &Graph) -> Option<usize> {
        self.entries
            .iter()
            .rposition(|entry| entry.output.same_as(graph))
    }
}
