//! Computation context owning the tape of one loss computation

use super::backward::backward_from;
use super::tape::{GradOp, Tape};
use crate::error::Result;
use crate::graph::Graph;
use crate::ops::{compose, scalar, score, structure};

/// Context for building differentiable graph computations.
///
/// Every operation called through the context records a tape entry when
/// recording is enabled and at least one input tracks gradients. Create one
/// context per loss, call [`Context::backward`], read the gradients off the
/// leaf graphs, then drop or [`clear`](Context::clear) it.
pub struct Context {
    tape: Tape,
    recording: bool,
}

impl Context {
    /// Create a new recording context
    pub fn new() -> Self {
        Self {
            tape: Tape::new(),
            recording: true,
        }
    }

    /// Record operations for gradient computation
    pub fn enable_grad(&mut self) {
        self.recording = true;
    }

    /// Stop recording; outputs no longer track gradients
    pub fn disable_grad(&mut self) {
        self.recording = false;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    /// Drop all recorded entries
    pub fn clear(&mut self) {
        self.tape.clear();
    }

    fn record(&mut self, inputs: Vec<Graph>, (mut output, op): (Graph, GradOp)) -> Graph {
        if !self.recording {
            output.set_calc_grad(false);
        } else if output.calc_grad() {
            self.tape.push(op, inputs, output.clone());
        }
        output
    }

    /// Compose two graphs (see [`crate::ops::compose`])
    pub fn compose(&mut self, first: &Graph, second: &Graph) -> Result<Graph> {
        let out = compose::compose_op(first, second)?;
        Ok(self.record(vec![first.clone(), second.clone()], out))
    }

    /// Log-sum-exp score over all accepting paths, as a scalar graph
    pub fn forward_score(&mut self, graph: &Graph) -> Result<Graph> {
        let out = score::forward_score_op(graph)?;
        Ok(self.record(vec![graph.clone()], out))
    }

    /// Score of the best accepting path, as a scalar graph
    pub fn viterbi_score(&mut self, graph: &Graph) -> Result<Graph> {
        let out = score::viterbi_score_op(graph)?;
        Ok(self.record(vec![graph.clone()], out))
    }

    /// Best accepting path as a linear graph
    pub fn viterbi_path(&mut self, graph: &Graph) -> Result<Graph> {
        let out = score::viterbi_path_op(graph)?;
        Ok(self.record(vec![graph.clone()], out))
    }

    pub fn add(&mut self, a: &Graph, b: &Graph) -> Result<Graph> {
        let out = scalar::add_op(a, b)?;
        Ok(self.record(vec![a.clone(), b.clone()], out))
    }

    pub fn subtract(&mut self, a: &Graph, b: &Graph) -> Result<Graph> {
        let out = scalar::subtract_op(a, b)?;
        Ok(self.record(vec![a.clone(), b.clone()], out))
    }

    pub fn negate(&mut self, a: &Graph) -> Result<Graph> {
        let out = scalar::negate_op(a)?;
        Ok(self.record(vec![a.clone()], out))
    }

    /// Independent copy of `graph` whose gradient flows back to it
    pub fn clone_graph(&mut self, graph: &Graph) -> Graph {
        let out = structure::clone_op(graph);
        self.record(vec![graph.clone()], out)
    }

    pub fn project_input(&mut self, graph: &Graph) -> Graph {
        let out = structure::project_input_op(graph);
        self.record(vec![graph.clone()], out)
    }

    pub fn project_output(&mut self, graph: &Graph) -> Graph {
        let out = structure::project_output_op(graph);
        self.record(vec![graph.clone()], out)
    }

    pub fn union(&mut self, graphs: &[Graph]) -> Graph {
        let out = structure::union_op(graphs);
        self.record(graphs.to_vec(), out)
    }

    pub fn concat(&mut self, graphs: &[Graph]) -> Graph {
        let out = structure::concat_op(graphs);
        self.record(graphs.to_vec(), out)
    }

    pub fn closure(&mut self, graph: &Graph) -> Graph {
        let out = structure::closure_op(graph);
        self.record(vec![graph.clone()], out)
    }

    /// Run the backward pass from a graph produced through this context
    pub fn backward(&self, loss: &Graph) -> Result<()> {
        backward_from(&self.tape, loss)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
