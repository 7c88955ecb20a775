//! Transducer composition
//!
//! A state of the composed graph is a pair of nodes `(n1, n2)` plus an ε
//! filter bit. Three kinds of move leave a state:
//!
//! - match: an arc of the first graph whose output label equals the input
//!   label of an arc of the second graph (neither ε);
//! - first alone: an arc of the first graph with ε output label;
//! - second alone: an arc of the second graph with ε input label.
//!
//! The filter bit is set after a second-alone move and forbids a first-alone
//! move until the next match, so each pair of input paths is aligned exactly
//! once. Only states that are both reachable from a start pair and able to
//! reach an accept pair are kept.

use crate::autograd::GradOp;
use crate::error::Result;
use crate::graph::{Graph, GraphData, EPSILON};
use ndarray::Array1;
use std::collections::{HashMap, VecDeque};

type State = (usize, usize, bool);

/// Composition result with, for every output arc, the input arcs it came from
pub(crate) struct Composition {
    pub(crate) graph: GraphData,
    pub(crate) arc_sources: Vec<(Option<usize>, Option<usize>)>,
}

struct PendingArc {
    src: usize,
    dst: usize,
    ilabel: i32,
    olabel: i32,
    weight: f32,
    sources: (Option<usize>, Option<usize>),
}

struct Explorer<'a> {
    first: &'a GraphData,
    second: &'a GraphData,
    states: Vec<State>,
    index: HashMap<State, usize>,
    queue: VecDeque<usize>,
    arcs: Vec<PendingArc>,
}

impl<'a> Explorer<'a> {
    fn new(first: &'a GraphData, second: &'a GraphData) -> Self {
        Self {
            first,
            second,
            states: Vec::new(),
            index: HashMap::new(),
            queue: VecDeque::new(),
            arcs: Vec::new(),
        }
    }

    fn state_id(&mut self, state: State) -> usize {
        if let Some(&id) = self.index.get(&state) {
            return id;
        }
        let id = self.states.len();
        self.states.push(state);
        self.index.insert(state, id);
        self.queue.push_back(id);
        id
    }

    fn emit(&mut self, src: usize, dst: State, arc1: Option<usize>, arc2: Option<usize>) {
        let dst = self.state_id(dst);
        let (ilabel, w1) = match arc1 {
            Some(a) => (self.first.arcs[a].ilabel, self.first.weights[a]),
            None => (EPSILON, 0.0),
        };
        let (olabel, w2) = match arc2 {
            Some(a) => (self.second.arcs[a].olabel, self.second.weights[a]),
            None => (EPSILON, 0.0),
        };
        self.arcs.push(PendingArc {
            src,
            dst,
            ilabel,
            olabel,
            weight: w1 + w2,
            sources: (arc1, arc2),
        });
    }

    fn explore(&mut self) {
        let first = self.first;
        let second = self.second;
        for &s1 in &first.start {
            for &s2 in &second.start {
                self.state_id((s1, s2, false));
            }
        }
        while let Some(id) = self.queue.pop_front() {
            let (n1, n2, blocked) = self.states[id];
            self.matches(id, n1, n2);
            if !blocked {
                for &a1 in &first.nodes[n1].out_arcs {
                    let arc = first.arcs[a1];
                    if arc.olabel == EPSILON {
                        self.emit(id, (arc.dst, n2, false), Some(a1), None);
                    }
                }
            }
            for &a2 in &second.nodes[n2].out_arcs {
                let arc = second.arcs[a2];
                if arc.ilabel == EPSILON {
                    self.emit(id, (n1, arc.dst, true), None, Some(a2));
                }
            }
        }
    }

    fn matches(&mut self, id: usize, n1: usize, n2: usize) {
        let first = self.first;
        let second = self.second;
        let out1 = &first.nodes[n1].out_arcs;
        let out2 = &second.nodes[n2].out_arcs;
        let label1 = |k: usize| first.arcs[out1[k]].olabel;
        let label2 = |k: usize| second.arcs[out2[k]].ilabel;

        if first.olabel_sorted && second.ilabel_sorted {
            let (mut i, mut j) = (0, 0);
            while i < out1.len() && j < out2.len() {
                let (l1, l2) = (label1(i), label2(j));
                if l1 == EPSILON {
                    i += 1;
                } else if l2 == EPSILON {
                    j += 1;
                } else if l1 < l2 {
                    i += 1;
                } else if l1 > l2 {
                    j += 1;
                } else {
                    let mut i_end = i;
                    while i_end < out1.len() && label1(i_end) == l1 {
                        i_end += 1;
                    }
                    let mut j_end = j;
                    while j_end < out2.len() && label2(j_end) == l2 {
                        j_end += 1;
                    }
                    for &a1 in &out1[i..i_end] {
                        for &a2 in &out2[j..j_end] {
                            let dst = (first.arcs[a1].dst, second.arcs[a2].dst, false);
                            self.emit(id, dst, Some(a1), Some(a2));
                        }
                    }
                    i = i_end;
                    j = j_end;
                }
            }
        } else {
            for &a1 in out1 {
                let arc1 = first.arcs[a1];
                if arc1.olabel == EPSILON {
                    continue;
                }
                for &a2 in out2 {
                    let arc2 = second.arcs[a2];
                    if arc2.ilabel == arc1.olabel {
                        self.emit(id, (arc1.dst, arc2.dst, false), Some(a1), Some(a2));
                    }
                }
            }
        }
    }

    /// Keep only states from which an accepting state is reachable.
    fn finish(self, calc_grad: bool) -> Composition {
        let n = self.states.len();
        let is_accept = |&(n1, n2, _): &State| {
            self.first.nodes[n1].is_accept && self.second.nodes[n2].is_accept
        };

        let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); n];
        for arc in &self.arcs {
            incoming[arc.dst].push(arc.src);
        }
        let mut live = vec![false; n];
        let mut stack: Vec<usize> = Vec::new();
        for (id, state) in self.states.iter().enumerate() {
            if is_accept(state) {
                live[id] = true;
                stack.push(id);
            }
        }
        while let Some(id) = stack.pop() {
            for &src in &incoming[id] {
                if !live[src] {
                    live[src] = true;
                    stack.push(src);
                }
            }
        }

        let mut graph = GraphData::new(calc_grad);
        let mut remap = vec![usize::MAX; n];
        for (id, state) in self.states.iter().enumerate() {
            if live[id] {
                let (n1, n2, blocked) = *state;
                let is_start = !blocked
                    && self.first.nodes[n1].is_start
                    && self.second.nodes[n2].is_start;
                remap[id] = graph.add_node(is_start, is_accept(state));
            }
        }

        let mut arc_sources = Vec::new();
        for arc in &self.arcs {
            if live[arc.src] && live[arc.dst] {
                // Both endpoints were just added, so the indices are valid.
                let _ = graph.add_arc(
                    remap[arc.src],
                    remap[arc.dst],
                    arc.ilabel,
                    arc.olabel,
                    arc.weight,
                );
                arc_sources.push(arc.sources);
            }
        }

        log::debug!(
            "compose: explored {} states / {} arcs, kept {} / {}",
            n,
            self.arcs.len(),
            graph.num_nodes(),
            graph.num_arcs()
        );

        Composition { graph, arc_sources }
    }
}

/// Compose two graphs given as raw data
pub(crate) fn compose_data(first: &GraphData, second: &GraphData) -> Result<Composition> {
    first.check_terminals("compose (first graph)")?;
    second.check_terminals("compose (second graph)")?;
    let mut explorer = Explorer::new(first, second);
    explorer.explore();
    Ok(explorer.finish(first.calc_grad || second.calc_grad))
}

pub(crate) fn compose_op(first: &Graph, second: &Graph) -> Result<(Graph, GradOp)> {
    let composition = compose_data(&first.data(), &second.data())?;
    Ok((
        Graph::from_data(composition.graph),
        GradOp::Compose {
            arc_sources: composition.arc_sources,
        },
    ))
}

/// Compose `first` with `second`.
///
/// Arcs match when the output label of the first graph's arc equals the input
/// label of the second graph's arc. The composed arc keeps the first input
/// label and the second output label, and its weight is the sum of both
/// weights. When the first graph is sorted by output label and the second by
/// input label (see [`Graph::arc_sort`]) arcs are matched with a linear merge
/// per state instead of a full cross product.
///
/// A composition without any accepting path is an empty graph whose forward
/// score is `-inf`. The result does not track gradients; use
/// [`Context::compose`](crate::Context::compose) for that.
pub fn compose(first: &Graph, second: &Graph) -> Result<Graph> {
    let (mut graph, _) = compose_op(first, second)?;
    graph.set_calc_grad(false);
    Ok(graph)
}

/// Split the gradient of a composed graph onto the two inputs.
pub(crate) fn compose_grad(
    arc_sources: &[(Option<usize>, Option<usize>)],
    first_arcs: usize,
    second_arcs: usize,
    grad: &Array1<f32>,
) -> (Array1<f32>, Array1<f32>) {
    let mut first = Array1::zeros(first_arcs);
    let mut second = Array1::zeros(second_arcs);
    for (k, (a1, a2)) in arc_sources.iter().enumerate() {
        if let Some(a1) = a1 {
            first[*a1] += grad[k];
        }
        if let Some(a2) = a2 {
            second[*a2] += grad[k];
        }
    }
    (first, second)
}
