//! Forward (log-sum-exp) and Viterbi (max) scoring
//!
//! Both run one dynamic program over the nodes in topological order. Start
//! nodes are seeded with 0; every other node starts at `-inf`. The graph that
//! is scored must be acyclic. A transition graph with self-loops is only safe
//! to score after composition with a finite emissions graph.

use crate::autograd::GradOp;
use crate::error::{Error, Result};
use crate::graph::{scalar_graph, Graph, GraphData};
use ndarray::Array1;

/// Numerically stable `ln(sum(exp(v)))`.
pub(crate) fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY || max == f64::INFINITY {
        return max;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Kahn's algorithm; ties resolved by node index.
pub(crate) fn topological_order(graph: &GraphData) -> Result<Vec<usize>> {
    let n = graph.num_nodes();
    let mut in_degree: Vec<usize> = graph.nodes.iter().map(|n| n.in_arcs.len()).collect();
    let mut ready: std::collections::VecDeque<usize> =
        (0..n).filter(|&node| in_degree[node] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(node) = ready.pop_front() {
        order.push(node);
        for &arc in &graph.nodes[node].out_arcs {
            let dst = graph.arcs[arc].dst;
            in_degree[dst] -= 1;
            if in_degree[dst] == 0 {
                ready.push_back(dst);
            }
        }
    }
    if order.len() != n {
        return Err(Error::Structural(format!(
            "graph contains a cycle ({} of {n} nodes ordered)",
            order.len()
        )));
    }
    Ok(order)
}

/// Forward accumulators of a graph
#[derive(Debug, Clone)]
pub(crate) struct ForwardPass {
    pub(crate) order: Vec<usize>,
    pub(crate) alpha: Vec<f64>,
    pub(crate) score: f64,
}

pub(crate) fn forward_pass(graph: &GraphData) -> Result<ForwardPass> {
    graph.check_terminals("forward_score")?;
    let order = topological_order(graph)?;
    let mut alpha = vec![f64::NEG_INFINITY; graph.num_nodes()];
    let mut terms = Vec::new();
    for &node in &order {
        terms.clear();
        if graph.nodes[node].is_start {
            terms.push(0.0);
        }
        for &arc in &graph.nodes[node].in_arcs {
            let src = graph.arcs[arc].src;
            terms.push(alpha[src] + f64::from(graph.weights[arc]));
        }
        alpha[node] = log_sum_exp(&terms);
    }
    let finals: Vec<f64> = graph.accept.iter().map(|&node| alpha[node]).collect();
    let score = log_sum_exp(&finals);
    Ok(ForwardPass {
        order,
        alpha,
        score,
    })
}

/// Posterior of every arc scaled by `upstream`.
///
/// `exp(alpha[src] + w + beta[dst] - score)`, with `beta` accumulated from the
/// accept nodes in reverse topological order. A `-inf` score gives all zeros.
pub(crate) fn forward_score_grad(
    graph: &GraphData,
    order: &[usize],
    alpha: &[f64],
    score: f64,
    upstream: f32,
) -> Array1<f32> {
    let mut grad = Array1::zeros(graph.num_arcs());
    if !score.is_finite() {
        return grad;
    }
    let mut beta = vec![f64::NEG_INFINITY; graph.num_nodes()];
    let mut terms = Vec::new();
    for &node in order.iter().rev() {
        terms.clear();
        if graph.nodes[node].is_accept {
            terms.push(0.0);
        }
        for &arc in &graph.nodes[node].out_arcs {
            let dst = graph.arcs[arc].dst;
            terms.push(f64::from(graph.weights[arc]) + beta[dst]);
        }
        beta[node] = log_sum_exp(&terms);
    }
    let upstream = f64::from(upstream);
    for (k, arc) in graph.arcs.iter().enumerate() {
        let log_posterior = alpha[arc.src] + f64::from(graph.weights[k]) + beta[arc.dst] - score;
        if log_posterior > f64::NEG_INFINITY {
            grad[k] = (log_posterior.exp() * upstream) as f32;
        }
    }
    grad
}

/// Best accepting path of a graph
#[derive(Debug, Clone, PartialEq)]
pub struct BestPath {
    /// Arc indices from a start node to an accept node
    pub arcs: Vec<usize>,
    /// Sum of the path's weights; `-inf` when no accepting path exists
    pub score: f32,
}

/// Max-product pass. Among equal scores the earliest candidate wins: a start
/// seed beats incoming arcs, incoming arcs are compared in the node's
/// adjacency order (insertion order unless the graph was arc-sorted), and
/// accept nodes in index order.
pub(crate) fn viterbi_pass(graph: &GraphData) -> Result<BestPath> {
    graph.check_terminals("viterbi")?;
    let order = topological_order(graph)?;
    let n = graph.num_nodes();
    let mut best = vec![f64::NEG_INFINITY; n];
    let mut back: Vec<Option<usize>> = vec![None; n];
    for &node in &order {
        let mut score = if graph.nodes[node].is_start {
            0.0
        } else {
            f64::NEG_INFINITY
        };
        let mut via = None;
        for &arc in &graph.nodes[node].in_arcs {
            let candidate = best[graph.arcs[arc].src] + f64::from(graph.weights[arc]);
            if candidate > score {
                score = candidate;
                via = Some(arc);
            }
        }
        best[node] = score;
        back[node] = via;
    }

    let mut winner: Option<usize> = None;
    for &node in &graph.accept {
        if best[node] > f64::NEG_INFINITY && winner.map_or(true, |w| best[node] > best[w]) {
            winner = Some(node);
        }
    }
    let Some(mut node) = winner else {
        return Ok(BestPath {
            arcs: Vec::new(),
            score: f32::NEG_INFINITY,
        });
    };
    let score = best[node] as f32;
    let mut arcs = Vec::new();
    while let Some(arc) = back[node] {
        arcs.push(arc);
        node = graph.arcs[arc].src;
    }
    arcs.reverse();
    Ok(BestPath { arcs, score })
}

pub(crate) fn forward_score_op(graph: &Graph) -> Result<(Graph, GradOp)> {
    let data = graph.data();
    let pass = forward_pass(&data)?;
    log::trace!("forward_score over {} nodes: {}", data.num_nodes(), pass.score);
    let out = scalar_graph(pass.score as f32, data.calc_grad);
    Ok((
        out,
        GradOp::ForwardScore {
            order: pass.order,
            alpha: pass.alpha,
            score: pass.score,
        },
    ))
}

pub(crate) fn viterbi_score_op(graph: &Graph) -> Result<(Graph, GradOp)> {
    let data = graph.data();
    let path = viterbi_pass(&data)?;
    let out = scalar_graph(path.score, data.calc_grad);
    Ok((out, GradOp::ViterbiScore { path: path.arcs }))
}

pub(crate) fn viterbi_path_op(graph: &Graph) -> Result<(Graph, GradOp)> {
    let data = graph.data();
    let path = viterbi_pass(&data)?;
    let mut out = GraphData::new(data.calc_grad);
    if path.score > f32::NEG_INFINITY {
        out.add_node(true, path.arcs.is_empty());
        for (k, &arc) in path.arcs.iter().enumerate() {
            out.add_node(false, k + 1 == path.arcs.len());
            let info = data.arcs[arc];
            out.add_arc(k, k + 1, info.ilabel, info.olabel, data.weights[arc])?;
        }
    }
    Ok((Graph::from_data(out), GradOp::ViterbiPath { path: path.arcs }))
}

/// Forward score of `graph` as a scalar graph.
///
/// `ln(sum over accepting paths of exp(path weight))`; `-inf` for a graph
/// without accepting paths.
pub fn forward_score(graph: &Graph) -> Result<Graph> {
    let (mut out, _) = forward_score_op(graph)?;
    out.set_calc_grad(false);
    Ok(out)
}

/// Weight of the best accepting path as a scalar graph
pub fn viterbi_score(graph: &Graph) -> Result<Graph> {
    let (mut out, _) = viterbi_score_op(graph)?;
    out.set_calc_grad(false);
    Ok(out)
}

/// Best accepting path as a linear graph (empty when there is none)
pub fn viterbi_path(graph: &Graph) -> Result<Graph> {
    let (mut out, _) = viterbi_path_op(graph)?;
    out.set_calc_grad(false);
    Ok(out)
}

/// Arc indices and score of the best accepting path
pub fn best_path(graph: &Graph) -> Result<BestPath> {
    viterbi_pass(&graph.data())
}
