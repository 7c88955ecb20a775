//! Auto Segmentation Criterion

use super::check_labels;
use crate::autograd::Context;
use crate::error::Result;
use crate::graph::Graph;
use crate::ops;

/// Fully connected transition graph over `labels` tokens.
///
/// Node 0 is the start node, node `i + 1` is reached by emitting label `i`
/// and accepts. Arcs `0..labels` are the entry arcs `0 -> i + 1`; arc
/// `labels + i * labels + j` is the transition `j + 1 -> i + 1` labelled `i`.
/// All weights start at 0.
pub fn asg_transitions(labels: usize, calc_grad: bool) -> Graph {
    let mut graph = Graph::new(calc_grad);
    graph.add_node(true, false);
    for i in 1..=labels {
        graph.add_node(false, true);
        let _ = graph.add_arc(0, i, (i - 1) as i32);
    }
    for i in 0..labels {
        for j in 0..labels {
            let _ = graph.add_arc(j + 1, i + 1, i as i32);
        }
    }
    graph
}

/// Linear acceptor for `target` in which every label may repeat.
pub fn forced_alignment_graph(target: &[i32]) -> Graph {
    let mut graph = Graph::new(false);
    graph.add_node(true, target.is_empty());
    for (l, &label) in target.iter().enumerate() {
        let node = graph.add_node(false, l + 1 == target.len());
        let _ = graph.add_arc(node - 1, node, label);
        let _ = graph.add_arc(node, node, label);
    }
    graph
}

/// ASG loss of `emissions` against `target` under `transitions`.
///
/// `forward_score(emissions ∘ transitions)
///  - forward_score((fal ∘ transitions) ∘ emissions)`
/// where `fal` is the [`forced_alignment_graph`] of the target. Gradients flow
/// to both the emissions and the transitions.
pub fn asg_loss(
    ctx: &mut Context,
    emissions: &Graph,
    transitions: &Graph,
    target: &[i32],
) -> Result<Graph> {
    let labels = transitions.num_nodes().saturating_sub(1);
    check_labels(target, Some(labels), None)?;

    let full = ctx.compose(emissions, transitions)?;
    let normalizer = ctx.forward_score(&full)?;

    let fal = forced_alignment_graph(target);
    let constrained = ctx.compose(&fal, transitions)?;
    let aligned = ctx.compose(&constrained, emissions)?;
    let numerator = ctx.forward_score(&aligned)?;
    log::debug!(
        "asg: full {} arcs, aligned {} arcs",
        full.num_arcs(),
        aligned.num_arcs()
    );
    ctx.subtract(&normalizer, &numerator)
}

/// Best label sequence for `emissions` under `transitions` (one label per frame).
pub fn asg_decode(emissions: &Graph, transitions: &Graph) -> Result<Vec<i32>> {
    let full = ops::compose(emissions, transitions)?;
    let path = ops::viterbi_path(&full)?;
    Ok(path.labels_to_list(true))
}
