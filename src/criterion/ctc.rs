//! Connectionist Temporal Classification

use super::check_labels;
use crate::autograd::Context;
use crate::error::{Error, Result};
use crate::graph::Graph;

/// Alignment graph for `target` with blanks.
///
/// Node `2u + 1` emits `target[u]`, even nodes emit `blank`; every node loops
/// on its own label. A blank may be skipped between two different labels but
/// not between repeats. Every arc entering node `l` carries node `l`'s label,
/// so node 0 is the only start node. The last two nodes accept (a single
/// blank node for an empty target).
pub fn ctc_graph(target: &[i32], blank: i32) -> Graph {
    let size = 2 * target.len() + 1;
    let mut graph = Graph::new(false);
    for l in 0..size {
        graph.add_node(l == 0, l + 2 >= size);
    }
    for l in 0..size {
        let label = if l % 2 == 1 { target[l / 2] } else { blank };
        // All endpoints exist.
        let _ = graph.add_arc(l, l, label);
        if l > 0 {
            let _ = graph.add_arc(l - 1, l, label);
        }
        if l % 2 == 1 && l > 1 && label != target[l / 2 - 1] {
            let _ = graph.add_arc(l - 2, l, label);
        }
    }
    graph.arc_sort(true);
    graph
}

/// CTC loss of log-probability `emissions` (a linear graph, see
/// [`linear_graph`](crate::graph::linear_graph)) against `target`.
///
/// Returns `forward_score(emissions) - forward_score(ctc_graph ∘ emissions)`.
/// The first term is 0 for normalized log-probabilities. A target that cannot
/// be aligned within the available frames yields `+inf`.
pub fn ctc_loss(
    ctx: &mut Context,
    emissions: &Graph,
    target: &[i32],
    blank: i32,
) -> Result<Graph> {
    if blank < 0 {
        return Err(Error::InvalidParameter(format!(
            "blank label must be non-negative, got {blank}"
        )));
    }
    check_labels(target, None, Some(blank))?;

    let criterion = ctc_graph(target, blank);
    let normalizer = ctx.forward_score(emissions)?;
    let aligned = ctx.compose(&criterion, emissions)?;
    let numerator = ctx.forward_score(&aligned)?;
    log::debug!(
        "ctc: {} alignment nodes, {} composed arcs",
        criterion.num_nodes(),
        aligned.num_arcs()
    );
    ctx.subtract(&normalizer, &numerator)
}
