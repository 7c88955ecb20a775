//! Constructors for commonly used graph shapes

use super::data::{GraphData, EPSILON};
use super::Graph;
use crate::error::{Error, Result};
use ndarray::Array2;

/// Scalar graph: a start node, an accept node and one ε arc carrying `weight`.
///
/// Forward and Viterbi scores are returned in this shape.
pub fn scalar_graph(weight: f32, calc_grad: bool) -> Graph {
    let mut data = GraphData::new(calc_grad);
    data.add_node(true, false);
    data.add_node(false, true);
    // Both nodes exist, so this cannot fail.
    let _ = data.add_arc(0, 1, EPSILON, EPSILON, weight);
    Graph::from_data(data)
}

/// Linear graph of `frames` stages with `labels` parallel arcs per stage.
///
/// Arc `t * labels + j` goes from node `t` to node `t + 1` with label `j` and
/// weight 0, so a row-major `frames x labels` score matrix maps directly onto
/// [`Graph::set_weights`].
pub fn linear_graph(frames: usize, labels: usize, calc_grad: bool) -> Graph {
    let mut data = GraphData::new(calc_grad);
    data.nodes.reserve(frames + 1);
    data.arcs.reserve(frames * labels);
    for t in 0..=frames {
        data.add_node(t == 0, t == frames);
    }
    for t in 0..frames {
        for j in 0..labels {
            let _ = data.add_arc(t, t + 1, j as i32, j as i32, 0.0);
        }
    }
    // Arcs were added in label order.
    data.ilabel_sorted = true;
    data.olabel_sorted = true;
    Graph::from_data(data)
}

/// Linear graph whose weights are taken from a `frames x labels` matrix.
pub fn emissions_graph(scores: &Array2<f32>, calc_grad: bool) -> Result<Graph> {
    let (frames, labels) = scores.dim();
    let mut graph = linear_graph(frames, labels, calc_grad);
    let values: Vec<f32> = scores.iter().copied().collect();
    graph.set_weights(&values)?;
    Ok(graph)
}

/// Reshape a per-arc gradient of a linear graph back into `frames x labels`.
pub fn grad_matrix(graph: &Graph, frames: usize, labels: usize) -> Result<Option<Array2<f32>>> {
    match graph.grad() {
        None => Ok(None),
        Some(grad) => grad
            .into_shape((frames, labels))
            .map(Some)
            .map_err(|e| Error::Shape(format!("gradient is not {frames}x{labels}: {e}"))),
    }
}
