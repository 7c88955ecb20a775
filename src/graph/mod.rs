//! Weighted automata and transducers
//!
//! A [`Graph`] holds nodes with start/accept flags and arcs carrying an input
//! label, an output label and a weight. Arc order is insertion order and every
//! per-arc buffer (weights, gradients) is indexed by it.

mod creations;
mod data;


pub use creations::{emissions_graph, grad_matrix, linear_graph, scalar_graph};
pub use data::{ArcInfo, Graph, Node, EPSILON};

pub(crate) use data::GraphData;
