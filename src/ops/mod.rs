//! Graph operations
//!
//! The free functions here compute results without recording anything; their
//! outputs do not track gradients. [`Context`](crate::Context) exposes the same
//! operations and records them on its tape.

pub(crate) mod compose;
pub(crate) mod scalar;
pub(crate) mod score;
pub(crate) mod structure;

#[cfg(test)]
mod tests;

pub use compose::compose;
pub use scalar::{add, negate, subtract};
pub use score::{best_path, forward_score, viterbi_path, viterbi_score, BestPath};
pub use structure::{clone_graph, closure, concat, project_input, project_output, union};
