//! # Entrelazar: Differentiable Weighted Automata
//!
//! Entrelazar provides weighted graphs (acceptors and transducers) with
//! differentiable graph-level operations connected by a gradient tape, and
//! builds sequence criteria such as CTC and ASG out of them.
//!
//! ## Architecture
//!
//! - **graph**: Weighted graph data model and constructors
//! - **autograd**: Tape, computation context and backward traversal
//! - **ops**: Composition, forward/Viterbi scoring, scalar and structural ops
//! - **criterion**: CTC and ASG losses
//! - **io**: Graph saving and loading (JSON, YAML formats)
//! - **config**: Declarative YAML loss runs
//!
//! ## Example
//!
//! ```
//! use entrelazar::graph::linear_graph;
//! use entrelazar::criterion::ctc_loss;
//! use entrelazar::Context;
//!
//! let mut emissions = linear_graph(3, 4, true);
//! emissions.set_weights(&[0.25f32.ln(); 12]).unwrap();
//!
//! let mut ctx = Context::new();
//! let loss = ctc_loss(&mut ctx, &emissions, &[1, 2], 3).unwrap();
//! ctx.backward(&loss).unwrap();
//!
//! assert!((loss.item().unwrap() + (0.25f32.powi(3) * 5.0).ln()).abs() < 1e-5);
//! assert_eq!(emissions.grad().unwrap().len(), 12);
//! ```

pub mod autograd;
pub mod config;
pub mod criterion;
pub mod graph;
pub mod io;
pub mod ops;

pub mod error;

// Re-export commonly used types
pub use autograd::{backward, Context};
pub use error::{Error, Result};
pub use graph::{Graph, EPSILON};
