//! Tape-based autograd over graphs
//!
//! Operations called through a [`Context`] append [`TapeEntry`] records; a
//! backward pass replays them in reverse, applying each [`GradOp`]'s rule to
//! push per-arc gradients from a scalar loss down to the leaf graphs.

mod backward;
mod context;
mod tape;


pub use backward::backward_from;
pub use context::Context;
pub use tape::{GradOp, Tape, TapeEntry};

use crate::error::Result;
use crate::graph::Graph;

/// Perform the backward pass for `loss` on the context's tape
pub fn backward(ctx: &Context, loss: &Graph) -> Result<()> {
    ctx.backward(loss)
}
