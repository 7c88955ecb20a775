//! Sequence criteria built from graph operations
//!
//! - **CTC**: blank-augmented alignment graph composed with the emissions
//! - **ASG**: forced-alignment graph and a fully connected transition graph
//!
//! Both return `forward_score(all paths) - forward_score(paths matching the
//! target)`, the negative log-likelihood of the target, as a scalar graph
//! recorded on the given [`Context`](crate::Context).

mod asg;
mod ctc;

#[cfg(test)]
mod tests;

pub use asg::{asg_decode, asg_loss, asg_transitions, forced_alignment_graph};
pub use ctc::{ctc_graph, ctc_loss};

use crate::error::{Error, Result};

fn check_labels(target: &[i32], labels: Option<usize>, reserved: Option<i32>) -> Result<()> {
    for &label in target {
        if label < 0 {
            return Err(Error::InvalidParameter(format!(
                "target label {label} is negative"
            )));
        }
        if let Some(n) = labels {
            if label as usize >= n {
                return Err(Error::InvalidParameter(format!(
                    "target label {label} outside 0..{n}"
                )));
            }
        }
        if reserved == Some(label) {
            return Err(Error::InvalidParameter(format!(
                "target contains the blank label {label}"
            )));
        }
    }
    Ok(())
}
