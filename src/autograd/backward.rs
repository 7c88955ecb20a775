//! Reverse traversal of the tape

use super::tape::Tape;
use crate::error::{Error, Result};
use crate::graph::Graph;
use ndarray::Array1;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Propagate gradients from `loss` back to every graph it depends on.
///
/// The output gradient of `loss` is seeded with ones. Entries are visited in
/// reverse creation order starting at the producer of `loss`; the gradients
/// of this pass are collected in a local map and only then added onto each
/// graph's buffer, so a second call adds exactly the same amounts again.
pub fn backward_from(tape: &Tape, loss: &Graph) -> Result<()> {
    let last = tape.producer_of(loss).ok_or_else(|| {
        Error::State(format!(
            "graph {} has no recorded producer on this tape",
            loss.id()
        ))
    })?;

    let mut grads: HashMap<usize, (Graph, Array1<f32>)> = HashMap::new();
    grads.insert(loss.id(), (loss.clone(), Array1::ones(loss.num_arcs())));

    let mut visited = 0usize;
    for entry in tape.entries()[..=last].iter().rev() {
        let upstream = match grads.get(&entry.output.id()) {
            Some((_, grad)) => grad.clone(),
            None => continue,
        };
        visited += 1;

        let contributions = entry.op.input_grads(&entry.inputs, &upstream)?;
        for (input, contribution) in entry.inputs.iter().zip(contributions) {
            let Some(contribution) = contribution else {
                continue;
            };
            match grads.entry(input.id()) {
                Entry::Occupied(mut slot) => slot.get_mut().1 += &contribution,
                Entry::Vacant(slot) => {
                    slot.insert((input.clone(), contribution));
                }
            }
        }
    }

    log::debug!(
        "backward from graph {}: {visited} of {} entries, {} graphs updated",
        loss.id(),
        last + 1,
        grads.len()
    );

    for (_, (graph, grad)) in grads {
        graph.accumulate_grad(grad)?;
    }
    Ok(())
}
