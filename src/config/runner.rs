//! Evaluating a loss specification

use super::schema::{CriterionKind, LossSpec};
use super::validate::validate_spec;
use crate::autograd::Context;
use crate::criterion::{asg_decode, asg_loss, asg_transitions, ctc_loss};
use crate::error::{Error, Result};
use crate::graph::{linear_graph, Graph};
use crate::ops;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Losses and gradients of a loss run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossReport {
    pub criterion: CriterionKind,

    /// One loss per batch item
    pub losses: Vec<f32>,

    /// Gradient of each loss with respect to that item's emissions, row-major
    pub emission_grads: Vec<Vec<f32>>,

    /// Gradient of the summed losses with respect to the `labels x labels`
    /// transition weights (ASG only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_grad: Option<Vec<f32>>,
}

/// Load and validate a loss specification from a YAML file
pub fn load_spec<P: AsRef<Path>>(path: P) -> Result<LossSpec> {
    let yaml = fs::read_to_string(path.as_ref()).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    let spec: LossSpec = serde_yaml::from_str(&yaml)
        .map_err(|e| Error::Config(format!("Failed to parse YAML config: {e}")))?;
    validate_spec(&spec).map_err(|e| Error::Config(format!("Invalid config: {e}")))?;
    Ok(spec)
}

fn emissions_for(spec: &LossSpec, index: usize, calc_grad: bool) -> Result<Graph> {
    let mut emissions = linear_graph(spec.frames, spec.labels, calc_grad);
    emissions.set_weights(&spec.log_emissions(index))?;
    Ok(emissions)
}

fn transitions_for(spec: &LossSpec, calc_grad: bool) -> Result<Graph> {
    let mut transitions = asg_transitions(spec.labels, calc_grad);
    if let Some(weights) = &spec.transitions {
        let mut all = vec![0.0; spec.labels];
        all.extend_from_slice(weights);
        transitions.set_weights(&all)?;
    }
    Ok(transitions)
}

/// Compute every item's loss and gradients
pub fn run_spec(spec: &LossSpec) -> Result<LossReport> {
    validate_spec(spec).map_err(|e| Error::Config(format!("Invalid config: {e}")))?;

    let transitions = match spec.criterion {
        CriterionKind::Asg => Some(transitions_for(spec, true)?),
        CriterionKind::Ctc => None,
    };

    let mut losses = Vec::with_capacity(spec.batch_size());
    let mut emission_grads = Vec::with_capacity(spec.batch_size());
    for (index, target) in spec.targets.iter().enumerate() {
        let emissions = emissions_for(spec, index, true)?;
        let mut ctx = Context::new();
        let loss = match (&transitions, spec.blank) {
            (Some(transitions), _) => asg_loss(&mut ctx, &emissions, transitions, target)?,
            (None, Some(blank)) => ctc_loss(&mut ctx, &emissions, target, blank)?,
            (None, None) => return Err(Error::Config("CTC requires a blank label".to_string())),
        };
        ctx.backward(&loss)?;
        let value = loss.item()?;
        log::info!("{} item {index}: loss {value}", spec.criterion);
        losses.push(value);
        emission_grads.push(
            emissions
                .grad()
                .map(|g| g.to_vec())
                .unwrap_or_else(|| vec![0.0; spec.frames * spec.labels]),
        );
    }

    let transition_grad = transitions.map(|t| {
        t.grad()
            .map(|g| g.iter().skip(spec.labels).copied().collect())
            .unwrap_or_else(|| vec![0.0; spec.labels * spec.labels])
    });

    Ok(LossReport {
        criterion: spec.criterion,
        losses,
        emission_grads,
        transition_grad,
    })
}

/// Merge consecutive repeats and, when given, drop the blank label
pub fn collapse_labels(labels: &[i32], blank: Option<i32>) -> Vec<i32> {
    let mut out = Vec::new();
    let mut previous = None;
    for &label in labels {
        if previous != Some(label) && Some(label) != blank {
            out.push(label);
        }
        previous = Some(label);
    }
    out
}

/// Best label sequence for every batch item.
///
/// CTC takes the best label per frame; ASG takes the Viterbi path through the
/// emissions composed with the transitions. Repeats are then merged and CTC
/// blanks dropped.
pub fn decode_spec(spec: &LossSpec) -> Result<Vec<Vec<i32>>> {
    validate_spec(spec).map_err(|e| Error::Config(format!("Invalid config: {e}")))?;
    let transitions = match spec.criterion {
        CriterionKind::Asg => Some(transitions_for(spec, false)?),
        CriterionKind::Ctc => None,
    };
    (0..spec.batch_size())
        .map(|index| {
            let emissions = emissions_for(spec, index, false)?;
            let frames = match &transitions {
                Some(transitions) => asg_decode(&emissions, transitions)?,
                None => ops::viterbi_path(&emissions)?.labels_to_list(true),
            };
            Ok(collapse_labels(&frames, spec.blank))
        })
        .collect()
}
