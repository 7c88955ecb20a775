//! Configuration validation

use super::schema::{CriterionKind, LossSpec};

/// Validation error type
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid frames: {0} (must be > 0)")]
    InvalidFrames(usize),

    #[error("Invalid labels: {0} (must be > 0)")]
    InvalidLabels(usize),

    #[error("Empty batch: at least one target is required")]
    EmptyBatch,

    #[error("Batch mismatch: {emissions} emission rows for {targets} targets")]
    BatchMismatch { emissions: usize, targets: usize },

    #[error("Emissions row {index} has {got} values, expected {expected}")]
    EmissionsShape {
        index: usize,
        expected: usize,
        got: usize,
    },

    #[error("Emissions row {index} contains a negative probability")]
    NegativeProbability { index: usize },

    #[error("CTC requires a blank label")]
    MissingBlank,

    #[error("Blank label {blank} outside 0..{labels}")]
    BlankOutOfRange { blank: i32, labels: usize },

    #[error("Target {index} contains label {label} outside 0..{labels}")]
    LabelOutOfRange {
        index: usize,
        label: i32,
        labels: usize,
    },

    #[error("Target {index} contains the blank label")]
    BlankInTarget { index: usize },

    #[error("Transitions have {got} values, expected {expected}")]
    TransitionsShape { expected: usize, got: usize },

    #[error("Transitions are only used by ASG")]
    UnexpectedTransitions,
}

/// Validate a loss specification
///
/// Checks:
/// - Dimensions are non-zero and every emissions row is `frames x labels`
/// - Batch sizes agree
/// - Labels are in range and criterion-specific fields are consistent
pub fn validate_spec(spec: &LossSpec) -> Result<(), ValidationError> {
    if spec.frames == 0 {
        return Err(ValidationError::InvalidFrames(spec.frames));
    }
    if spec.labels == 0 {
        return Err(ValidationError::InvalidLabels(spec.labels));
    }
    if spec.targets.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }
    if spec.emissions.len() != spec.targets.len() {
        return Err(ValidationError::BatchMismatch {
            emissions: spec.emissions.len(),
            targets: spec.targets.len(),
        });
    }

    let expected = spec.frames * spec.labels;
    for (index, row) in spec.emissions.iter().enumerate() {
        if row.len() != expected {
            return Err(ValidationError::EmissionsShape {
                index,
                expected,
                got: row.len(),
            });
        }
        if !spec.log_probs && row.iter().any(|&p| p < 0.0) {
            return Err(ValidationError::NegativeProbability { index });
        }
    }

    for (index, target) in spec.targets.iter().enumerate() {
        if let Some(&label) = target
            .iter()
            .find(|&&l| l < 0 || l as usize >= spec.labels)
        {
            return Err(ValidationError::LabelOutOfRange {
                index,
                label,
                labels: spec.labels,
            });
        }
    }

    match spec.criterion {
        CriterionKind::Ctc => {
            let blank = spec.blank.ok_or(ValidationError::MissingBlank)?;
            if blank < 0 || blank as usize >= spec.labels {
                return Err(ValidationError::BlankOutOfRange {
                    blank,
                    labels: spec.labels,
                });
            }
            if let Some(index) = spec.targets.iter().position(|t| t.contains(&blank)) {
                return Err(ValidationError::BlankInTarget { index });
            }
            if spec.transitions.is_some() {
                return Err(ValidationError::UnexpectedTransitions);
            }
        }
        CriterionKind::Asg => {
            if let Some(transitions) = &spec.transitions {
                let expected = spec.labels * spec.labels;
                if transitions.len() != expected {
                    return Err(ValidationError::TransitionsShape {
                        expected,
                        got: transitions.len(),
                    });
                }
            }
        }
    }

    Ok(())
}
