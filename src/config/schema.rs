//! YAML schema for declarative loss runs

use serde::{Deserialize, Serialize};

/// Which sequence criterion to evaluate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriterionKind {
    Ctc,
    Asg,
}

impl std::fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CriterionKind::Ctc => write!(f, "ctc"),
            CriterionKind::Asg => write!(f, "asg"),
        }
    }
}

/// Complete loss run specification
///
/// ```yaml
/// criterion: ctc
/// frames: 3
/// labels: 4
/// blank: 3
/// log_probs: false
/// emissions:
///   - [0.25, 0.25, 0.25, 0.25, 0.25, 0.25, 0.25, 0.25, 0.25, 0.25, 0.25, 0.25]
/// targets:
///   - [1, 2]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossSpec {
    pub criterion: CriterionKind,

    /// Number of frames (T)
    pub frames: usize,

    /// Number of labels per frame (N)
    pub labels: usize,

    /// Blank label (CTC only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blank: Option<i32>,

    /// When false, emissions are probabilities and are converted with `ln`
    #[serde(default = "default_true")]
    pub log_probs: bool,

    /// One row-major `frames x labels` score vector per batch item
    pub emissions: Vec<Vec<f32>>,

    /// One target label sequence per batch item
    pub targets: Vec<Vec<i32>>,

    /// Transition weights (ASG only); entry `i * labels + j` scores `j -> i`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transitions: Option<Vec<f32>>,
}

fn default_true() -> bool {
    true
}

impl LossSpec {
    pub fn batch_size(&self) -> usize {
        self.targets.len()
    }

    /// Emissions of item `index` in the log domain
    pub fn log_emissions(&self, index: usize) -> Vec<f32> {
        let row = &self.emissions[index];
        if self.log_probs {
            row.clone()
        } else {
            row.iter()
                .map(|&p| if p == 0.0 { f32::NEG_INFINITY } else { p.ln() })
                .collect()
        }
    }
}
