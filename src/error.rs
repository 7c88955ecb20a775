//! Error types for Entrelazar

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Weight-vector length mismatch, out-of-range node/arc index or a
    /// non-scalar operand where a scalar graph is required.
    #[error("Shape error: {0}")]
    Shape(String),

    /// A graph whose structure cannot be scored or composed.
    #[error("Structural error: {0}")]
    Structural(String),

    /// Backward invoked on a graph the tape knows nothing about.
    #[error("State error: {0}")]
    State(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, Error>;
