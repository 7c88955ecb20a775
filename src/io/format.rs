//! Serialization format definitions

use serde::{Deserialize, Serialize};

/// Supported graph serialization formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphFormat {
    /// JSON format
    Json,

    /// YAML format
    Yaml,
}

impl GraphFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &str {
        match self {
            GraphFormat::Json => "json",
            GraphFormat::Yaml => "yaml",
        }
    }

    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(GraphFormat::Json),
            "yaml" | "yml" => Some(GraphFormat::Yaml),
            _ => None,
        }
    }
}

/// Configuration for saving graphs
#[derive(Debug, Clone)]
pub struct SaveConfig {
    /// Serialization format
    pub format: GraphFormat,

    /// Whether to pretty-print JSON
    pub pretty: bool,
}

impl SaveConfig {
    /// Create new save config with format
    pub fn new(format: GraphFormat) -> Self {
        Self {
            format,
            pretty: true,
        }
    }

    /// Enable/disable pretty printing
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self::new(GraphFormat::Json)
    }
}
