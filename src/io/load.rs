//! Graph loading

use super::format::GraphFormat;
use super::record::GraphRecord;
use crate::error::{Error, Result};
use crate::graph::Graph;
use std::fs;
use std::path::Path;

/// Load a graph from a file; the format is detected from the extension.
pub fn load_graph(path: impl AsRef<Path>) -> Result<Graph> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Serialization("File has no extension".to_string()))?;
    let format = GraphFormat::from_extension(ext)
        .ok_or_else(|| Error::Serialization(format!("Unsupported file extension: {ext}")))?;

    let content = fs::read_to_string(path)?;
    parse_graph(&content, format)
}

/// Parse a graph from text in the given format
pub fn parse_graph(content: &str, format: GraphFormat) -> Result<Graph> {
    let record: GraphRecord = match format {
        GraphFormat::Json => serde_json::from_str(content)
            .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}")))?,
        GraphFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| Error::Serialization(format!("YAML deserialization failed: {e}")))?,
    };
    record.into_graph()
}
