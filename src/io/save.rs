//! Graph saving

use super::format::{GraphFormat, SaveConfig};
use super::record::GraphRecord;
use crate::error::{Error, Result};
use crate::graph::Graph;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Save a graph to a file
///
/// # Example
///
/// ```no_run
/// use entrelazar::graph::linear_graph;
/// use entrelazar::io::{save_graph, GraphFormat, SaveConfig};
///
/// let g = linear_graph(3, 4, true);
/// save_graph(&g, "emissions.json", &SaveConfig::new(GraphFormat::Json)).unwrap();
/// ```
pub fn save_graph(graph: &Graph, path: impl AsRef<Path>, config: &SaveConfig) -> Result<()> {
    let record = GraphRecord::from_graph(graph);
    let data = match config.format {
        GraphFormat::Json if config.pretty => serde_json::to_string_pretty(&record)
            .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?,
        GraphFormat::Json => serde_json::to_string(&record)
            .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?,
        GraphFormat::Yaml => serde_yaml::to_string(&record)
            .map_err(|e| Error::Serialization(format!("YAML serialization failed: {e}")))?,
    };
    let mut file = File::create(path.as_ref())?;
    file.write_all(data.as_bytes())?;
    log::debug!(
        "saved graph {} ({} nodes, {} arcs) to {}",
        graph.id(),
        record.nodes.len(),
        record.arcs.len(),
        path.as_ref().display()
    );
    Ok(())
}
