//! Serializable graph representation

use crate::error::{Error, Result};
use crate::graph::Graph;
use serde::{Deserialize, Serialize};

/// Graph as persisted: nodes and arcs in index order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    /// Whether the loaded graph tracks gradients
    #[serde(default = "default_true")]
    pub calc_grad: bool,

    pub nodes: Vec<NodeRecord>,

    #[serde(default)]
    pub arcs: Vec<ArcRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default)]
    pub start: bool,
    #[serde(default)]
    pub accept: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcRecord {
    pub src: usize,
    pub dst: usize,
    pub ilabel: i32,
    pub olabel: i32,
    #[serde(default, with = "weight_repr")]
    pub weight: f32,
}

fn default_true() -> bool {
    true
}

impl GraphRecord {
    pub fn from_graph(graph: &Graph) -> Self {
        let data = graph.data();
        Self {
            calc_grad: data.calc_grad,
            nodes: data
                .nodes
                .iter()
                .map(|n| NodeRecord {
                    start: n.is_start,
                    accept: n.is_accept,
                })
                .collect(),
            arcs: data
                .arcs
                .iter()
                .zip(&data.weights)
                .map(|(a, &weight)| ArcRecord {
                    src: a.src,
                    dst: a.dst,
                    ilabel: a.ilabel,
                    olabel: a.olabel,
                    weight,
                })
                .collect(),
        }
    }

    /// Rebuild the graph, checking arc endpoints
    pub fn into_graph(self) -> Result<Graph> {
        let mut graph = Graph::new(self.calc_grad);
        for node in &self.nodes {
            graph.add_node(node.start, node.accept);
        }
        for (k, arc) in self.arcs.iter().enumerate() {
            graph
                .add_weighted_arc(arc.src, arc.dst, arc.ilabel, arc.olabel, arc.weight)
                .map_err(|e| Error::Serialization(format!("arc {k}: {e}")))?;
        }
        Ok(graph)
    }
}

/// Weights may be infinite (log of a zero probability), which JSON numbers
/// cannot carry; non-finite values are written as strings.
mod weight_repr {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f32),
        Text(String),
    }

    pub fn serialize<S: Serializer>(weight: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        if weight.is_finite() {
            serializer.serialize_f32(*weight)
        } else if weight.is_nan() {
            serializer.serialize_str("nan")
        } else if *weight > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.to_lowercase().as_str() {
                "inf" | "+inf" | "infinity" => Ok(f32::INFINITY),
                "-inf" | "-infinity" => Ok(f32::NEG_INFINITY),
                "nan" => Ok(f32::NAN),
                other => Err(serde::de::Error::custom(format!(
                    "invalid weight {other:?}"
                ))),
            },
        }
    }
}
