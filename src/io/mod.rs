//! Graph I/O - saving and loading graphs as JSON or YAML

mod format;
mod load;
mod record;
mod save;


pub use format::{GraphFormat, SaveConfig};
pub use load::{load_graph, parse_graph};
pub use record::{ArcRecord, GraphRecord, NodeRecord};
pub use save::save_graph;
