//! Declarative YAML loss configuration
//!
//! # Example
//!
//! ```yaml
//! criterion: asg
//! frames: 4
//! labels: 3
//! emissions:
//!   - [0, 0, 7, 5, 4, 3, 5, 8, 5, 5, 4, 3]
//! targets:
//!   - [2, 1, 0]
//! transitions: [0, 2, 0, 0, 0, 2, 2, 0, 0]
//! ```

mod cli;
mod runner;
mod schema;
mod validate;



pub use cli::{
    parse_args, Cli, Command, DecodeArgs, InfoArgs, LossArgs, OutputFormat, ValidateArgs,
};
pub use runner::{collapse_labels, decode_spec, load_spec, run_spec, LossReport};
pub use schema::{CriterionKind, LossSpec};
pub use validate::{validate_spec, ValidationError};
