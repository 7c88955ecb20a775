//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! entrelazar loss config.yaml
//! entrelazar loss config.yaml --format json
//! entrelazar validate config.yaml
//! entrelazar decode config.yaml
//! entrelazar info graph.json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Entrelazar: differentiable weighted automata and sequence criteria
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "entrelazar")]
#[command(version)]
#[command(about = "Evaluate CTC/ASG losses and gradients built from weighted graph operations")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Compute losses and gradients from a YAML loss specification
    Loss(LossArgs),

    /// Validate a loss specification without evaluating it
    Validate(ValidateArgs),

    /// Decode the best label sequence of every batch item
    Decode(DecodeArgs),

    /// Display information about a saved graph
    Info(InfoArgs),
}

/// Arguments for the loss command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct LossArgs {
    /// Path to YAML loss specification
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Output format (text, json, yaml)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Include gradients in text output
    #[arg(short, long)]
    pub gradients: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML loss specification
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// Arguments for the decode command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct DecodeArgs {
    /// Path to YAML loss specification
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// Arguments for the info command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InfoArgs {
    /// Path to a graph file (.json, .yaml)
    #[arg(value_name = "GRAPH")]
    pub graph: PathBuf,

    /// Output format (text, json, yaml)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            _ => Err(format!(
                "Unknown output format: {}. Valid formats: text, json, yaml",
                s
            )),
        }
    }
}

/// Parse command line arguments
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}
