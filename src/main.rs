//! Entrelazar CLI
//!
//! # Usage
//!
//! ```bash
//! # Losses for every batch item
//! entrelazar loss config.yaml
//!
//! # Full report with gradients as JSON
//! entrelazar loss config.yaml --format json
//!
//! # Validate config
//! entrelazar validate config.yaml
//!
//! # Best label sequences
//! entrelazar decode config.yaml
//!
//! # Inspect a saved graph
//! entrelazar info graph.json
//! ```

use clap::Parser;
use entrelazar::config::{
    decode_spec, load_spec, run_spec, Cli, Command, DecodeArgs, InfoArgs, LossArgs, OutputFormat,
    ValidateArgs,
};
use entrelazar::io::{load_graph, GraphRecord};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Configure output based on verbose/quiet flags
    let log_level = if cli.quiet {
        LogLevel::Quiet
    } else if cli.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    };
    init_logger(log_level);

    let result = match cli.command {
        Command::Loss(args) => run_loss(args, log_level),
        Command::Validate(args) => run_validate(args, log_level),
        Command::Decode(args) => run_decode(args, log_level),
        Command::Info(args) => run_info(args, log_level),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum LogLevel {
    Quiet,
    Normal,
    Verbose,
}

/// `RUST_LOG` wins; otherwise the verbosity flags pick the default filter.
fn init_logger(level: LogLevel) {
    let default = match level {
        LogLevel::Quiet => "error",
        LogLevel::Normal => "warn",
        LogLevel::Verbose => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn log(level: LogLevel, required: LogLevel, msg: &str) {
    if level != LogLevel::Quiet && (level == required || required == LogLevel::Normal) {
        println!("{msg}");
    }
}

fn render<T: serde::Serialize>(value: &T, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).map_err(|e| format!("JSON error: {e}"))
        }
        OutputFormat::Yaml => serde_yaml::to_string(value).map_err(|e| format!("YAML error: {e}")),
        OutputFormat::Text => Err("text output has no serialized form".to_string()),
    }
}

fn run_loss(args: LossArgs, level: LogLevel) -> Result<(), String> {
    let spec = load_spec(&args.config).map_err(|e| e.to_string())?;
    log(
        level,
        LogLevel::Verbose,
        &format!(
            "Evaluating {} over {} item(s) ({} frames x {} labels)",
            spec.criterion,
            spec.batch_size(),
            spec.frames,
            spec.labels
        ),
    );
    let report = run_spec(&spec).map_err(|e| e.to_string())?;

    if args.format != OutputFormat::Text {
        println!("{}", render(&report, args.format)?);
        return Ok(());
    }

    for (index, loss) in report.losses.iter().enumerate() {
        log(level, LogLevel::Normal, &format!("item {index}: loss = {loss:.6}"));
        if args.gradients {
            for (t, frame) in report.emission_grads[index].chunks(spec.labels).enumerate() {
                let row: Vec<String> = frame.iter().map(|g| format!("{g:>9.5}")).collect();
                log(level, LogLevel::Normal, &format!("  t={t:<3} {}", row.join(" ")));
            }
        }
    }
    if let (true, Some(grad)) = (args.gradients, &report.transition_grad) {
        log(level, LogLevel::Normal, "transition gradient (row i = to, column j = from):");
        for row in grad.chunks(spec.labels) {
            let row: Vec<String> = row.iter().map(|g| format!("{g:>9.5}")).collect();
            log(level, LogLevel::Normal, &format!("  {}", row.join(" ")));
        }
    }
    Ok(())
}

fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    let spec = load_spec(&args.config).map_err(|e| e.to_string())?;
    log(
        level,
        LogLevel::Normal,
        &format!(
            "✓ {} is a valid {} spec ({} item(s))",
            args.config.display(),
            spec.criterion,
            spec.batch_size()
        ),
    );
    Ok(())
}

fn run_decode(args: DecodeArgs, level: LogLevel) -> Result<(), String> {
    let spec = load_spec(&args.config).map_err(|e| e.to_string())?;
    let decoded = decode_spec(&spec).map_err(|e| e.to_string())?;
    for (index, labels) in decoded.iter().enumerate() {
        let labels: Vec<String> = labels.iter().map(i32::to_string).collect();
        log(
            level,
            LogLevel::Normal,
            &format!("item {index}: [{}]", labels.join(", ")),
        );
    }
    Ok(())
}

fn run_info(args: InfoArgs, level: LogLevel) -> Result<(), String> {
    let graph = load_graph(&args.graph).map_err(|e| e.to_string())?;
    if args.format != OutputFormat::Text {
        println!("{}", render(&GraphRecord::from_graph(&graph), args.format)?);
        return Ok(());
    }
    log(level, LogLevel::Normal, &format!("Graph: {}", args.graph.display()));
    log(level, LogLevel::Normal, &format!("  nodes:    {}", graph.num_nodes()));
    log(level, LogLevel::Normal, &format!("  arcs:     {}", graph.num_arcs()));
    log(level, LogLevel::Normal, &format!("  start:    {:?}", graph.start_nodes()));
    log(level, LogLevel::Normal, &format!("  accept:   {:?}", graph.accept_nodes()));
    log(level, LogLevel::Normal, &format!("  acceptor: {}", graph.is_acceptor()));
    Ok(())
}
