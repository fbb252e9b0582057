// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::ItemSource;

/// Command-line arguments for `benchdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "benchdag",
    version,
    about = "Benchmark agents against generated environment workloads.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the suite config file (TOML).
    ///
    /// Default: `Bench.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Bench.toml")]
    pub config: String,

    /// Item source to draw work items from (overrides `[config].mode`).
    #[arg(long, value_name = "MODE", value_parser = clap::value_parser!(ItemSource))]
    pub mode: Option<ItemSource>,

    /// Maximum number of work items per workload (overrides `[config].max_items`).
    #[arg(long, value_name = "N")]
    pub max_items: Option<usize>,

    /// Maximum number of work items in flight per workload
    /// (overrides `[config].concurrency`).
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Label written to the report's `label` column (overrides `[config].label`).
    #[arg(long, value_name = "LABEL")]
    pub label: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BENCHDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, list workloads and their work items, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
