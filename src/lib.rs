// src/lib.rs

pub mod bench;
pub mod builtin;
pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod types;
pub mod workload;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use futures::future::join_all;
use tracing::{debug, info};

use crate::bench::{BatchSummary, Benchmark, ExecuteOptions, SolverFactory};
use crate::builtin::RandomSolverFactory;
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::errors::BenchError;
use crate::workload::JobLoader;

/// High-level entry point used by `main.rs`.
///
/// Loads the suite config, applies CLI overrides and runs every configured
/// workload concurrently, each under its own admission gate. All workloads
/// share one run stamp so their report files sort together.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_and_validate(&config_path)?;
    apply_overrides(&mut cfg, &args)?;

    let root = config_root_dir(&config_path);
    let loader = Arc::new(JobLoader::new(Arc::new(builtin::registry())));
    let opts = ExecuteOptions {
        concurrency: cfg.config.concurrency,
        max_items: cfg.config.max_items,
        source: cfg.config.mode,
    };

    let run_stamp = chrono::Local::now().format("%m%d_%H%M").to_string();
    let benches: Vec<Benchmark> = cfg
        .workload
        .iter()
        .map(|w| {
            Benchmark::new(root.join(&w.path), Arc::clone(&loader))
                .with_label(&cfg.config.label)
                .with_result_dir(root.join(&cfg.config.result_dir))
                .with_run_stamp(&run_stamp)
        })
        .collect();

    if args.dry_run {
        print_dry_run(&cfg, &benches, &opts);
        return Ok(());
    }

    let solvers: Arc<dyn SolverFactory> = Arc::new(RandomSolverFactory::new(
        cfg.solver.seed,
        cfg.solver.actions.clone(),
    ));

    info!(workloads = benches.len(), stamp = %run_stamp, "starting benchmark suite");
    let summaries = join_all(benches.iter().map(|b| b.execute(Arc::clone(&solvers), &opts))).await;

    for summary in &summaries {
        print_summary(summary);
    }

    let aborted: Vec<String> = summaries
        .iter()
        .filter(|s| s.is_aborted())
        .map(|s| s.workload_path.display().to_string())
        .collect();
    if !aborted.is_empty() {
        bail!(
            "every work item failed to resolve in: {}",
            aborted.join(", ")
        );
    }

    Ok(())
}

fn apply_overrides(cfg: &mut ConfigFile, args: &CliArgs) -> Result<()> {
    if let Some(mode) = args.mode {
        cfg.config.mode = mode;
    }
    if let Some(n) = args.concurrency {
        if n == 0 {
            return Err(BenchError::ConfigError("--concurrency must be >= 1".to_string()).into());
        }
        cfg.config.concurrency = n;
    }
    if let Some(n) = args.max_items {
        if n == 0 {
            return Err(BenchError::ConfigError("--max-items must be >= 1".to_string()).into());
        }
        cfg.config.max_items = Some(n);
    }
    if let Some(label) = &args.label {
        cfg.config.label = label.clone();
    }
    Ok(())
}

/// Directory relative workload and result paths are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "suites/Bench.toml"),
///   that directory is used.
/// - A bare filename like "Bench.toml" resolves against the current
///   working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn print_summary(s: &BatchSummary) {
    let ratio = s
        .ratio
        .map(|r| format!("{:.2}%", r * 100.0))
        .unwrap_or_else(|| "N/A".to_string());
    println!(
        "{}: reward {}/{} ({}), solved {}/{}, failed {}, {:.1}s",
        s.workload_path.display(),
        s.total_reward,
        s.max_reward_total,
        ratio,
        s.success_count,
        s.item_count(),
        s.failed_items().count(),
        s.duration.as_secs_f64()
    );
    for item in s.failed_items() {
        if let Some(failure) = &item.failure {
            println!("  - {}: {}", item.item_id, failure.reason);
        }
    }
}

/// List workloads and the items that would run.
fn print_dry_run(cfg: &ConfigFile, benches: &[Benchmark], opts: &ExecuteOptions) {
    println!("benchdag dry-run");
    println!("  config.mode = {}", cfg.config.mode);
    println!("  config.concurrency = {}", cfg.config.concurrency);
    match cfg.config.max_items {
        Some(n) => println!("  config.max_items = {n}"),
        None => println!("  config.max_items = all"),
    }
    println!("  config.label = {}", cfg.config.label);
    println!("  solver = {} (seed {})", cfg.solver.kind, cfg.solver.seed);
    println!();

    println!("workloads ({}):", benches.len());
    for bench in benches {
        let items = bench.select_items(opts);
        println!("  - {}", bench.workload().display());
        println!("      report: {}", bench.report_store().path().display());
        if items.is_empty() {
            println!("      items: (none)");
        } else {
            println!("      items: {}", items.join(", "));
        }
    }

    debug!("dry-run complete (no execution)");
}
