// src/bench/benchmark.rs

//! One workload's benchmark batch: select work items, run them under the
//! admission gate, fold the results and append the report row.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::bench::cost::{CostMeter, cost_delta};
use crate::bench::report::ReportStore;
use crate::bench::result::{BatchSummary, ItemFailure, ItemResult};
use crate::bench::runner::BoundedRunner;
use crate::bench::solver::{SolverFactory, SolverReport};
use crate::errors::{BenchError, Result};
use crate::types::ItemSource;
use crate::workload::JobLoader;

/// Per-call knobs for [`Benchmark::execute`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecuteOptions {
    pub concurrency: usize,
    pub max_items: Option<usize>,
    pub source: ItemSource,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            max_items: None,
            source: ItemSource::Test,
        }
    }
}

/// Benchmark driver for a single workload.
pub struct Benchmark {
    workload: PathBuf,
    label: String,
    result_dir: PathBuf,
    run_stamp: String,
    loader: Arc<JobLoader>,
    cost_meter: Option<Arc<dyn CostMeter>>,
}

impl fmt::Debug for Benchmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Benchmark")
            .field("workload", &self.workload)
            .field("label", &self.label)
            .field("result_dir", &self.result_dir)
            .field("run_stamp", &self.run_stamp)
            .field("cost_meter", &self.cost_meter.is_some())
            .finish()
    }
}

impl Benchmark {
    pub fn new(workload: impl Into<PathBuf>, loader: Arc<JobLoader>) -> Self {
        Self {
            workload: workload.into(),
            label: "custom_agent".to_string(),
            result_dir: PathBuf::from("workspace/logs/results"),
            run_stamp: chrono::Local::now().format("%m%d_%H%M").to_string(),
            loader,
            cost_meter: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_result_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.result_dir = dir.into();
        self
    }

    /// Batch timestamp used in the report file name. Benchmarks sharing a
    /// stamp and workload name append to the same file.
    pub fn with_run_stamp(mut self, stamp: impl Into<String>) -> Self {
        self.run_stamp = stamp.into();
        self
    }

    pub fn with_cost_meter(mut self, meter: Arc<dyn CostMeter>) -> Self {
        self.cost_meter = Some(meter);
        self
    }

    pub fn workload(&self) -> &Path {
        &self.workload
    }

    pub fn workload_name(&self) -> String {
        self.loader.root(&self.workload).name()
    }

    pub fn report_store(&self) -> ReportStore {
        ReportStore::for_run(&self.result_dir, &self.run_stamp, &self.workload_name())
    }

    /// Sorted item ids from the requested source, capped at `max_items`.
    pub fn select_items(&self, opts: &ExecuteOptions) -> Vec<String> {
        let mut items = self.loader.list_items(&self.workload, opts.source);
        if let Some(max) = opts.max_items {
            items.truncate(max);
        }
        items
    }

    /// Run the batch selected by `opts`.
    pub async fn execute(
        &self,
        solvers: Arc<dyn SolverFactory>,
        opts: &ExecuteOptions,
    ) -> BatchSummary {
        let items = self.select_items(opts);
        self.execute_items(solvers, items, opts).await
    }

    /// Run an explicit list of work items.
    ///
    /// Never fails: per-item faults become zero-reward records and a failed
    /// report append is logged. The returned summary is what was (or should
    /// have been) written.
    pub async fn execute_items(
        &self,
        solvers: Arc<dyn SolverFactory>,
        items: Vec<String>,
        opts: &ExecuteOptions,
    ) -> BatchSummary {
        let cost_before = self.read_cost();
        let max_rewards = self.loader.load_max_rewards(&self.workload);

        info!(
            workload = ?self.workload,
            items = items.len(),
            concurrency = opts.concurrency,
            source = %opts.source,
            "benchmark: starting batch"
        );

        let started = Instant::now();
        let runner = BoundedRunner::new(opts.concurrency);
        let loader = Arc::clone(&self.loader);
        let workload = self.workload.clone();
        let source = opts.source;

        let runs = runner
            .run(items, move |item_id| {
                let loader = Arc::clone(&loader);
                let workload = workload.clone();
                let solvers = Arc::clone(&solvers);
                async move { run_item(&loader, &workload, &item_id, source, solvers.as_ref()).await }
            })
            .await;
        let elapsed = started.elapsed();

        let results: Vec<ItemResult> = runs
            .into_iter()
            .map(|run| {
                let max_reward = max_rewards.get(&run.item_id).copied().unwrap_or(0.0);
                match run.outcome {
                    Ok((report, max_steps)) => {
                        ItemResult::completed(run.item_id, report, max_reward, max_steps)
                    }
                    Err(err) => {
                        warn!(workload = ?self.workload, item = %run.item_id, error = %err, "benchmark: work item failed");
                        let failure = ItemFailure {
                            reason: format!("{err:#}"),
                            during_resolution: err.is_workload_resolution(),
                        };
                        ItemResult::failed(run.item_id, max_reward, failure)
                    }
                }
            })
            .collect();

        let cost = cost_delta(cost_before, self.read_cost());
        let summary = BatchSummary::new(&self.workload, &self.label, results, elapsed, cost);

        self.persist(&summary).await;
        log_summary(&summary, opts.max_items);
        summary
    }

    fn read_cost(&self) -> Option<f64> {
        self.cost_meter.as_ref().and_then(|m| m.total_cost())
    }

    async fn persist(&self, summary: &BatchSummary) {
        let store = self.report_store();
        let path = store.path().to_path_buf();
        let row = summary.to_row();

        match tokio::task::spawn_blocking(move || store.append(&row)).await {
            Ok(Ok(())) => info!(path = ?path, "benchmark: results saved"),
            Ok(Err(err)) => error!(path = ?path, error = %err, "benchmark: failed to save results"),
            Err(err) => error!(path = ?path, error = %err, "benchmark: report writer task failed"),
        }
    }
}

async fn run_item(
    loader: &JobLoader,
    workload: &Path,
    item_id: &str,
    source: ItemSource,
    solvers: &dyn SolverFactory,
) -> Result<(SolverReport, Option<u32>)> {
    let mut job = loader.load(workload, item_id, source)?;
    let mut solver = solvers.create(item_id).map_err(BenchError::Other)?;
    let report = solver
        .run(&mut job.env, &job.info)
        .await
        .map_err(BenchError::Other)?;
    Ok((report, job.info.max_steps))
}

fn log_summary(summary: &BatchSummary, max_items: Option<usize>) {
    let scope = match max_items {
        Some(n) => format!(" (first {n} items)"),
        None => String::new(),
    };
    info!("Workload {:?}{scope}:", summary.workload_path);
    info!("  Total reward: {}", summary.total_reward);
    info!("  Max reward: {}", summary.max_reward_total);
    match summary.ratio {
        Some(r) => info!("  Success ratio: {:.2}%", r * 100.0),
        None => info!("  Success ratio: N/A"),
    }
    if !summary.events.is_empty() {
        info!("  Events: {:?}", summary.events);
    }
}
