// src/bench/mod.rs

//! Benchmark batches over workloads.
//!
//! - [`solver`]: the agent contract and a helper episode loop.
//! - [`runner`]: runs one job per work item under a concurrency bound.
//! - [`result`]: per-item records and the batch summary.
//! - [`report`]: the locked, append-only CSV store.
//! - [`cost`]: cost meters and the call ledger.
//! - [`benchmark`]: ties the above together for one workload.

pub mod benchmark;
pub mod cost;
pub mod report;
pub mod result;
pub mod runner;
pub mod solver;

pub use benchmark::{Benchmark, ExecuteOptions};
pub use cost::{CostLedger, CostMeter, CostRecord, CostSummary, ModelCost, cost_delta};
pub use report::{ReportRow, ReportStore};
pub use result::{BatchSummary, ItemFailure, ItemResult, SUCCESS_THRESHOLD, ratio};
pub use runner::{BoundedRunner, ItemRun};
pub use solver::{DEFAULT_STEP_LIMIT, Solver, SolverFactory, SolverReport, run_episode};
