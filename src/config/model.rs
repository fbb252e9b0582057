// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::ItemSource;

/// Suite configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// result_dir = "workspace/logs/results"
/// concurrency = 2
/// max_items = 5
/// mode = "test"
/// label = "random-baseline"
///
/// [solver]
/// kind = "random"
/// seed = 7
///
/// [[workload]]
/// path = "envs/20_GridNavigation"
/// ```
///
/// All sections except `[[workload]]` are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub solver: SolverSection,

    /// Workloads to benchmark, in file order.
    #[serde(default)]
    pub workload: Vec<WorkloadEntry>,
}

/// Validated suite configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub solver: SolverSection,
    pub workload: Vec<WorkloadEntry>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        solver: SolverSection,
        workload: Vec<WorkloadEntry>,
    ) -> Self {
        Self {
            config,
            solver,
            workload,
        }
    }
}

/// `[config]` section: batch-wide run settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Directory that receives the per-workload CSV reports.
    #[serde(default = "default_result_dir")]
    pub result_dir: PathBuf,

    /// Admission gate size: work items in flight at once, per workload.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Cap on the number of work items per workload (`None` = all).
    #[serde(default = "default_max_items")]
    pub max_items: Option<usize>,

    #[serde(default)]
    pub mode: ItemSource,

    /// Free-form label written to every report row.
    #[serde(default = "default_label")]
    pub label: String,
}

fn default_result_dir() -> PathBuf {
    PathBuf::from("workspace/logs/results")
}

fn default_concurrency() -> usize {
    1
}

fn default_max_items() -> Option<usize> {
    Some(5)
}

fn default_label() -> String {
    "custom_agent".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            result_dir: default_result_dir(),
            concurrency: default_concurrency(),
            max_items: default_max_items(),
            mode: ItemSource::default(),
            label: default_label(),
        }
    }
}

/// `[solver]` section: which built-in solver drives the environments.
#[derive(Debug, Clone, Deserialize)]
pub struct SolverSection {
    #[serde(default = "default_solver_kind")]
    pub kind: String,

    /// Seed for randomised solvers; the same seed replays the same actions.
    #[serde(default)]
    pub seed: u64,

    #[serde(default = "default_actions")]
    pub actions: Vec<String>,
}

fn default_solver_kind() -> String {
    "random".to_string()
}

fn default_actions() -> Vec<String> {
    ["up", "down", "left", "right"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for SolverSection {
    fn default() -> Self {
        Self {
            kind: default_solver_kind(),
            seed: 0,
            actions: default_actions(),
        }
    }
}

/// `[[workload]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadEntry {
    /// Workload root directory.
    pub path: PathBuf,
}

/// A workload's own `config.toml`.
///
/// Only the termination bound is interpreted; everything else in the file is
/// tolerated and ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkloadConfig {
    #[serde(default)]
    pub termination: TerminationSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TerminationSection {
    #[serde(default)]
    pub max_steps: Option<u32>,
}

/// A workload's `environment.toml`: names the registered environment factory.
///
/// ```toml
/// kind = "grid"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentDefinition {
    pub kind: String,
}
