// src/workload/environment.rs

//! The environment contract and the registry that resolves a workload's
//! declared environment kind to a factory.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::types::ItemSource;
use crate::workload::layout::WorkloadRoot;

/// Observation handed back by `reset` / `step`.
pub type Observation = serde_json::Value;

/// Result of a reward computation after a transition.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardOutcome {
    pub reward: f64,
    /// Named events triggered by the last transition.
    pub events: Vec<String>,
    pub info: serde_json::Value,
}

/// A validated work item: its id, where its resource was found, and the
/// resource contents (already checked to parse as TOML).
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: String,
    pub source: ItemSource,
    pub path: PathBuf,
    pub raw: String,
}

impl WorkItem {
    /// Deserialize the resource into an environment-specific level type.
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> anyhow::Result<T> {
        toml::from_str(&self.raw)
            .map_err(|e| anyhow::anyhow!("parsing work item {:?}: {e}", self.path))
    }
}

/// A simulated environment produced by a workload.
pub trait Environment: Send {
    /// Start a fresh episode on the given work item.
    fn reset(&mut self, item: &WorkItem) -> anyhow::Result<Observation>;

    /// Apply one action.
    fn step(&mut self, action: &str) -> anyhow::Result<Observation>;

    /// Reward, events and auxiliary info for the last transition.
    fn reward(&mut self) -> anyhow::Result<RewardOutcome>;

    fn done(&self) -> bool;
}

/// Builds environments for one workload kind.
///
/// Every environment I/O goes through `root`; factories must not rely on the
/// process working directory.
pub trait EnvironmentFactory: Send + Sync {
    fn create(&self, root: &WorkloadRoot, env_id: &str) -> anyhow::Result<Box<dyn Environment>>;
}

impl<F> EnvironmentFactory for F
where
    F: Fn(&WorkloadRoot, &str) -> anyhow::Result<Box<dyn Environment>> + Send + Sync,
{
    fn create(&self, root: &WorkloadRoot, env_id: &str) -> anyhow::Result<Box<dyn Environment>> {
        self(root, env_id)
    }
}

/// Explicit map from environment kind to factory.
#[derive(Clone, Default)]
pub struct EnvironmentRegistry {
    factories: BTreeMap<String, Arc<dyn EnvironmentFactory>>,
}

impl fmt::Debug for EnvironmentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentRegistry")
            .field("kinds", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EnvironmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; a later registration of the same kind replaces it.
    pub fn register(&mut self, kind: impl Into<String>, factory: impl EnvironmentFactory + 'static) {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    pub fn with(mut self, kind: impl Into<String>, factory: impl EnvironmentFactory + 'static) -> Self {
        self.register(kind, factory);
        self
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn EnvironmentFactory>> {
        self.factories.get(kind).cloned()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|k| k.as_str())
    }
}
