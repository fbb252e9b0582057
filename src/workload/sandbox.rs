// src/workload/sandbox.rs

use anyhow::Context;
use tracing::trace;

use crate::workload::environment::{Environment, Observation, RewardOutcome, WorkItem};
use crate::workload::layout::WorkloadRoot;

/// An environment bound to its workload root and the work item it was
/// loaded for.
///
/// Every call is tagged with the workload and item so failures from deep
/// inside a workload say where they came from.
pub struct SandboxedEnvironment {
    inner: Box<dyn Environment>,
    root: WorkloadRoot,
    item: WorkItem,
}

impl std::fmt::Debug for SandboxedEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxedEnvironment")
            .field("workload", &self.root.dir())
            .field("item", &self.item.id)
            .finish_non_exhaustive()
    }
}

impl SandboxedEnvironment {
    pub fn new(inner: Box<dyn Environment>, root: WorkloadRoot, item: WorkItem) -> Self {
        Self { inner, root, item }
    }

    pub fn root(&self) -> &WorkloadRoot {
        &self.root
    }

    pub fn item(&self) -> &WorkItem {
        &self.item
    }

    /// Reset onto the bound work item.
    pub fn reset(&mut self) -> anyhow::Result<Observation> {
        trace!(workload = %self.root.name(), item = %self.item.id, "env reset");
        self.inner
            .reset(&self.item)
            .with_context(|| self.describe("reset"))
    }

    pub fn step(&mut self, action: &str) -> anyhow::Result<Observation> {
        trace!(workload = %self.root.name(), item = %self.item.id, action, "env step");
        self.inner
            .step(action)
            .with_context(|| self.describe("step"))
    }

    pub fn reward(&mut self) -> anyhow::Result<RewardOutcome> {
        self.inner.reward().with_context(|| self.describe("reward"))
    }

    pub fn done(&self) -> bool {
        self.inner.done()
    }

    fn describe(&self, op: &str) -> String {
        format!(
            "{op} failed in workload {:?} on item '{}'",
            self.root.dir(),
            self.item.id
        )
    }
}
