// src/bench/solver.rs

//! The solver (agent) contract driven against each work item.

use std::collections::BTreeMap;

use crate::dag::BoxFuture;
use crate::workload::{EnvInfo, Observation, SandboxedEnvironment};

/// Step limit used when a workload declares no `max_steps`.
pub const DEFAULT_STEP_LIMIT: u32 = 1_000;

/// What a solver reports back after driving one work item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverReport {
    pub total_reward: f64,
    pub steps: u32,
    pub events_count: BTreeMap<String, u64>,
}

/// An agent that plays one work item to completion.
pub trait Solver: Send {
    fn run<'a>(
        &'a mut self,
        env: &'a mut SandboxedEnvironment,
        info: &'a EnvInfo,
    ) -> BoxFuture<'a, anyhow::Result<SolverReport>>;
}

/// Creates a fresh solver per work item, so no solver state leaks between
/// items.
pub trait SolverFactory: Send + Sync {
    fn create(&self, item_id: &str) -> anyhow::Result<Box<dyn Solver>>;
}

impl<F> SolverFactory for F
where
    F: Fn(&str) -> anyhow::Result<Box<dyn Solver>> + Send + Sync,
{
    fn create(&self, item_id: &str) -> anyhow::Result<Box<dyn Solver>> {
        self(item_id)
    }
}

/// Drive one episode with a synchronous policy.
///
/// Resets the environment, then alternates `choose` → `step` → `reward`
/// until the environment is done or the step bound is reached, summing
/// rewards and counting events.
pub fn run_episode(
    env: &mut SandboxedEnvironment,
    info: &EnvInfo,
    mut choose: impl FnMut(&Observation) -> String,
) -> anyhow::Result<SolverReport> {
    let limit = info.max_steps.unwrap_or(DEFAULT_STEP_LIMIT);
    let mut report = SolverReport::default();
    let mut obs = env.reset()?;

    while !env.done() && report.steps < limit {
        let action = choose(&obs);
        obs = env.step(&action)?;
        report.steps += 1;

        let outcome = env.reward()?;
        report.total_reward += outcome.reward;
        for event in outcome.events {
            *report.events_count.entry(event).or_insert(0) += 1;
        }
    }

    Ok(report)
}
