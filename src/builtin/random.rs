// src/builtin/random.rs

//! Seeded random-action baseline solver.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::bench::{Solver, SolverFactory, SolverReport, run_episode};
use crate::dag::BoxFuture;
use crate::workload::{EnvInfo, SandboxedEnvironment};

/// Picks uniformly among a fixed action list.
#[derive(Debug)]
pub struct RandomSolver {
    rng: StdRng,
    actions: Vec<String>,
}

impl RandomSolver {
    pub fn new(seed: u64, actions: Vec<String>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            actions,
        }
    }
}

impl Solver for RandomSolver {
    fn run<'a>(
        &'a mut self,
        env: &'a mut SandboxedEnvironment,
        info: &'a EnvInfo,
    ) -> BoxFuture<'a, anyhow::Result<SolverReport>> {
        Box::pin(async move {
            let RandomSolver { rng, actions } = self;
            run_episode(env, info, |_| actions.choose(&mut *rng).cloned().unwrap_or_default())
        })
    }
}

/// Builds a [`RandomSolver`] per item, each seeded from the shared seed and
/// the item id so items get distinct but reproducible action sequences.
#[derive(Debug, Clone)]
pub struct RandomSolverFactory {
    seed: u64,
    actions: Vec<String>,
}

impl RandomSolverFactory {
    pub fn new(seed: u64, actions: Vec<String>) -> Self {
        Self { seed, actions }
    }
}

impl SolverFactory for RandomSolverFactory {
    fn create(&self, item_id: &str) -> anyhow::Result<Box<dyn Solver>> {
        let seed = item_id
            .bytes()
            .fold(self.seed, |acc, b| acc.rotate_left(5) ^ u64::from(b));
        Ok(Box::new(RandomSolver::new(seed, self.actions.clone())))
    }
}
