//! Deterministic environments and solvers for driving the runner in tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use benchdag::bench::{Solver, SolverFactory, SolverReport, run_episode};
use benchdag::dag::BoxFuture;
use benchdag::workload::{
    EnvInfo, Environment, EnvironmentRegistry, Observation, RewardOutcome, SandboxedEnvironment,
    WorkItem, WorkloadRoot,
};
use serde::Deserialize;

pub const SCRIPTED_KIND: &str = "scripted";

/// Level body for [`ScriptedEnvironment`]:
///
/// ```toml
/// steps = 3
/// reward = 1.5
/// ```
#[derive(Debug, Clone, Deserialize)]
struct ScriptedLevel {
    steps: u32,
    #[serde(default)]
    reward: f64,
}

/// Pays a fixed reward per step for a fixed number of steps, emitting one
/// `tick` event per step.
#[derive(Debug, Default)]
pub struct ScriptedEnvironment {
    level: Option<ScriptedLevel>,
    taken: u32,
}

impl Environment for ScriptedEnvironment {
    fn reset(&mut self, item: &WorkItem) -> anyhow::Result<Observation> {
        self.level = Some(item.parse()?);
        self.taken = 0;
        Ok(Observation::Null)
    }

    fn step(&mut self, _action: &str) -> anyhow::Result<Observation> {
        self.taken += 1;
        Ok(Observation::from(self.taken))
    }

    fn reward(&mut self) -> anyhow::Result<RewardOutcome> {
        let level = self
            .level
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("reward before reset"))?;
        Ok(RewardOutcome {
            reward: level.reward,
            events: vec!["tick".to_string()],
            info: Observation::Null,
        })
    }

    fn done(&self) -> bool {
        self.level.as_ref().is_some_and(|l| self.taken >= l.steps)
    }
}

fn scripted_factory(_root: &WorkloadRoot, _env_id: &str) -> anyhow::Result<Box<dyn Environment>> {
    Ok(Box::new(ScriptedEnvironment::default()))
}

/// Registry with the scripted kind registered.
pub fn scripted_registry() -> EnvironmentRegistry {
    EnvironmentRegistry::new().with(SCRIPTED_KIND, scripted_factory)
}

/// Tracks how many solvers are running right now and the highest value seen.
#[derive(Debug, Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
    started: AtomicUsize,
}

impl ConcurrencyGauge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    fn enter(self: &Arc<Self>) -> GaugeGuard {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard(Arc::clone(self))
    }
}

struct GaugeGuard(Arc<ConcurrencyGauge>);

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Solver factory whose solvers hold the gauge for `delay`, then play the
/// episode with the `tick` action. Listed items fail or panic instead.
#[derive(Debug, Clone)]
pub struct ScriptedSolvers {
    gauge: Arc<ConcurrencyGauge>,
    delay: Duration,
    failing: HashSet<String>,
    panicking: HashSet<String>,
}

impl ScriptedSolvers {
    pub fn new(gauge: Arc<ConcurrencyGauge>) -> Self {
        Self {
            gauge,
            delay: Duration::ZERO,
            failing: HashSet::new(),
            panicking: HashSet::new(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self, item: &str) -> Self {
        self.failing.insert(item.to_string());
        self
    }

    pub fn panicking(mut self, item: &str) -> Self {
        self.panicking.insert(item.to_string());
        self
    }

    pub fn shared(self) -> Arc<dyn SolverFactory> {
        Arc::new(self)
    }
}

impl SolverFactory for ScriptedSolvers {
    fn create(&self, item_id: &str) -> anyhow::Result<Box<dyn Solver>> {
        Ok(Box::new(ScriptedSolver {
            gauge: Arc::clone(&self.gauge),
            delay: self.delay,
            fail: self.failing.contains(item_id),
            panic: self.panicking.contains(item_id),
        }))
    }
}

struct ScriptedSolver {
    gauge: Arc<ConcurrencyGauge>,
    delay: Duration,
    fail: bool,
    panic: bool,
}

impl Solver for ScriptedSolver {
    fn run<'a>(
        &'a mut self,
        env: &'a mut SandboxedEnvironment,
        info: &'a EnvInfo,
    ) -> BoxFuture<'a, anyhow::Result<SolverReport>> {
        Box::pin(async move {
            let _held = self.gauge.enter();
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.panic {
                panic!("scripted solver panic on '{}'", info.item_id);
            }
            if self.fail {
                anyhow::bail!("scripted solver failure on '{}'", info.item_id);
            }
            run_episode(env, info, |_| "tick".to_string())
        })
    }
}
