#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use benchdag::config::{ConfigFile, ConfigSection, RawConfigFile, SolverSection, WorkloadEntry};
use benchdag::errors::Result;
use benchdag::types::ItemSource;
use tempfile::TempDir;

use crate::fakes::SCRIPTED_KIND;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                solver: SolverSection::default(),
                workload: Vec::new(),
            },
        }
    }

    pub fn with_workload(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.workload.push(WorkloadEntry { path: path.into() });
        self
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.config.config.concurrency = n;
        self
    }

    pub fn with_max_items(mut self, n: Option<usize>) -> Self {
        self.config.config.max_items = n;
        self
    }

    pub fn with_mode(mut self, mode: ItemSource) -> Self {
        self.config.config.mode = mode;
        self
    }

    pub fn with_solver_kind(mut self, kind: &str) -> Self {
        self.config.solver.kind = kind.to_string();
        self
    }

    pub fn with_actions(mut self, actions: &[&str]) -> Self {
        self.config.solver.actions = actions.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A workload directory written into a temp dir. Removed on drop.
pub struct Workload {
    _tmp: TempDir,
    path: PathBuf,
}

impl Workload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove a file relative to the workload root.
    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.path.join(rel)).expect("remove workload file");
    }

    /// Overwrite (or create) a file relative to the workload root.
    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.path.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create workload dir");
        }
        fs::write(path, contents).expect("write workload file");
    }
}

/// Builder for an on-disk workload.
///
/// Defaults to the scripted environment kind with non-empty instruction and
/// action space files and no items.
pub struct WorkloadBuilder {
    name: String,
    kind: Option<String>,
    instruction: Option<String>,
    action_space: Option<String>,
    max_steps: Option<u32>,
    items: Vec<(ItemSource, String, String)>,
    max_rewards: BTreeMap<String, f64>,
}

impl WorkloadBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: Some(SCRIPTED_KIND.to_string()),
            instruction: Some("Tick until the episode ends.".to_string()),
            action_space: Some("tick".to_string()),
            max_steps: None,
            items: Vec::new(),
            max_rewards: BTreeMap::new(),
        }
    }

    pub fn kind(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_string());
        self
    }

    pub fn without_definition(mut self) -> Self {
        self.kind = None;
        self
    }

    pub fn without_instruction(mut self) -> Self {
        self.instruction = None;
        self
    }

    pub fn max_steps(mut self, n: u32) -> Self {
        self.max_steps = Some(n);
        self
    }

    /// Add a test item with the given level body.
    pub fn item(mut self, id: &str, body: &str) -> Self {
        self.items.push((ItemSource::Test, id.to_string(), body.to_string()));
        self
    }

    pub fn val_item(mut self, id: &str, body: &str) -> Self {
        self.items.push((ItemSource::Val, id.to_string(), body.to_string()));
        self
    }

    /// Add a scripted test item paying `reward` per step for `steps` steps,
    /// with a matching max-reward entry.
    pub fn scripted(self, id: &str, steps: u32, reward: f64) -> Self {
        self.item(id, &format!("steps = {steps}\nreward = {reward:?}\n"))
            .max_reward(id, reward * f64::from(steps))
    }

    pub fn max_reward(mut self, id: &str, max: f64) -> Self {
        self.max_rewards.insert(id.to_string(), max);
        self
    }

    pub fn build(self) -> Workload {
        let tmp = tempfile::tempdir().expect("create tempdir");
        let path = tmp.path().join(&self.name);
        let w = Workload { _tmp: tmp, path };
        fs::create_dir_all(w.path()).expect("create workload dir");

        if let Some(kind) = &self.kind {
            w.write("environment.toml", &format!("kind = \"{kind}\"\n"));
        }
        if let Some(text) = &self.instruction {
            w.write("agent_instruction.txt", text);
        }
        if let Some(text) = &self.action_space {
            w.write("action_space.txt", text);
        }
        if let Some(n) = self.max_steps {
            w.write("config.toml", &format!("[termination]\nmax_steps = {n}\n"));
        }
        for (source, id, body) in &self.items {
            w.write(&format!("{}/{id}.toml", source.dir_name()), body);
        }
        if !self.max_rewards.is_empty() {
            let entries: Vec<String> = self
                .max_rewards
                .iter()
                .map(|(id, max)| format!("\"{id}.toml\": {{\"max_reward\": {max:?}}}"))
                .collect();
            w.write(
                "level_max_rewards.json",
                &format!("{{\"levels\": {{{}}}}}", entries.join(", ")),
            );
        }

        w
    }
}
