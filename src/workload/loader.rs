// src/workload/loader.rs

//! Job loader: turns a workload directory plus a work-item id into a ready
//! environment and its metadata.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::config::model::{EnvironmentDefinition, WorkloadConfig};
use crate::errors::{BenchError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::ItemSource;
use crate::workload::environment::{EnvironmentRegistry, WorkItem};
use crate::workload::layout::{
    ACTION_SPACE_FILE, CONFIG_FILE, DEFINITION_FILE, INSTRUCTION_FILE, MAX_REWARDS_FILE,
    WorkloadRoot,
};
use crate::workload::sandbox::SandboxedEnvironment;

/// Descriptive metadata handed to a solver alongside the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvInfo {
    pub item_id: String,
    pub agent_instruction: String,
    pub action_space: String,
    /// Step bound from the workload's `config.toml`, if it declares one.
    pub max_steps: Option<u32>,
}

/// A loaded work item, ready to be driven by a solver.
#[derive(Debug)]
pub struct LoadedJob {
    pub env: SandboxedEnvironment,
    pub info: EnvInfo,
}

/// Workload-wide metadata (everything in [`EnvInfo`] except the item id).
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadMetadata {
    pub agent_instruction: String,
    pub action_space: String,
    pub max_steps: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct MaxRewardReport {
    #[serde(default)]
    levels: BTreeMap<String, LevelMaxReward>,
}

#[derive(Debug, Deserialize)]
struct LevelMaxReward {
    #[serde(default)]
    max_reward: f64,
}

/// Resolves workloads against an explicit [`EnvironmentRegistry`].
///
/// Nothing is cached: each `load` re-reads the workload's files and builds a
/// fresh environment.
#[derive(Debug, Clone)]
pub struct JobLoader {
    registry: Arc<EnvironmentRegistry>,
    fs: Arc<dyn FileSystem>,
}

impl JobLoader {
    pub fn new(registry: Arc<EnvironmentRegistry>) -> Self {
        Self::with_fs(registry, Arc::new(RealFileSystem))
    }

    pub fn with_fs(registry: Arc<EnvironmentRegistry>, fs: Arc<dyn FileSystem>) -> Self {
        Self { registry, fs }
    }

    pub fn registry(&self) -> &EnvironmentRegistry {
        &self.registry
    }

    pub fn root(&self, workload: &Path) -> WorkloadRoot {
        WorkloadRoot::new(workload, Arc::clone(&self.fs))
    }

    pub fn list_items(&self, workload: &Path, source: ItemSource) -> Vec<String> {
        self.root(workload).list_items(source)
    }

    /// Load one work item.
    ///
    /// Validation happens before anything is instantiated, in this order:
    /// the item's resource file, the metadata files, the definition file.
    pub fn load(&self, workload: &Path, item_id: &str, source: ItemSource) -> Result<LoadedJob> {
        let root = self.root(workload);

        let item = self.validate_item(&root, item_id, source)?;
        let meta = self.read_metadata(&root)?;
        let kind = self.read_definition(&root)?;

        let factory = self
            .registry
            .get(&kind)
            .ok_or_else(|| BenchError::UnknownEnvironmentType {
                kind: kind.clone(),
                definition: root.resolve(DEFINITION_FILE),
            })?;

        let env_id = format!("{}_benchmark", root.name());
        debug!(workload = ?root.dir(), item = %item_id, kind = %kind, "instantiating environment");
        let env = factory.create(&root, &env_id)?;

        let info = EnvInfo {
            item_id: item.id.clone(),
            agent_instruction: meta.agent_instruction,
            action_space: meta.action_space,
            max_steps: meta.max_steps,
        };

        Ok(LoadedJob {
            env: SandboxedEnvironment::new(env, root, item),
            info,
        })
    }

    /// Read instruction, action space and step bound.
    ///
    /// Instruction and action space are required and must be non-empty;
    /// `config.toml` is optional but must parse when present.
    pub fn read_metadata(&self, root: &WorkloadRoot) -> Result<WorkloadMetadata> {
        let agent_instruction = read_required(root, INSTRUCTION_FILE)?;
        let action_space = read_required(root, ACTION_SPACE_FILE)?;

        let max_steps = if root.exists(CONFIG_FILE) {
            let path = root.resolve(CONFIG_FILE);
            let raw = root
                .read_to_string(CONFIG_FILE)
                .map_err(|e| BenchError::InvalidMetadata {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            let cfg: WorkloadConfig =
                toml::from_str(&raw).map_err(|e| BenchError::InvalidMetadata {
                    path,
                    reason: e.to_string(),
                })?;
            cfg.termination.max_steps
        } else {
            None
        };

        Ok(WorkloadMetadata {
            agent_instruction,
            action_space,
            max_steps,
        })
    }

    /// Per-item maximum rewards from `level_max_rewards.json`.
    ///
    /// A missing or unreadable file yields an empty map; callers treat absent
    /// items as having a ceiling of zero.
    pub fn load_max_rewards(&self, workload: &Path) -> BTreeMap<String, f64> {
        let root = self.root(workload);
        let path = root.resolve(MAX_REWARDS_FILE);
        if !root.exists(MAX_REWARDS_FILE) {
            warn!(path = ?path, "max reward file not found");
            return BTreeMap::new();
        }

        let parsed = root
            .read_to_string(MAX_REWARDS_FILE)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                serde_json::from_str::<MaxRewardReport>(&raw).map_err(|e| e.to_string())
            });

        match parsed {
            Ok(report) => report
                .levels
                .into_iter()
                .map(|(name, level)| (strip_item_extension(&name).to_string(), level.max_reward))
                .collect(),
            Err(reason) => {
                error!(path = ?path, error = %reason, "failed to read max reward file");
                BTreeMap::new()
            }
        }
    }

    fn validate_item(&self, root: &WorkloadRoot, item_id: &str, source: ItemSource) -> Result<WorkItem> {
        let (found_in, path) =
            root.find_item(source, item_id)
                .ok_or_else(|| BenchError::MissingResource {
                    workload: root.dir().to_path_buf(),
                    item: item_id.to_string(),
                })?;

        let raw = root
            .fs()
            .read_to_string(&path)
            .map_err(|e| BenchError::MalformedResource {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if let Err(e) = toml::from_str::<toml::Table>(&raw) {
            return Err(BenchError::MalformedResource {
                path,
                reason: e.to_string(),
            });
        }

        if found_in != source {
            debug!(item = %item_id, requested = %source, found = %found_in, "work item resolved from fallback source");
        }

        Ok(WorkItem {
            id: item_id.to_string(),
            source: found_in,
            path,
            raw,
        })
    }

    fn read_definition(&self, root: &WorkloadRoot) -> Result<String> {
        let path = root.resolve(DEFINITION_FILE);
        if !root.exists(DEFINITION_FILE) {
            return Err(BenchError::MissingDefinition(path));
        }
        let raw = root
            .read_to_string(DEFINITION_FILE)
            .map_err(|e| BenchError::InvalidMetadata {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        let def: EnvironmentDefinition =
            toml::from_str(&raw).map_err(|e| BenchError::InvalidMetadata {
                path,
                reason: e.to_string(),
            })?;
        Ok(def.kind)
    }
}

fn read_required(root: &WorkloadRoot, file: &str) -> Result<String> {
    let missing = || BenchError::MissingMetadata {
        workload: root.dir().to_path_buf(),
        file: file.to_string(),
    };
    if !root.exists(file) {
        return Err(missing());
    }
    let text = root.read_to_string(file).map_err(|_| missing())?;
    if text.trim().is_empty() {
        return Err(missing());
    }
    Ok(text)
}

fn strip_item_extension(name: &str) -> &str {
    [".toml", ".yaml", ".yml"]
        .iter()
        .find_map(|ext| name.strip_suffix(ext))
        .unwrap_or(name)
}
