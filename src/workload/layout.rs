// src/workload/layout.rs

//! Workload directory conventions and the root handle every workload reads
//! through.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::fs::{FileSystem, RealFileSystem};
use crate::types::ItemSource;

pub const DEFINITION_FILE: &str = "environment.toml";
pub const INSTRUCTION_FILE: &str = "agent_instruction.txt";
pub const ACTION_SPACE_FILE: &str = "action_space.txt";
pub const CONFIG_FILE: &str = "config.toml";
pub const MAX_REWARDS_FILE: &str = "level_max_rewards.json";
pub const ITEM_EXTENSION: &str = "toml";

/// A workload's root directory plus the filesystem used to read it.
///
/// Relative paths are always resolved against the workload directory, never
/// against the process working directory, so loaded workloads can run side
/// by side from any directory.
#[derive(Debug, Clone)]
pub struct WorkloadRoot {
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl WorkloadRoot {
    pub fn new(dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            dir: dir.into(),
            fs,
        }
    }

    pub fn real(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, Arc::new(RealFileSystem))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Last path component, used in report names and environment ids.
    pub fn name(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown_env".to_string())
    }

    pub fn resolve(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.dir.join(rel)
    }

    pub fn exists(&self, rel: impl AsRef<Path>) -> bool {
        self.fs.is_file(&self.resolve(rel))
    }

    pub fn read_to_string(&self, rel: impl AsRef<Path>) -> Result<String> {
        self.fs.read_to_string(&self.resolve(rel))
    }

    /// Path of a work item's resource file within one item source.
    pub fn item_path(&self, source: ItemSource, item_id: &str) -> PathBuf {
        self.dir
            .join(source.dir_name())
            .join(format!("{item_id}.{ITEM_EXTENSION}"))
    }

    /// Locate an item's resource file: the requested source first, then the
    /// other one.
    pub fn find_item(&self, source: ItemSource, item_id: &str) -> Option<(ItemSource, PathBuf)> {
        [source, source.other()]
            .into_iter()
            .map(|s| (s, self.item_path(s, item_id)))
            .find(|(_, path)| self.fs.is_file(path))
    }

    /// Sorted ids of every item in one source. A missing directory yields an
    /// empty list.
    pub fn list_items(&self, source: ItemSource) -> Vec<String> {
        let dir = self.dir.join(source.dir_name());
        if !self.fs.is_dir(&dir) {
            warn!(dir = ?dir, "work item directory does not exist");
            return Vec::new();
        }

        let entries = match self.fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = ?dir, error = %err, "failed to list work items");
                return Vec::new();
            }
        };

        let mut items: Vec<String> = entries
            .into_iter()
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(ITEM_EXTENSION))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        items.sort();
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn root_with(files: &[&str]) -> WorkloadRoot {
        let fs = MockFileSystem::new();
        for f in files {
            fs.add_file(format!("/w/{f}"), "x = 1");
        }
        WorkloadRoot::new("/w", Arc::new(fs))
    }

    #[test]
    fn lists_only_item_files_sorted() {
        let root = root_with(&["levels/b.toml", "levels/a.toml", "levels/notes.md"]);
        assert_eq!(root.list_items(ItemSource::Test), vec!["a", "b"]);
        assert!(root.list_items(ItemSource::Val).is_empty());
    }

    #[test]
    fn find_item_falls_back_to_other_source() {
        let root = root_with(&["val_levels/held.toml"]);
        let (source, path) = root.find_item(ItemSource::Test, "held").unwrap();
        assert_eq!(source, ItemSource::Val);
        assert_eq!(path, PathBuf::from("/w/val_levels/held.toml"));
        assert!(root.find_item(ItemSource::Test, "absent").is_none());
    }
}
