// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{BenchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::BenchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.solver, raw.workload))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_workloads(cfg)?;
    validate_global_config(cfg)?;
    validate_workload_paths(cfg)?;
    validate_solver(cfg)?;
    Ok(())
}

fn ensure_has_workloads(cfg: &RawConfigFile) -> Result<()> {
    if cfg.workload.is_empty() {
        return Err(BenchError::ConfigError(
            "config must contain at least one [[workload]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.concurrency == 0 {
        return Err(BenchError::ConfigError(
            "[config].concurrency must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.config.max_items == Some(0) {
        return Err(BenchError::ConfigError(
            "[config].max_items must be >= 1 when set (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_workload_paths(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for entry in cfg.workload.iter() {
        if entry.path.as_os_str().is_empty() {
            return Err(BenchError::ConfigError(
                "[[workload]] entry has an empty `path`".to_string(),
            ));
        }
        if !seen.insert(entry.path.clone()) {
            return Err(BenchError::ConfigError(format!(
                "workload {:?} is listed more than once",
                entry.path
            )));
        }
    }
    Ok(())
}

fn validate_solver(cfg: &RawConfigFile) -> Result<()> {
    if cfg.solver.kind != "random" {
        return Err(BenchError::ConfigError(format!(
            "unknown [solver].kind '{}' (expected \"random\")",
            cfg.solver.kind
        )));
    }
    if cfg.solver.actions.iter().all(|a| a.trim().is_empty()) {
        return Err(BenchError::ConfigError(
            "[solver].actions must contain at least one action".to_string(),
        ));
    }
    Ok(())
}
