// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Cycle detected in DAG: {0}")]
    CycleDetected(String),

    #[error("node '{node}' depends on '{predecessor}', which is not reachable from the root")]
    UnreachablePredecessor { node: String, predecessor: String },

    #[error("nodes '{first}' and '{second}' both write context key '{key}' in the same frontier")]
    ConflictingWrites {
        key: String,
        first: String,
        second: String,
    },

    #[error("node '{node}' failed: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("environment definition not found: {0:?}")]
    MissingDefinition(PathBuf),

    #[error("no environment type registered as '{kind}' (declared in {definition:?})")]
    UnknownEnvironmentType { kind: String, definition: PathBuf },

    #[error("workload {workload:?} is missing required metadata file '{file}'")]
    MissingMetadata { workload: PathBuf, file: String },

    #[error("invalid metadata in {path:?}: {reason}")]
    InvalidMetadata { path: PathBuf, reason: String },

    #[error("work item '{item}' has no resource file in {workload:?}")]
    MissingResource { workload: PathBuf, item: String },

    #[error("resource file {path:?} is malformed: {reason}")]
    MalformedResource { path: PathBuf, reason: String },

    #[error("failed to persist report to {path:?}: {reason}")]
    Persist { path: PathBuf, reason: String },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BenchError {
    /// Whether this error comes from resolving a workload or one of its work
    /// items (as opposed to a fault while the job was running).
    pub fn is_workload_resolution(&self) -> bool {
        matches!(
            self,
            BenchError::MissingDefinition(_)
                | BenchError::UnknownEnvironmentType { .. }
                | BenchError::MissingMetadata { .. }
                | BenchError::InvalidMetadata { .. }
                | BenchError::MissingResource { .. }
                | BenchError::MalformedResource { .. }
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BenchError>;
