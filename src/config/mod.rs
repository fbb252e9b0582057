// src/config/mod.rs

//! Configuration loading and validation for benchdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`), both for the suite
//!   config and for a workload's own `config.toml`.
//! - Load a suite config from disk (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ConfigSection, EnvironmentDefinition, RawConfigFile, SolverSection,
    TerminationSection, WorkloadConfig, WorkloadEntry,
};
