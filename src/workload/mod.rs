// src/workload/mod.rs

//! Workloads: self-contained directories defining one environment kind plus
//! its resource and metadata files.
//!
//! - [`layout`] holds the directory conventions and the [`WorkloadRoot`]
//!   handle all workload I/O goes through.
//! - [`environment`] defines the environment contract and the registry that
//!   maps a workload's declared kind to a factory.
//! - [`loader`] validates a work item and builds its environment.
//! - [`sandbox`] binds a built environment to its root and work item.

pub mod environment;
pub mod layout;
pub mod loader;
pub mod sandbox;

pub use environment::{
    Environment, EnvironmentFactory, EnvironmentRegistry, Observation, RewardOutcome, WorkItem,
};
pub use layout::WorkloadRoot;
pub use loader::{EnvInfo, JobLoader, LoadedJob, WorkloadMetadata};
pub use sandbox::SandboxedEnvironment;
