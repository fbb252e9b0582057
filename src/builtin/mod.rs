// src/builtin/mod.rs

//! Built-in environment kinds and solvers available to the CLI.

pub mod grid;
pub mod random;

pub use grid::GridEnvironment;
pub use random::{RandomSolver, RandomSolverFactory};

use crate::workload::EnvironmentRegistry;

/// Registry with every built-in environment kind.
pub fn registry() -> EnvironmentRegistry {
    EnvironmentRegistry::new().with(grid::KIND, grid::factory)
}
