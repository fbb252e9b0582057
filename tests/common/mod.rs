#![allow(dead_code, unused_imports)]

pub use benchdag_test_utils::builders::{ConfigFileBuilder, Workload, WorkloadBuilder};
pub use benchdag_test_utils::fakes::{
    ConcurrencyGauge, SCRIPTED_KIND, ScriptedSolvers, scripted_registry,
};
pub use benchdag_test_utils::{init_tracing, with_timeout};

use std::sync::Arc;

use benchdag::workload::JobLoader;

/// Loader over the real filesystem that knows the scripted environment kind.
pub fn scripted_loader() -> Arc<JobLoader> {
    Arc::new(JobLoader::new(Arc::new(scripted_registry())))
}
