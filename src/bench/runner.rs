// src/bench/runner.rs

//! Bounded concurrency runner.
//!
//! Every work item is spawned up front; a counting semaphore (the admission
//! gate) decides how many of them actually run at any moment. A permit is
//! held for the whole of an item's job and released when the job's future
//! completes, fails or panics.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::errors::{BenchError, Result};

/// Outcome of one work item.
#[derive(Debug)]
pub struct ItemRun<T> {
    pub item_id: String,
    pub outcome: Result<T>,
}

/// Runs one job per work item with at most `limit` in flight.
#[derive(Debug, Clone, Copy)]
pub struct BoundedRunner {
    limit: usize,
}

impl BoundedRunner {
    /// A limit of zero is treated as one.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run `job` for every item and return one [`ItemRun`] per item, in the
    /// order of `items`.
    ///
    /// A failing or panicking job only affects its own item.
    pub async fn run<T, F, Fut>(&self, items: Vec<String>, job: F) -> Vec<ItemRun<T>>
    where
        T: Send + 'static,
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let gate = Arc::new(Semaphore::new(self.limit));
        let job = Arc::new(job);
        let mut set = JoinSet::new();

        debug!(items = items.len(), limit = self.limit, "runner: scheduling work items");

        for (pos, item_id) in items.iter().cloned().enumerate() {
            let gate = Arc::clone(&gate);
            let job = Arc::clone(&job);

            set.spawn(async move {
                let outcome = async {
                    let _permit = gate.acquire_owned().await.map_err(|_| {
                        BenchError::Other(anyhow::anyhow!("admission gate closed"))
                    })?;
                    match AssertUnwindSafe(job(item_id.clone())).catch_unwind().await {
                        Ok(outcome) => outcome,
                        Err(panic) => Err(BenchError::Other(anyhow::anyhow!(
                            "work item '{}' panicked: {}",
                            item_id,
                            panic_message(panic.as_ref())
                        ))),
                    }
                }
                .await;
                (pos, outcome)
            });
        }

        let mut slots: Vec<Option<Result<T>>> = items.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((pos, outcome)) => slots[pos] = Some(outcome),
                Err(err) => warn!(error = %err, "runner: work item task was aborted"),
            }
        }

        items
            .into_iter()
            .zip(slots)
            .map(|(item_id, slot)| ItemRun {
                outcome: slot.unwrap_or_else(|| {
                    Err(BenchError::Other(anyhow::anyhow!(
                        "work item '{item_id}' did not complete"
                    )))
                }),
                item_id,
            })
            .collect()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
