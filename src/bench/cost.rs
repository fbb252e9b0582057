// src/bench/cost.rs

//! Cost accounting for solver calls.
//!
//! A batch reads a [`CostMeter`] before and after its items run and reports
//! the (non-negative) difference.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{BenchError, Result};

/// Anything that can report a cumulative cost.
pub trait CostMeter: Send + Sync {
    /// Cumulative cost so far, or `None` if it cannot be read right now.
    fn total_cost(&self) -> Option<f64>;
}

impl<F> CostMeter for F
where
    F: Fn() -> Option<f64> + Send + Sync,
{
    fn total_cost(&self) -> Option<f64> {
        self()
    }
}

/// `after - before`, clamped at zero. `None` if either reading is missing.
pub fn cost_delta(before: Option<f64>, after: Option<f64>) -> Option<f64> {
    Some((after? - before?).max(0.0))
}

/// One model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCost {
    pub cost: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub calls: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_cost: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub call_count: u64,
    pub by_model: BTreeMap<String, ModelCost>,
}

/// Thread-safe ledger of model calls. Shared by every solver of a run.
#[derive(Debug, Default)]
pub struct CostLedger {
    records: Mutex<Vec<CostRecord>>,
}

impl CostLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, model: impl Into<String>, input_tokens: u64, output_tokens: u64, cost: f64) {
        let record = CostRecord {
            model: model.into(),
            input_tokens,
            output_tokens,
            cost,
        };
        self.records
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(record);
    }

    pub fn call_count(&self) -> usize {
        self.records.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn summary(&self) -> CostSummary {
        let records = self.records.lock().unwrap_or_else(|p| p.into_inner());
        let mut summary = CostSummary::default();

        for r in records.iter() {
            summary.total_cost += r.cost;
            summary.total_input_tokens += r.input_tokens;
            summary.total_output_tokens += r.output_tokens;
            summary.call_count += 1;

            let entry = summary.by_model.entry(r.model.clone()).or_default();
            entry.cost += r.cost;
            entry.input_tokens += r.input_tokens;
            entry.output_tokens += r.output_tokens;
            entry.calls += 1;
        }

        summary
    }

    /// Write the summary as pretty JSON to `<dir>/<YYYYmmdd_HHMMSS>.json`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("{stamp}.json"));

        let json = serde_json::to_string_pretty(&self.summary())?;
        fs::write(&path, json).map_err(|e| BenchError::Persist {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        info!(path = ?path, "cost summary saved");
        Ok(path)
    }
}

impl CostMeter for CostLedger {
    fn total_cost(&self) -> Option<f64> {
        Some(
            self.records
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .iter()
                .map(|r| r.cost)
                .sum(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_never_goes_negative() {
        assert_eq!(cost_delta(Some(2.0), Some(3.5)), Some(1.5));
        assert_eq!(cost_delta(Some(3.0), Some(1.0)), Some(0.0));
        assert_eq!(cost_delta(None, Some(1.0)), None);
    }

    #[test]
    fn summary_groups_by_model() {
        let ledger = CostLedger::new();
        ledger.record("small", 10, 5, 0.25);
        ledger.record("large", 100, 50, 1.0);
        ledger.record("small", 20, 5, 0.25);

        let s = ledger.summary();
        assert_eq!(s.call_count, 3);
        assert_eq!(s.total_cost, 1.5);
        assert_eq!(s.total_input_tokens, 130);
        assert_eq!(s.by_model["small"].calls, 2);
        assert_eq!(s.by_model["small"].cost, 0.5);
        assert_eq!(ledger.total_cost(), Some(1.5));
    }

    #[test]
    fn save_writes_json_summary() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = CostLedger::new();
        ledger.record("m", 1, 1, 0.5);

        let path = ledger.save(&dir.path().join("costs")).unwrap();
        let back: CostSummary =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(back, ledger.summary());
    }
}
