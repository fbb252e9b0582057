// src/bench/result.rs

//! Per-item result records and their fold into one batch summary.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::bench::report::ReportRow;
use crate::bench::solver::SolverReport;

/// Items whose ratio reaches this value count as solved.
pub const SUCCESS_THRESHOLD: f64 = 0.999;

/// `total / max`, or `None` when the ceiling is zero.
pub fn ratio(total: f64, max: f64) -> Option<f64> {
    if max == 0.0 { None } else { Some(total / max) }
}

/// Why a work item produced no result.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    pub reason: String,
    /// The item failed while its workload was being resolved, before any
    /// solver ran.
    pub during_resolution: bool,
}

/// One work item's outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemResult {
    pub item_id: String,
    pub reward: f64,
    pub steps: u32,
    pub events_count: BTreeMap<String, u64>,
    pub max_reward: f64,
    pub ratio: Option<f64>,
    pub max_steps: Option<u32>,
    pub failure: Option<ItemFailure>,
}

impl ItemResult {
    pub fn completed(
        item_id: impl Into<String>,
        report: SolverReport,
        max_reward: f64,
        max_steps: Option<u32>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            ratio: ratio(report.total_reward, max_reward),
            reward: report.total_reward,
            steps: report.steps,
            events_count: report.events_count,
            max_reward,
            max_steps,
            failure: None,
        }
    }

    /// A zero-reward record carrying the failure reason.
    pub fn failed(item_id: impl Into<String>, max_reward: f64, failure: ItemFailure) -> Self {
        Self {
            item_id: item_id.into(),
            reward: 0.0,
            steps: 0,
            events_count: BTreeMap::new(),
            max_reward,
            ratio: ratio(0.0, max_reward),
            max_steps: None,
            failure: Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.ratio.is_some_and(|r| r >= SUCCESS_THRESHOLD)
    }
}

/// Everything known about one `execute()` batch.
///
/// Built once after every item finished; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub workload_path: PathBuf,
    pub label: String,
    pub total_reward: f64,
    pub max_reward_total: f64,
    pub ratio: Option<f64>,
    pub cost: Option<f64>,
    /// Wall-clock completion time, `%Y-%m-%d %H:%M:%S` local.
    pub timestamp: String,
    pub item_ids: Vec<String>,
    pub total_steps: u64,
    pub success_count: usize,
    pub events: BTreeMap<String, u64>,
    pub duration: Duration,
    pub items: Vec<ItemResult>,
}

impl BatchSummary {
    pub fn new(
        workload_path: impl Into<PathBuf>,
        label: impl Into<String>,
        items: Vec<ItemResult>,
        duration: Duration,
        cost: Option<f64>,
    ) -> Self {
        let total_reward: f64 = items.iter().map(|i| i.reward).sum();
        let max_reward_total: f64 = items.iter().map(|i| i.max_reward).sum();
        let total_steps: u64 = items.iter().map(|i| u64::from(i.steps)).sum();
        let success_count = items.iter().filter(|i| i.is_success()).count();

        let mut events: BTreeMap<String, u64> = BTreeMap::new();
        for item in &items {
            for (name, count) in &item.events_count {
                *events.entry(name.clone()).or_insert(0) += count;
            }
        }

        Self {
            workload_path: workload_path.into(),
            label: label.into(),
            total_reward,
            max_reward_total,
            ratio: ratio(total_reward, max_reward_total),
            cost,
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            item_ids: items.iter().map(|i| i.item_id.clone()).collect(),
            total_steps,
            success_count,
            events,
            duration,
            items,
        }
    }

    pub fn item_count(&self) -> usize {
        self.item_ids.len()
    }

    pub fn avg_reward_per_item(&self) -> Option<f64> {
        let n = self.item_count();
        (n > 0).then(|| self.total_reward / n as f64)
    }

    pub fn avg_steps_per_item(&self) -> Option<f64> {
        let n = self.item_count();
        (n > 0).then(|| self.total_steps as f64 / n as f64)
    }

    pub fn failed_items(&self) -> impl Iterator<Item = &ItemResult> {
        self.items.iter().filter(|i| i.failure.is_some())
    }

    /// Every selected item failed during workload resolution.
    pub fn is_aborted(&self) -> bool {
        !self.items.is_empty()
            && self
                .items
                .iter()
                .all(|i| i.failure.as_ref().is_some_and(|f| f.during_resolution))
    }

    /// Flatten into the report's column layout.
    pub fn to_row(&self) -> ReportRow {
        let events_summary = if self.events.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&self.events).unwrap_or_default()
        };

        ReportRow::new()
            .with("workload_path", self.workload_path.display())
            .with("label", &self.label)
            .with("total_reward", self.total_reward)
            .with("max_reward_total", self.max_reward_total)
            .with_opt("ratio", self.ratio)
            .with_opt("cost", self.cost)
            .with("timestamp", &self.timestamp)
            .with("item_count", self.item_count())
            .with("item_ids", self.item_ids.join("|"))
            .with_opt("avg_reward_per_item", self.avg_reward_per_item())
            .with("total_steps", self.total_steps)
            .with_opt("avg_steps_per_item", self.avg_steps_per_item())
            .with("success_items", self.success_count)
            .with("events_summary", events_summary)
            .with("duration_seconds", self.duration.as_secs_f64())
    }
}
