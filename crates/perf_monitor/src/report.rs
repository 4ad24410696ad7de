//! Point-in-time performance reports

use crate::alerts::Alert;
use crate::measurement::Measurement;
use crate::recommend::synthesize;
use crate::stats::Stats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of the monitor's state for a consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Epoch milliseconds at which the report was generated
    pub generated_at: i64,
    /// Statistics for every label with measurements
    pub summary: BTreeMap<String, Stats>,
    /// Slowest operations above the default threshold, truncated
    pub slow_operations: Vec<Measurement>,
    /// Alerts raised in the last 60 minutes
    pub recent_alerts: Vec<Alert>,
    /// Process memory usage in bytes, or 0 when unavailable
    pub memory_usage: u64,
    /// Advisory text derived from the full slow-operation set
    pub recommendations: Vec<String>,
}

impl Report {
    /// Assemble a report.
    ///
    /// Recommendations are derived from the complete `slow_operations` list
    /// before it is truncated to `slow_limit` entries.
    pub fn assemble(
        generated_at: i64,
        summary: BTreeMap<String, Stats>,
        mut slow_operations: Vec<Measurement>,
        recent_alerts: Vec<Alert>,
        memory_usage: u64,
        slow_limit: usize,
    ) -> Self {
        let recommendations = synthesize(&summary, &slow_operations)
            .iter()
            .map(ToString::to_string)
            .collect();
        slow_operations.truncate(slow_limit);

        Self {
            generated_at,
            summary,
            slow_operations,
            recent_alerts,
            memory_usage,
            recommendations,
        }
    }

    /// Total measurements across all labels.
    pub fn total_measurements(&self) -> usize {
        self.summary.values().map(|s| s.count).sum()
    }

    /// Whether any alerts were raised recently.
    pub fn has_alerts(&self) -> bool {
        !self.recent_alerts.is_empty()
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Performance Report: {} operations, {} measurements",
            self.summary.len(),
            self.total_measurements()
        )?;
        for (label, stats) in &self.summary {
            writeln!(
                f,
                "  {label}: avg {:.2}ms, p95 {:.2}ms, max {:.2}ms ({} samples)",
                stats.average, stats.p95, stats.max, stats.count
            )?;
        }
        if self.has_alerts() {
            writeln!(f, "  Recent alerts: {}", self.recent_alerts.len())?;
        }
        for recommendation in &self.recommendations {
            writeln!(f, "  - {recommendation}")?;
        }
        Ok(())
    }
}
