//! Descriptive statistics over measurement series

use crate::measurement::Measurement;
use crate::store::MetricStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trailing window used for throughput, in milliseconds.
pub const THROUGHPUT_WINDOW_MS: i64 = 60_000;

/// Statistical summary of one label's measurements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Arithmetic mean in milliseconds
    pub average: f64,
    /// Nearest-rank median in milliseconds
    pub median: f64,
    /// Minimum in milliseconds
    pub min: f64,
    /// Maximum in milliseconds
    pub max: f64,
    /// Number of measurements
    pub count: usize,
    /// Duration of the most recently recorded measurement
    pub latest: f64,
    /// Nearest-rank 95th percentile in milliseconds
    pub p95: f64,
    /// Nearest-rank 99th percentile in milliseconds
    pub p99: f64,
    /// Population standard deviation in milliseconds
    pub standard_deviation: f64,
    /// Operations per second over the trailing throughput window
    pub throughput: f64,
}

impl Stats {
    /// Compute statistics for a series ordered oldest first.
    ///
    /// Returns `None` for an empty series. `now_ms` anchors the throughput
    /// window, which spans `window_ms` and is reported per second.
    pub fn from_series<'a, I>(series: I, now_ms: i64, window_ms: i64) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Measurement>,
    {
        let mut sorted = Vec::new();
        let mut latest = None;
        let mut recent = 0usize;
        let window_start = now_ms - window_ms;

        for m in series {
            sorted.push(m.duration_ms());
            latest = Some(m.duration_ms());
            if m.timestamp() > window_start {
                recent += 1;
            }
        }

        let latest = latest?;
        let count = sorted.len();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let sum: f64 = sorted.iter().sum();
        let average = sum / count as f64;
        let variance =
            sorted.iter().map(|d| (d - average).powi(2)).sum::<f64>() / count as f64;
        let window_secs = (window_ms as f64 / 1000.0).max(f64::MIN_POSITIVE);

        Some(Self {
            average,
            median: nearest_rank(&sorted, 0.5),
            min: sorted[0],
            max: sorted[count - 1],
            count,
            latest,
            p95: nearest_rank(&sorted, 0.95),
            p99: nearest_rank(&sorted, 0.99),
            standard_deviation: variance.sqrt(),
            throughput: recent as f64 / window_secs,
        })
    }
}

/// Select `sorted[floor(n * fraction)]`, clamped to the last element.
fn nearest_rank(sorted: &[f64], fraction: f64) -> f64 {
    let index = (sorted.len() as f64 * fraction).floor() as usize;
    sorted[index.min(sorted.len() - 1)]
}

/// Statistics for a single label, or `None` when it has no measurements.
pub fn label_stats(store: &MetricStore, label: &str, now_ms: i64, window_ms: i64) -> Option<Stats> {
    store
        .series(label)
        .and_then(|series| Stats::from_series(series, now_ms, window_ms))
}

/// Statistics for every label holding at least one measurement.
pub fn all_stats(store: &MetricStore, now_ms: i64, window_ms: i64) -> BTreeMap<String, Stats> {
    store
        .iter()
        .filter_map(|(label, series)| {
            Stats::from_series(series, now_ms, window_ms).map(|stats| (label.to_string(), stats))
        })
        .collect()
}

/// Every measurement longer than `threshold_ms`, slowest first.
///
/// Equal durations keep label order, then recording order.
pub fn slow_operations(store: &MetricStore, threshold_ms: f64) -> Vec<Measurement> {
    let mut slow: Vec<Measurement> = store
        .iter()
        .flat_map(|(_, series)| series.iter())
        .filter(|m| m.duration_ms() > threshold_ms)
        .cloned()
        .collect();

    slow.sort_by(|a, b| b.duration_ms().total_cmp(&a.duration_ms()));
    slow
}
