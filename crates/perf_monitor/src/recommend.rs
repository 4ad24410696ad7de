//! Advisory text derived from aggregated statistics

use crate::measurement::Measurement;
use crate::stats::Stats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Average duration above which a label is flagged for optimization.
pub const SLOW_AVERAGE_MS: f64 = 2000.0;
/// P95 above which a label is flagged for latency variance.
pub const HIGH_P95_MS: f64 = 5000.0;
/// Throughput (ops/sec) below which a busy label is flagged for batching.
pub const LOW_THROUGHPUT_PER_SEC: f64 = 0.1;
/// Minimum sample count before low throughput is reported.
pub const LOW_THROUGHPUT_MIN_COUNT: usize = 10;
/// Memory growth across a slow operation that triggers a memory advisory.
pub const HIGH_MEMORY_DELTA_BYTES: i64 = 10 * 1024 * 1024;
/// Duration above which a slow mobile operation triggers a mobile advisory.
pub const SLOW_MOBILE_MS: f64 = 3000.0;

/// A single performance recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Recommendation {
    /// The label is slow on average
    #[serde(rename_all = "camelCase")]
    Optimize { label: String, average_ms: f64 },
    /// The label's tail latency is high
    #[serde(rename_all = "camelCase")]
    HighLatencyVariance { label: String, p95_ms: f64 },
    /// The label runs often but slowly enough that batching would help
    #[serde(rename_all = "camelCase")]
    LowThroughput { label: String, throughput: f64, count: usize },
    /// Slow operations grew memory significantly
    ReduceMemory,
    /// Slow operations were observed on mobile clients
    MobilePerformance,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimize { label, average_ms } => write!(
                f,
                "Consider optimizing \"{label}\": average duration is {average_ms:.0}ms"
            ),
            Self::HighLatencyVariance { label, p95_ms } => write!(
                f,
                "\"{label}\" has high latency variance (p95 {p95_ms:.0}ms); consider caching or timeouts"
            ),
            Self::LowThroughput { label, throughput, count } => write!(
                f,
                "\"{label}\" has low throughput ({throughput:.3} ops/sec over {count} samples); consider batching requests"
            ),
            Self::ReduceMemory => write!(
                f,
                "High memory growth detected in slow operations; consider reducing allocations or streaming large payloads"
            ),
            Self::MobilePerformance => write!(
                f,
                "Slow operations detected on mobile clients; consider lighter payloads or progressive loading for mobile"
            ),
        }
    }
}

/// Derive recommendations from per-label statistics and the complete set of
/// slow operations.
///
/// Label rules run in label order, one rule at a time; the memory and mobile
/// rules fire at most once each.
pub fn synthesize(summary: &BTreeMap<String, Stats>, slow_operations: &[Measurement]) -> Vec<Recommendation> {
    let mut out = Vec::new();

    for (label, stats) in summary {
        if stats.average > SLOW_AVERAGE_MS {
            out.push(Recommendation::Optimize {
                label: label.clone(),
                average_ms: stats.average,
            });
        }
    }

    for (label, stats) in summary {
        if stats.p95 > HIGH_P95_MS {
            out.push(Recommendation::HighLatencyVariance {
                label: label.clone(),
                p95_ms: stats.p95,
            });
        }
    }

    for (label, stats) in summary {
        if stats.throughput < LOW_THROUGHPUT_PER_SEC && stats.count > LOW_THROUGHPUT_MIN_COUNT {
            out.push(Recommendation::LowThroughput {
                label: label.clone(),
                throughput: stats.throughput,
                count: stats.count,
            });
        }
    }

    let high_memory = slow_operations.iter().any(|m| {
        m.metadata()
            .memory_delta_bytes
            .is_some_and(|delta| delta > HIGH_MEMORY_DELTA_BYTES)
    });
    if high_memory {
        out.push(Recommendation::ReduceMemory);
    }

    let slow_mobile = slow_operations
        .iter()
        .any(|m| m.metadata().is_mobile() && m.duration_ms() > SLOW_MOBILE_MS);
    if slow_mobile {
        out.push(Recommendation::MobilePerformance);
    }

    out
}
