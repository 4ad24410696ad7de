//! Snapshots supplied by collaborators outside the monitor

use crate::error::{DashboardError, DashboardResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters reported by an application cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
    pub memory_usage_bytes: u64,
}

impl CacheSnapshot {
    /// Fraction of lookups served from the cache, 0.0 with no lookups.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Health of a backing service as seen by a probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    /// Whether the service answered
    pub available: bool,
    /// Status text reported by the service
    pub status: String,
    /// Round-trip time of the probe
    pub response_time_ms: f64,
    pub checked_at: DateTime<Utc>,
}

impl ServiceHealth {
    /// A service that answered with `status`.
    pub fn up(status: impl Into<String>, response_time_ms: f64) -> Self {
        Self {
            available: true,
            status: status.into(),
            response_time_ms: response_time_ms.max(0.0),
            checked_at: Utc::now(),
        }
    }

    /// A service that answered but is not ready to serve.
    pub fn down(status: impl Into<String>, response_time_ms: f64) -> Self {
        Self {
            available: false,
            ..Self::up(status, response_time_ms)
        }
    }
}

/// Supplies cache counters to the dashboard.
#[trait_variant::make(Send)]
pub trait CacheStatsSource: Send + Sync {
    /// Current cache counters.
    async fn cache_stats(&self) -> DashboardResult<CacheSnapshot>;
}

/// Supplies backing-service health to the dashboard.
#[trait_variant::make(Send)]
pub trait ServiceHealthSource: Send + Sync {
    /// Probe the service.
    async fn service_health(&self) -> DashboardResult<ServiceHealth>;
}

/// Placeholder for a collaborator that is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSource;

impl CacheStatsSource for NoSource {
    async fn cache_stats(&self) -> DashboardResult<CacheSnapshot> {
        Err(DashboardError::Source("no cache source configured".to_string()))
    }
}

impl ServiceHealthSource for NoSource {
    async fn service_health(&self) -> DashboardResult<ServiceHealth> {
        Err(DashboardError::Source("no health source configured".to_string()))
    }
}

/// Lock-free cache counters an application updates as it serves lookups.
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    entries: AtomicU64,
    memory_usage_bytes: AtomicU64,
}

impl CacheCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Update the size of the cache.
    pub fn set_size(&self, entries: u64, memory_usage_bytes: u64) {
        self.entries.store(entries, Ordering::Relaxed);
        self.memory_usage_bytes.store(memory_usage_bytes, Ordering::Relaxed);
    }

    /// Read all counters.
    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.load(Ordering::Relaxed),
            memory_usage_bytes: self.memory_usage_bytes.load(Ordering::Relaxed),
        }
    }
}

impl CacheStatsSource for CacheCounters {
    async fn cache_stats(&self) -> DashboardResult<CacheSnapshot> {
        Ok(self.snapshot())
    }
}

impl<T: CacheStatsSource> CacheStatsSource for Arc<T> {
    async fn cache_stats(&self) -> DashboardResult<CacheSnapshot> {
        (**self).cache_stats().await
    }
}

impl<T: ServiceHealthSource> ServiceHealthSource for Arc<T> {
    async fn service_health(&self) -> DashboardResult<ServiceHealth> {
        (**self).service_health().await
    }
}
