//! Dashboard assembly
//!
//! A [`Dashboard`] combines the monitor's report with snapshots from the
//! application cache and the backing service. Collaborator failures degrade
//! the payload instead of failing it.

use crate::error::DashboardResult;
use crate::sources::{CacheSnapshot, CacheStatsSource, NoSource, ServiceHealth, ServiceHealthSource};
use perf_monitor::{PerformanceMonitor, Report};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

/// Default time a collaborator gets to answer.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything an operator view needs at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPayload {
    /// Unique snapshot identifier
    pub id: Uuid,
    pub report: Report,
    /// Cache counters, absent if the source failed or is not configured
    pub cache: Option<CacheSnapshot>,
    /// Service health, absent if the probe failed or is not configured
    pub service_health: Option<ServiceHealth>,
}

impl DashboardPayload {
    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> DashboardResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether the backing service is known to be up.
    pub fn service_available(&self) -> bool {
        self.service_health.as_ref().is_some_and(|h| h.available)
    }
}

/// Builds [`DashboardPayload`]s.
pub struct Dashboard<C = NoSource, H = NoSource> {
    monitor: PerformanceMonitor,
    cache: Option<C>,
    health: Option<H>,
    source_timeout: Duration,
}

impl Dashboard {
    /// Dashboard over `monitor` with no collaborators.
    pub fn new(monitor: PerformanceMonitor) -> Self {
        Self {
            monitor,
            cache: None,
            health: None,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }
}

impl<C, H> Dashboard<C, H> {
    /// Read cache counters from `source`.
    pub fn with_cache_source<S: CacheStatsSource>(self, source: S) -> Dashboard<S, H> {
        Dashboard {
            monitor: self.monitor,
            cache: Some(source),
            health: self.health,
            source_timeout: self.source_timeout,
        }
    }

    /// Probe service health through `source`.
    pub fn with_health_source<S: ServiceHealthSource>(self, source: S) -> Dashboard<C, S> {
        Dashboard {
            monitor: self.monitor,
            cache: self.cache,
            health: Some(source),
            source_timeout: self.source_timeout,
        }
    }

    /// Set how long each collaborator may take to answer.
    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }
}

impl<C: CacheStatsSource, H: ServiceHealthSource> Dashboard<C, H> {
    /// Assemble a payload.
    ///
    /// Collaborators are queried concurrently.
    pub async fn snapshot(&self) -> DashboardPayload {
        let report = self.monitor.generate_report();

        let cache = async {
            match &self.cache {
                Some(source) => collect("cache", self.source_timeout, source.cache_stats()).await,
                None => None,
            }
        };
        let health = async {
            match &self.health {
                Some(source) => collect("service_health", self.source_timeout, source.service_health()).await,
                None => None,
            }
        };
        let (cache, service_health) = tokio::join!(cache, health);

        let payload = DashboardPayload {
            id: Uuid::new_v4(),
            report,
            cache,
            service_health,
        };
        tracing::debug!(
            target: "dashboard::snapshot",
            id = %payload.id,
            labels = payload.report.summary.len(),
            alerts = payload.report.recent_alerts.len(),
            "Dashboard snapshot assembled"
        );
        payload
    }
}

async fn collect<T, F>(source: &'static str, timeout: Duration, fut: F) -> Option<T>
where
    F: Future<Output = DashboardResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::warn!(target: "dashboard::source", source, error = %e, "Source failed");
            None
        }
        Err(_) => {
            tracing::warn!(
                target: "dashboard::source",
                source,
                timeout_ms = timeout.as_millis() as u64,
                "Source timed out"
            );
            None
        }
    }
}
