//! Monitor configuration

use crate::alerts::DEFAULT_ALERT_WINDOW_MINUTES;
use crate::error::{MonitorError, Result};
use crate::measurement::ClientKind;
use crate::stats::THROUGHPUT_WINDOW_MS;
use crate::store::DEFAULT_MAX_ENTRIES;
use crate::threshold::{is_valid_threshold, DEFAULT_THRESHOLD_MS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a [`PerformanceMonitor`](crate::PerformanceMonitor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorConfig {
    /// Whether measurements are recorded at all
    pub enabled: bool,
    /// Maximum measurements retained per label
    pub max_entries: usize,
    /// Threshold for labels without an explicit one, in milliseconds
    pub default_threshold_ms: f64,
    /// How long alerts are retained, in minutes
    pub alert_retention_minutes: u32,
    /// Trailing window for throughput, in milliseconds
    pub throughput_window_ms: i64,
    /// Number of slow operations exposed in a report
    pub report_slow_operation_limit: usize,
    /// Client kind stamped onto timed measurements
    pub client: ClientKind,
    /// Whether timers sample process memory to derive a delta
    pub track_memory: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: DEFAULT_MAX_ENTRIES,
            default_threshold_ms: DEFAULT_THRESHOLD_MS,
            alert_retention_minutes: DEFAULT_ALERT_WINDOW_MINUTES,
            throughput_window_ms: THROUGHPUT_WINDOW_MS,
            report_slow_operation_limit: 10,
            client: ClientKind::Unknown,
            track_memory: true,
        }
    }
}

impl MonitorConfig {
    /// Create a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-label capacity.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the fallback threshold.
    pub fn with_default_threshold(mut self, ms: f64) -> Self {
        self.default_threshold_ms = ms;
        self
    }

    /// Set the alert retention window.
    pub fn with_alert_retention(mut self, minutes: u32) -> Self {
        self.alert_retention_minutes = minutes;
        self
    }

    /// Set the throughput window.
    pub fn with_throughput_window(mut self, ms: i64) -> Self {
        self.throughput_window_ms = ms;
        self
    }

    /// Set how many slow operations a report exposes.
    pub fn with_report_limit(mut self, limit: usize) -> Self {
        self.report_slow_operation_limit = limit;
        self
    }

    /// Set the client kind stamped onto timed measurements.
    pub fn with_client(mut self, client: ClientKind) -> Self {
        self.client = client;
        self
    }

    /// Enable or disable memory sampling in timers.
    pub fn with_memory_tracking(mut self, track_memory: bool) -> Self {
        self.track_memory = track_memory;
        self
    }

    /// Enable or disable recording.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(MonitorError::InvalidConfig(
                "maxEntries must be at least 1".to_string(),
            ));
        }
        if !is_valid_threshold(self.default_threshold_ms) {
            return Err(MonitorError::InvalidConfig(format!(
                "defaultThresholdMs must be a positive number, got {}",
                self.default_threshold_ms
            )));
        }
        if self.alert_retention_minutes == 0 {
            return Err(MonitorError::InvalidConfig(
                "alertRetentionMinutes must be at least 1".to_string(),
            ));
        }
        if self.throughput_window_ms <= 0 {
            return Err(MonitorError::InvalidConfig(format!(
                "throughputWindowMs must be positive, got {}",
                self.throughput_window_ms
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    ///
    /// A missing or unparsable file yields the defaults with a warning; a
    /// file that parses but fails validation is an error.
    pub fn load_sync(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No monitor config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = match serde_json::from_str::<Self>(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "Failed to parse monitor config {}, using defaults: {}",
                    path.display(),
                    e
                );
                return Ok(Self::default());
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Write configuration as pretty JSON, creating parent directories.
    pub fn save_sync(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
