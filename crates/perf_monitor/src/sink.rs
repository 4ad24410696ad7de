//! Diagnostic output for the monitor.
//!
//! The sink is chosen when the monitor is built: [`TracingSink`] emits
//! `tracing` events, [`NullSink`] discards everything.

use crate::alerts::Alert;
use crate::measurement::Measurement;
use std::sync::Arc;

/// Receiver of monitor diagnostics.
///
/// All methods have empty default bodies so a sink only implements what it
/// cares about.
pub trait DiagnosticSink: Send + Sync {
    /// A measurement was appended to its series.
    fn measurement_recorded(&self, _measurement: &Measurement, _evicted: usize) {}

    /// A measurement exceeded its threshold.
    fn alert_raised(&self, _alert: &Alert) {}

    /// Expired alerts were dropped.
    fn alerts_pruned(&self, _count: usize) {}

    /// A subscriber returned an error or panicked while handling an alert.
    fn subscriber_failed(&self, _alert: &Alert, _error: &str) {}

    /// A timer was dropped without being finished.
    fn timer_abandoned(&self, _label: &str, _elapsed_ms: f64) {}

    /// A threshold was not a finite positive number and was ignored.
    fn threshold_rejected(&self, _label: &str, _ms: f64) {}
}

/// Sink writing structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn measurement_recorded(&self, measurement: &Measurement, evicted: usize) {
        tracing::trace!(
            target: "perf_monitor::record",
            label = measurement.label(),
            duration_ms = measurement.duration_ms(),
            evicted = evicted,
            "measurement recorded"
        );
    }

    fn alert_raised(&self, alert: &Alert) {
        tracing::warn!(
            target: "perf_monitor::alert",
            label = %alert.label,
            value_ms = alert.value,
            threshold_ms = alert.threshold,
            "slow operation"
        );
    }

    fn alerts_pruned(&self, count: usize) {
        tracing::debug!(target: "perf_monitor::alert", pruned = count, "expired alerts pruned");
    }

    fn subscriber_failed(&self, alert: &Alert, error: &str) {
        tracing::error!(
            target: "perf_monitor::alert",
            label = %alert.label,
            value_ms = alert.value,
            threshold_ms = alert.threshold,
            error = error,
            "alert subscriber failed"
        );
    }

    fn timer_abandoned(&self, label: &str, elapsed_ms: f64) {
        tracing::trace!(
            target: "perf_monitor::timer",
            label = label,
            elapsed_ms = elapsed_ms,
            "timer dropped without finishing"
        );
    }

    fn threshold_rejected(&self, label: &str, ms: f64) {
        tracing::warn!(
            target: "perf_monitor::threshold",
            label = label,
            threshold_ms = ms,
            "threshold ignored: not a finite positive number"
        );
    }
}

/// Sink that discards all diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for Arc<T> {
    fn measurement_recorded(&self, measurement: &Measurement, evicted: usize) {
        (**self).measurement_recorded(measurement, evicted);
    }

    fn alert_raised(&self, alert: &Alert) {
        (**self).alert_raised(alert);
    }

    fn alerts_pruned(&self, count: usize) {
        (**self).alerts_pruned(count);
    }

    fn subscriber_failed(&self, alert: &Alert, error: &str) {
        (**self).subscriber_failed(alert, error);
    }

    fn timer_abandoned(&self, label: &str, elapsed_ms: f64) {
        (**self).timer_abandoned(label, elapsed_ms);
    }

    fn threshold_rejected(&self, label: &str, ms: f64) {
        (**self).threshold_rejected(label, ms);
    }
}
