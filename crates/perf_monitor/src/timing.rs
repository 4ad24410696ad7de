//! Timers bracketing instrumented operations

use crate::measurement::{Measurement, Metadata};
use crate::memory::memory_delta;
use crate::monitor::PerformanceMonitor;
use std::time::{Duration, Instant};

/// A running timer for one operation.
///
/// Finishing the timer records exactly one measurement. `finish` consumes
/// the timer, so an operation cannot be recorded twice; dropping or
/// cancelling it records nothing.
///
/// # Example
///
/// ```rust
/// use perf_monitor::{Metadata, PerformanceMonitor};
///
/// let monitor = PerformanceMonitor::new();
/// let timer = monitor.start_timer("lookup_soil", Some(Metadata::new().with_extra("region", "north")));
/// // ... do the lookup ...
/// let measurement = timer.finish();
/// assert_eq!(measurement.label(), "lookup_soil");
/// ```
#[must_use = "a timer records nothing unless it is finished"]
pub struct OperationTimer {
    monitor: PerformanceMonitor,
    label: String,
    metadata: Option<Metadata>,
    start: Instant,
    start_memory: Option<u64>,
    done: bool,
}

impl OperationTimer {
    pub(crate) fn start(monitor: PerformanceMonitor, label: String, metadata: Option<Metadata>) -> Self {
        let start_memory = monitor.sample_memory();
        Self {
            monitor,
            label,
            metadata,
            start: Instant::now(),
            start_memory,
            done: false,
        }
    }

    /// Label being timed.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Elapsed time so far.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed time so far in milliseconds.
    #[inline]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Stop the timer and record the measurement.
    pub fn finish(self) -> Measurement {
        self.finish_with(Metadata::default())
    }

    /// Stop the timer, attach `metadata` and record the measurement.
    ///
    /// Fields given here take precedence over metadata passed at start,
    /// which in turn takes precedence over fields the monitor derives
    /// (memory delta, client kind, platform).
    pub fn finish_with(mut self, metadata: Metadata) -> Measurement {
        let duration_ms = self.elapsed_ms();
        self.done = true;

        let delta = memory_delta(self.start_memory, self.monitor.sample_memory());
        let merged = metadata
            .merge_missing(self.metadata.take().unwrap_or_default())
            .merge_missing(self.monitor.derived_metadata(delta));

        let measurement = Measurement::new(
            std::mem::take(&mut self.label),
            duration_ms,
            self.monitor.next_timestamp(),
        )
        .with_metadata(merged);

        self.monitor.record_metric(measurement.clone());
        measurement
    }

    /// Discard the timer without recording.
    pub fn cancel(mut self) {
        self.done = true;
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        if !self.done {
            self.monitor.sink().timer_abandoned(&self.label, self.elapsed_ms());
        }
    }
}

impl std::fmt::Debug for OperationTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationTimer")
            .field("label", &self.label)
            .field("elapsed_ms", &self.elapsed_ms())
            .finish()
    }
}

/// A timer that records when it goes out of scope.
///
/// Unlike [`OperationTimer`], dropping this guard records the measurement.
/// Use [`ScopedTimer::cancel`] to skip recording.
#[must_use = "the scope is timed until this guard is dropped"]
pub struct ScopedTimer {
    timer: Option<OperationTimer>,
}

impl ScopedTimer {
    /// Start timing `label` on `monitor`.
    pub fn new(monitor: &PerformanceMonitor, label: impl Into<String>) -> Self {
        Self {
            timer: Some(monitor.start_timer(label, None)),
        }
    }

    /// Elapsed time so far in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.timer.as_ref().map_or(0.0, OperationTimer::elapsed_ms)
    }

    /// Stop now without recording.
    pub fn cancel(mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.finish();
        }
    }
}

/// Macro for easy scope timing.
///
/// Records the time until the end of the enclosing scope. With one argument
/// the global monitor is used.
///
/// # Example
///
/// ```rust
/// use perf_monitor::{time_scope, PerformanceMonitor};
///
/// let monitor = PerformanceMonitor::new();
/// {
///     time_scope!(monitor, "render_results");
///     // ... work ...
/// }
/// assert_eq!(monitor.get_stats("render_results").unwrap().count, 1);
/// ```
#[macro_export]
macro_rules! time_scope {
    ($name:expr) => {
        let _timer = $crate::ScopedTimer::new($crate::global_monitor(), $name);
    };
    ($monitor:expr, $name:expr) => {
        let _timer = $crate::ScopedTimer::new(&$monitor, $name);
    };
}
