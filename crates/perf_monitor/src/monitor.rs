//! The monitor context shared by instrumentation call sites

use crate::alerts::{notify, Alert, AlertLog, AlertSubscriber, ChannelSubscriber, SubscriberList, SubscriptionId, DEFAULT_ALERT_WINDOW_MINUTES};
use crate::clock::{Clock, SystemClock};
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::measurement::{current_platform, ClientKind, Measurement, Metadata};
use crate::memory::{MemoryProbe, ProcessMemoryProbe};
use crate::report::Report;
use crate::sink::{DiagnosticSink, TracingSink};
use crate::stats::{self, Stats};
use crate::store::MetricStore;
use crate::threshold::{is_valid_threshold, ThresholdRegistry};
use crate::timing::OperationTimer;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;

/// Global monitor instance
static GLOBAL_MONITOR: OnceLock<PerformanceMonitor> = OnceLock::new();

/// Get the process-wide default monitor.
///
/// Created with the default configuration on first use. Code that can take
/// a monitor as a parameter should prefer doing so.
pub fn global_monitor() -> &'static PerformanceMonitor {
    GLOBAL_MONITOR.get_or_init(PerformanceMonitor::new)
}

/// Install `monitor` as the global default.
///
/// Fails, returning the monitor, if the global was already initialized.
pub fn set_global_monitor(monitor: PerformanceMonitor) -> std::result::Result<(), PerformanceMonitor> {
    GLOBAL_MONITOR.set(monitor)
}

/// Clear all measurements and alerts held by the global monitor.
pub fn reset_global_monitor() {
    global_monitor().clear_metrics(None);
}

// The monitor only observes; a panic elsewhere must not stop it recording.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

struct Inner {
    config: MonitorConfig,
    enabled: AtomicBool,
    store: Mutex<MetricStore>,
    thresholds: RwLock<ThresholdRegistry>,
    alerts: Mutex<AlertLog>,
    subscribers: RwLock<SubscriberList>,
    last_timestamp: AtomicI64,
    clock: Arc<dyn Clock>,
    memory: Arc<dyn MemoryProbe>,
    sink: Arc<dyn DiagnosticSink>,
}

/// Records operation timings, raises threshold alerts and builds reports.
///
/// A monitor is a cheap handle; clones share the same state and may be used
/// from any thread. Statistics and reports are computed from the current
/// measurements on every call.
///
/// # Example
///
/// ```rust
/// use perf_monitor::PerformanceMonitor;
///
/// let monitor = PerformanceMonitor::new();
/// monitor.set_threshold("predict", 200.0);
///
/// let timer = monitor.start_timer("predict", None);
/// // ... call the prediction service ...
/// timer.finish();
///
/// let stats = monitor.get_stats("predict").unwrap();
/// assert_eq!(stats.count, 1);
/// ```
#[derive(Clone)]
pub struct PerformanceMonitor {
    inner: Arc<Inner>,
}

impl PerformanceMonitor {
    /// Create a monitor with the default configuration.
    pub fn new() -> Self {
        Self::builder().build_unchecked()
    }

    /// Create a monitor with a validated configuration.
    pub fn with_config(config: MonitorConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Start building a monitor with custom collaborators.
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::default()
    }

    /// The configuration the monitor was built with.
    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Enable or disable recording.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether measurements are being recorded.
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Recording
    // =========================================================================

    /// Start timing an operation.
    ///
    /// Nothing is recorded until the returned timer is finished.
    pub fn start_timer(&self, label: impl Into<String>, metadata: Option<Metadata>) -> OperationTimer {
        OperationTimer::start(self.clone(), label.into(), metadata)
    }

    /// Record a measurement with an already known duration.
    ///
    /// The measurement is stamped with the monitor's clock.
    pub fn record(&self, label: impl Into<String>, duration_ms: f64, metadata: Metadata) -> Measurement {
        let measurement = Measurement::new(label, duration_ms, self.next_timestamp()).with_metadata(metadata);
        self.record_metric(measurement.clone());
        measurement
    }

    /// Append a measurement to its label's series and evaluate alerts.
    pub fn record_metric(&self, measurement: Measurement) {
        if !self.is_enabled() {
            return;
        }

        let now = self.inner.clock.now_ms();
        let alert = {
            let thresholds = read(&self.inner.thresholds);
            let label = measurement.label();
            thresholds
                .is_exceeded(label, measurement.duration_ms())
                .then(|| Alert::slow_operation(&measurement, thresholds.resolve(label), now))
        };

        // The alert is logged under the store lock so a full clear never
        // separates an alert from its measurement.
        let (evicted, pruned) = {
            let mut store = lock(&self.inner.store);
            let evicted = store.push(measurement.clone());
            let pruned = alert
                .as_ref()
                .map_or(0, |alert| lock(&self.inner.alerts).push(alert.clone(), now));
            (evicted, pruned)
        };

        let sink = self.inner.sink.as_ref();
        sink.measurement_recorded(&measurement, evicted);
        if let Some(alert) = alert {
            sink.alert_raised(&alert);
            if pruned > 0 {
                sink.alerts_pruned(pruned);
            }
            self.notify_subscribers(&alert);
        }
    }

    fn notify_subscribers(&self, alert: &Alert) {
        let subscribers = {
            let mut list = write(&self.inner.subscribers);
            list.remove_closed();
            list.snapshot()
        };
        notify(&subscribers, alert, self.inner.sink.as_ref());
    }

    /// Remove one label's measurements, or every measurement and alert when
    /// `label` is `None`.
    pub fn clear_metrics(&self, label: Option<&str>) {
        match label {
            Some(label) => {
                lock(&self.inner.store).remove(label);
            }
            None => {
                let mut store = lock(&self.inner.store);
                let mut alerts = lock(&self.inner.alerts);
                store.clear();
                alerts.clear();
            }
        }
    }

    // =========================================================================
    // Thresholds
    // =========================================================================

    /// Set the alert threshold for a label, in milliseconds.
    ///
    /// A value that is not a finite positive number is ignored and reported
    /// to the diagnostic sink.
    pub fn set_threshold(&self, label: impl Into<String>, ms: f64) {
        let label = label.into();
        if !is_valid_threshold(ms) {
            self.inner.sink.threshold_rejected(&label, ms);
            return;
        }
        write(&self.inner.thresholds).set(label, ms);
    }

    /// Remove a label's explicit threshold so it uses the default again.
    pub fn remove_threshold(&self, label: &str) -> Option<f64> {
        write(&self.inner.thresholds).remove(label)
    }

    /// Threshold currently applied to a label.
    pub fn threshold(&self, label: &str) -> f64 {
        read(&self.inner.thresholds).resolve(label)
    }

    /// Snapshot of the explicitly set thresholds.
    pub fn thresholds(&self) -> HashMap<String, f64> {
        read(&self.inner.thresholds).overrides().clone()
    }

    // =========================================================================
    // Alerts
    // =========================================================================

    /// Register an alert subscriber.
    ///
    /// Subscribers are called in registration order for every new alert.
    pub fn on_alert<S>(&self, subscriber: S) -> SubscriptionId
    where
        S: AlertSubscriber + 'static,
    {
        write(&self.inner.subscribers).add(Arc::new(subscriber))
    }

    /// Unregister a subscriber.
    pub fn remove_subscriber(&self, id: SubscriptionId) -> bool {
        write(&self.inner.subscribers).remove(id)
    }

    /// Receive alerts through a bounded channel.
    ///
    /// Alerts arriving while the channel is full are dropped for this
    /// receiver. Dropping the receiver ends the subscription.
    pub fn alert_channel(&self, capacity: usize) -> mpsc::Receiver<Alert> {
        let (subscriber, receiver) = ChannelSubscriber::bounded(capacity);
        self.on_alert(subscriber);
        receiver
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        read(&self.inner.subscribers).len()
    }

    /// Alerts raised within the last `window_minutes` (default 60).
    pub fn get_recent_alerts(&self, window_minutes: Option<u32>) -> Vec<Alert> {
        let window = window_minutes.unwrap_or(DEFAULT_ALERT_WINDOW_MINUTES);
        lock(&self.inner.alerts).recent(window, self.inner.clock.now_ms())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Statistics for a label, or `None` if it has no measurements.
    pub fn get_stats(&self, label: &str) -> Option<Stats> {
        let now = self.inner.clock.now_ms();
        let store = lock(&self.inner.store);
        stats::label_stats(&store, label, now, self.inner.config.throughput_window_ms)
    }

    /// Statistics for every label with measurements.
    pub fn get_all_stats(&self) -> BTreeMap<String, Stats> {
        let now = self.inner.clock.now_ms();
        let store = lock(&self.inner.store);
        stats::all_stats(&store, now, self.inner.config.throughput_window_ms)
    }

    /// Every measurement slower than `threshold_ms`, slowest first.
    ///
    /// Defaults to the configured default threshold.
    pub fn get_slow_operations(&self, threshold_ms: Option<f64>) -> Vec<Measurement> {
        let threshold = threshold_ms.unwrap_or(self.inner.config.default_threshold_ms);
        stats::slow_operations(&lock(&self.inner.store), threshold)
    }

    /// Labels with at least one measurement.
    pub fn labels(&self) -> Vec<String> {
        lock(&self.inner.store).labels().map(str::to_string).collect()
    }

    /// A copy of a label's measurements, oldest first.
    pub fn measurements(&self, label: &str) -> Vec<Measurement> {
        lock(&self.inner.store)
            .series(label)
            .map(|series| series.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Current process memory usage, or 0 when it cannot be determined.
    pub fn memory_usage_bytes(&self) -> u64 {
        self.inner.memory.current_usage_bytes().unwrap_or(0)
    }

    /// Build a report of the current state.
    pub fn generate_report(&self) -> Report {
        let now = self.inner.clock.now_ms();
        let config = &self.inner.config;

        let (summary, slow_operations) = {
            let store = lock(&self.inner.store);
            (
                stats::all_stats(&store, now, config.throughput_window_ms),
                stats::slow_operations(&store, config.default_threshold_ms),
            )
        };
        let recent_alerts = lock(&self.inner.alerts).recent(DEFAULT_ALERT_WINDOW_MINUTES, now);

        Report::assemble(
            now,
            summary,
            slow_operations,
            recent_alerts,
            self.memory_usage_bytes(),
            config.report_slow_operation_limit,
        )
    }

    // =========================================================================
    // Timer support
    // =========================================================================

    /// Next measurement timestamp; never smaller than one already handed out.
    pub(crate) fn next_timestamp(&self) -> i64 {
        let now = self.inner.clock.now_ms();
        let previous = self.inner.last_timestamp.fetch_max(now, Ordering::SeqCst);
        previous.max(now)
    }

    pub(crate) fn sample_memory(&self) -> Option<u64> {
        if self.inner.config.track_memory {
            self.inner.memory.current_usage_bytes()
        } else {
            None
        }
    }

    /// Metadata the monitor derives for a timed operation.
    pub(crate) fn derived_metadata(&self, memory_delta_bytes: Option<i64>) -> Metadata {
        let client = match self.inner.config.client {
            ClientKind::Unknown => None,
            client => Some(client),
        };
        Metadata {
            memory_delta_bytes,
            client,
            platform: Some(current_platform().to_string()),
            ..Metadata::default()
        }
    }

    pub(crate) fn sink(&self) -> &dyn DiagnosticSink {
        self.inner.sink.as_ref()
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("config", &self.inner.config)
            .field("enabled", &self.is_enabled())
            .field("measurements", &lock(&self.inner.store).total())
            .field("alerts", &lock(&self.inner.alerts).len())
            .finish()
    }
}

/// Builder for a [`PerformanceMonitor`] with injected collaborators.
pub struct MonitorBuilder {
    config: MonitorConfig,
    clock: Arc<dyn Clock>,
    memory: Arc<dyn MemoryProbe>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for MonitorBuilder {
    fn default() -> Self {
        Self {
            config: MonitorConfig::default(),
            clock: Arc::new(SystemClock),
            memory: Arc::new(ProcessMemoryProbe::new()),
            sink: Arc::new(TracingSink),
        }
    }
}

impl MonitorBuilder {
    /// Use `config`.
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `clock` for timestamps and time windows.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Use `probe` for memory readings.
    pub fn memory_probe(mut self, probe: impl MemoryProbe + 'static) -> Self {
        self.memory = Arc::new(probe);
        self
    }

    /// Send diagnostics to `sink`.
    pub fn sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Validate the configuration and build the monitor.
    pub fn build(self) -> Result<PerformanceMonitor> {
        self.config.validate()?;
        Ok(self.build_unchecked())
    }

    fn build_unchecked(self) -> PerformanceMonitor {
        let store = MetricStore::with_max_entries(self.config.max_entries);
        let thresholds = ThresholdRegistry::with_default(self.config.default_threshold_ms);
        let alerts = AlertLog::with_retention_minutes(self.config.alert_retention_minutes);

        PerformanceMonitor {
            inner: Arc::new(Inner {
                enabled: AtomicBool::new(self.config.enabled),
                store: Mutex::new(store),
                thresholds: RwLock::new(thresholds),
                alerts: Mutex::new(alerts),
                subscribers: RwLock::new(SubscriberList::new()),
                last_timestamp: AtomicI64::new(i64::MIN),
                clock: self.clock,
                memory: self.memory,
                sink: self.sink,
                config: self.config,
            }),
        }
    }
}
