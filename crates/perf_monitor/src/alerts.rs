//! Threshold alerts, their retention window, and alert subscribers

use crate::measurement::Measurement;
use crate::sink::DiagnosticSink;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Default alert retention and query window, in minutes.
pub const DEFAULT_ALERT_WINDOW_MINUTES: u32 = 60;

/// Kind of alert raised by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// A measurement exceeded its label's threshold
    SlowOperation,
}

/// A single threshold violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert kind
    #[serde(rename = "type")]
    pub kind: AlertKind,
    /// Label of the offending operation
    pub label: String,
    /// Measured duration in milliseconds
    pub value: f64,
    /// Threshold in effect when the measurement was recorded
    pub threshold: f64,
    /// Epoch milliseconds at which the alert was raised
    pub timestamp: i64,
}

impl Alert {
    /// Build a slow-operation alert for a measurement.
    pub fn slow_operation(measurement: &Measurement, threshold: f64, timestamp: i64) -> Self {
        Self {
            kind: AlertKind::SlowOperation,
            label: measurement.label().to_string(),
            value: measurement.duration_ms(),
            threshold,
            timestamp,
        }
    }
}

impl std::fmt::Display for Alert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "slow operation {}: {:.2}ms (threshold: {:.2}ms)",
            self.label, self.value, self.threshold
        )
    }
}

fn minutes_to_ms(minutes: u32) -> i64 {
    i64::from(minutes) * 60_000
}

/// Alerts raised within the retention window, oldest first.
#[derive(Debug, Clone)]
pub struct AlertLog {
    alerts: Vec<Alert>,
    retention_ms: i64,
}

impl AlertLog {
    /// Create a log retaining alerts for the default 60 minutes.
    pub fn new() -> Self {
        Self::with_retention_minutes(DEFAULT_ALERT_WINDOW_MINUTES)
    }

    /// Create a log retaining alerts for `minutes`.
    pub fn with_retention_minutes(minutes: u32) -> Self {
        Self {
            alerts: Vec::new(),
            retention_ms: minutes_to_ms(minutes),
        }
    }

    /// Append an alert, then drop every alert older than the retention window.
    ///
    /// Returns the number of alerts pruned.
    pub fn push(&mut self, alert: Alert, now_ms: i64) -> usize {
        self.alerts.push(alert);
        self.prune(now_ms)
    }

    /// Drop alerts raised before `now_ms - retention`.
    pub fn prune(&mut self, now_ms: i64) -> usize {
        let cutoff = now_ms - self.retention_ms;
        let before = self.alerts.len();
        self.alerts.retain(|a| a.timestamp >= cutoff);
        before - self.alerts.len()
    }

    /// Alerts raised within the last `window_minutes`.
    ///
    /// This only filters; retention is unaffected.
    pub fn recent(&self, window_minutes: u32, now_ms: i64) -> Vec<Alert> {
        let cutoff = now_ms - minutes_to_ms(window_minutes);
        self.alerts
            .iter()
            .filter(|a| a.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    /// All retained alerts.
    pub fn all(&self) -> &[Alert] {
        &self.alerts
    }

    /// Number of retained alerts.
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    /// Whether no alerts are retained.
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Remove every alert.
    pub fn clear(&mut self) {
        self.alerts.clear();
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Subscribers
// =============================================================================

/// Receiver of alerts as they are raised.
///
/// Closures of the form `Fn(&Alert) -> anyhow::Result<()>` implement this
/// trait. Errors and panics are contained by the monitor.
pub trait AlertSubscriber: Send + Sync {
    /// Handle a newly raised alert.
    fn on_alert(&self, alert: &Alert) -> anyhow::Result<()>;

    /// Whether this subscriber can no longer receive alerts and should be
    /// dropped from the subscriber list.
    fn is_closed(&self) -> bool {
        false
    }
}

impl<F> AlertSubscriber for F
where
    F: Fn(&Alert) -> anyhow::Result<()> + Send + Sync,
{
    fn on_alert(&self, alert: &Alert) -> anyhow::Result<()> {
        self(alert)
    }
}

/// Handle identifying a registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Registered subscribers in registration order.
#[derive(Default)]
pub struct SubscriberList {
    next_id: u64,
    entries: Vec<(SubscriptionId, Arc<dyn AlertSubscriber>)>,
}

impl SubscriberList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber.
    pub fn add(&mut self, subscriber: Arc<dyn AlertSubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, subscriber));
        id
    }

    /// Unregister a subscriber. Returns whether it was registered.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        before != self.entries.len()
    }

    /// Drop subscribers that report themselves closed.
    pub fn remove_closed(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, s)| !s.is_closed());
        before - self.entries.len()
    }

    /// Clone the current subscribers so they can be invoked without holding
    /// the list's lock.
    pub fn snapshot(&self) -> Vec<Arc<dyn AlertSubscriber>> {
        self.entries.iter().map(|(_, s)| Arc::clone(s)).collect()
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no subscribers are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for SubscriberList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberList")
            .field("next_id", &self.next_id)
            .field("subscribers", &self.entries.len())
            .finish()
    }
}

/// Deliver an alert to every subscriber in order.
///
/// Each delivery is isolated: an error or panic is reported to `sink` and
/// the remaining subscribers still run. Returns the number of failures.
pub fn notify(subscribers: &[Arc<dyn AlertSubscriber>], alert: &Alert, sink: &dyn DiagnosticSink) -> usize {
    let mut failures = 0;
    for subscriber in subscribers {
        let outcome = catch_unwind(AssertUnwindSafe(|| subscriber.on_alert(alert)));
        let error = match outcome {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => format!("{err:#}"),
            Err(payload) => panic_message(payload.as_ref()),
        };
        failures += 1;
        sink.subscriber_failed(alert, &error);
    }
    failures
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_string()
    }
}

/// Subscriber forwarding alerts into a bounded channel.
///
/// A full channel drops the alert for this receiver and counts as a
/// subscriber failure; a dropped receiver closes the subscription.
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    sender: mpsc::Sender<Alert>,
}

impl ChannelSubscriber {
    /// Create a subscriber and the receiving end of its channel.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<Alert>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl AlertSubscriber for ChannelSubscriber {
    fn on_alert(&self, alert: &Alert) -> anyhow::Result<()> {
        match self.sender.try_send(alert.clone()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => anyhow::bail!("alert channel is full"),
            Err(mpsc::error::TrySendError::Closed(_)) => anyhow::bail!("alert channel is closed"),
        }
    }

    fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
