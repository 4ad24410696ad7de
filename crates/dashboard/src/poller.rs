//! Periodic report generation

use perf_monitor::{PerformanceMonitor, Report};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shortest interval the poller accepts.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Regenerates a report on a fixed interval and publishes the latest one.
///
/// The first report is published immediately. Receivers obtained through
/// [`ReportPoller::subscribe`] see only the most recent report.
///
/// Must be created inside a tokio runtime.
pub struct ReportPoller {
    handle: JoinHandle<()>,
    receiver: watch::Receiver<Option<Report>>,
    interval: Duration,
}

impl ReportPoller {
    /// Start polling `monitor` every `interval`.
    pub fn spawn(monitor: PerformanceMonitor, interval: Duration) -> Self {
        let interval = interval.max(MIN_POLL_INTERVAL);
        let (sender, receiver) = watch::channel(None);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let report = monitor.generate_report();
                tracing::trace!(
                    target: "dashboard::poller",
                    labels = report.summary.len(),
                    generated_at = report.generated_at,
                    "Report published"
                );
                if sender.send(Some(report)).is_err() {
                    break;
                }
            }
        });

        Self {
            handle,
            receiver,
            interval,
        }
    }

    /// A receiver that observes every published report.
    pub fn subscribe(&self) -> watch::Receiver<Option<Report>> {
        self.receiver.clone()
    }

    /// Most recently published report.
    pub fn latest(&self) -> Option<Report> {
        self.receiver.borrow().clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop polling.
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for ReportPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
