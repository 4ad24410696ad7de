//! Operation Performance Monitor
//!
//! This crate instruments timed operations inside an application:
//! - Timers that bracket an operation and record its duration per label
//! - Bounded per-label retention with FIFO eviction
//! - Nearest-rank percentiles, standard deviation and throughput on demand
//! - Per-label thresholds with windowed slow-operation alerts and subscribers
//! - Recommendations and point-in-time reports
//!
//! All state lives in an explicitly constructed [`PerformanceMonitor`]; a
//! process-wide default is available through [`global_monitor`].
//!
//! # Feature Flags
//!
//! - `process-memory` (default): read the process resident set size through `sysinfo`
//!
//! # Example
//!
//! ```rust
//! use perf_monitor::{Metadata, PerformanceMonitor};
//!
//! let monitor = PerformanceMonitor::new();
//! monitor.set_threshold("identify_pest", 1500.0);
//! monitor.on_alert(|alert: &perf_monitor::Alert| -> anyhow::Result<()> {
//!     eprintln!("{alert}");
//!     Ok(())
//! });
//!
//! let timer = monitor.start_timer("identify_pest", Some(Metadata::new()));
//! // ... call out to the identification service ...
//! timer.finish();
//!
//! let report = monitor.generate_report();
//! assert_eq!(report.summary["identify_pest"].count, 1);
//! ```

mod alerts;
mod clock;
mod config;
mod error;
mod measurement;
mod memory;
mod monitor;
mod recommend;
mod report;
mod sink;
mod stats;
mod store;
mod threshold;
mod timing;

pub use alerts::{notify, Alert, AlertKind, AlertLog, AlertSubscriber, ChannelSubscriber, SubscriberList, SubscriptionId, DEFAULT_ALERT_WINDOW_MINUTES};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use measurement::{current_platform, ClientKind, Measurement, Metadata};
pub use memory::{memory_delta, FixedMemoryProbe, MemoryProbe, NoMemoryProbe, ProcessMemoryProbe};
pub use monitor::{global_monitor, reset_global_monitor, set_global_monitor, MonitorBuilder, PerformanceMonitor};
pub use recommend::{synthesize, Recommendation};
pub use report::Report;
pub use sink::{DiagnosticSink, NullSink, TracingSink};
pub use stats::{all_stats, label_stats, slow_operations, Stats, THROUGHPUT_WINDOW_MS};
pub use store::{MetricStore, DEFAULT_MAX_ENTRIES};
pub use threshold::{ThresholdRegistry, DEFAULT_THRESHOLD_MS};
pub use timing::{OperationTimer, ScopedTimer};
