//! Operator dashboard for the performance monitor
//!
//! Combines a [`perf_monitor::Report`] with snapshots from collaborators the
//! monitor does not own:
//! - [`CacheStatsSource`]: hit/miss counters of an application cache
//! - [`ServiceHealthSource`]: availability of a backing service
//!
//! [`ReportPoller`] keeps a fresh report available for views that refresh
//! on a timer.

mod dashboard;
mod error;
mod poller;
mod sources;

pub use dashboard::{Dashboard, DashboardPayload, DEFAULT_SOURCE_TIMEOUT};
pub use error::{DashboardError, DashboardResult};
pub use poller::{ReportPoller, MIN_POLL_INTERVAL};
pub use sources::{CacheCounters, CacheSnapshot, CacheStatsSource, NoSource, ServiceHealth, ServiceHealthSource};
