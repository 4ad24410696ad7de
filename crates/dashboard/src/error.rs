//! Error types for dashboard assembly.

use perf_monitor::MonitorError;
use thiserror::Error;

/// Errors that can occur while building a dashboard.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// A collaborator could not provide its snapshot
    #[error("Source error: {0}")]
    Source(String),

    /// Failed to serialize the payload
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The monitor could not be configured
    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),
}

/// Result type for dashboard operations.
pub type DashboardResult<T> = Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DashboardError::Source("cache unreachable".to_string());
        assert_eq!(err.to_string(), "Source error: cache unreachable");
    }

    #[test]
    fn test_monitor_error_converts() {
        let err: DashboardError = MonitorError::InvalidConfig("bad".to_string()).into();
        assert!(matches!(err, DashboardError::Monitor(_)));
    }
}
