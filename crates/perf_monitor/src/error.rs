//! Error types for the performance monitor.

use thiserror::Error;

/// Errors raised while configuring the monitor.
///
/// Recording and querying never fail; only configuration loading and
/// validation surface errors to the caller.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Failed to read or write a configuration file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to (de)serialize configuration
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MonitorError::InvalidConfig("maxEntries must be at least 1".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: maxEntries must be at least 1"
        );
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err: std::result::Result<(), serde_json::Error> =
            serde_json::from_str::<()>("not json");
        let err: MonitorError = json_err.unwrap_err().into();
        assert!(matches!(err, MonitorError::Serialization(_)));
    }
}
