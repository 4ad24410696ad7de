//! Recorded timing events and their metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Kind of client an operation was executed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    /// Desktop browser or native desktop application
    Desktop,
    /// Phone or tablet client
    Mobile,
    /// Server-side or background work with no interactive client
    Server,
    /// Client could not be determined
    #[default]
    Unknown,
}

/// Typed extension data attached to a measurement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Change in process memory across the timed operation, in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_delta_bytes: Option<i64>,
    /// Client the operation was executed for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientKind>,
    /// Execution environment tag (e.g., "linux", "macos")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Free-form fields for callers
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, Value>,
}

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the memory delta in bytes.
    pub fn with_memory_delta(mut self, bytes: i64) -> Self {
        self.memory_delta_bytes = Some(bytes);
        self
    }

    /// Set the client kind.
    pub fn with_client(mut self, client: ClientKind) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the platform tag.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Add a free-form field.
    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Whether the operation ran for a mobile client.
    pub fn is_mobile(&self) -> bool {
        self.client == Some(ClientKind::Mobile)
    }

    /// Fill fields left empty here from `derived`.
    ///
    /// Fields already set on `self` win; extra keys are only added when absent.
    pub fn merge_missing(mut self, derived: Metadata) -> Self {
        if self.memory_delta_bytes.is_none() {
            self.memory_delta_bytes = derived.memory_delta_bytes;
        }
        if self.client.is_none() {
            self.client = derived.client;
        }
        if self.platform.is_none() {
            self.platform = derived.platform;
        }
        for (key, value) in derived.extra {
            self.extra.entry(key).or_insert(value);
        }
        self
    }
}

/// One recorded timing event.
///
/// Fields are private so a measurement cannot change after it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    label: String,
    duration_ms: f64,
    timestamp: i64,
    #[serde(default)]
    metadata: Metadata,
}

impl Measurement {
    /// Create a measurement.
    ///
    /// Negative and NaN durations are clamped to zero.
    pub fn new(label: impl Into<String>, duration_ms: f64, timestamp: i64) -> Self {
        Self {
            label: label.into(),
            duration_ms: duration_ms.max(0.0),
            timestamp,
            metadata: Metadata::default(),
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Operation label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Duration in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Epoch milliseconds at which the measurement was recorded.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Attached metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// Platform tag of the running host.
pub fn current_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else if cfg!(target_os = "android") {
        "android"
    } else if cfg!(target_os = "ios") {
        "ios"
    } else {
        "unknown"
    }
}
