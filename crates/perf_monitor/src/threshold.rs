//! Per-label alert thresholds

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Threshold applied to labels without an explicit value, in milliseconds.
pub const DEFAULT_THRESHOLD_MS: f64 = 1000.0;

/// Whether `ms` can be used as a threshold: finite and positive.
pub fn is_valid_threshold(ms: f64) -> bool {
    ms.is_finite() && ms > 0.0
}

/// Alert threshold configuration.
///
/// Each label may carry its own threshold; every other label resolves to
/// the registry default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdRegistry {
    /// Threshold for labels without an explicit entry
    default_ms: f64,
    /// Explicit per-label thresholds
    overrides: HashMap<String, f64>,
}

impl ThresholdRegistry {
    /// Create a registry with the default 1000ms fallback.
    pub fn new() -> Self {
        Self::with_default(DEFAULT_THRESHOLD_MS)
    }

    /// Create a registry with a custom fallback threshold.
    pub fn with_default(default_ms: f64) -> Self {
        Self {
            default_ms,
            overrides: HashMap::new(),
        }
    }

    /// Set (or replace) the threshold for a label.
    pub fn set(&mut self, label: impl Into<String>, ms: f64) {
        self.overrides.insert(label.into(), ms);
    }

    /// Remove a label's explicit threshold. Returns the removed value.
    pub fn remove(&mut self, label: &str) -> Option<f64> {
        self.overrides.remove(label)
    }

    /// Resolve the threshold for a label.
    pub fn resolve(&self, label: &str) -> f64 {
        self.overrides.get(label).copied().unwrap_or(self.default_ms)
    }

    /// Whether `duration_ms` exceeds the label's threshold.
    pub fn is_exceeded(&self, label: &str, duration_ms: f64) -> bool {
        duration_ms > self.resolve(label)
    }

    /// The fallback threshold.
    pub fn default_ms(&self) -> f64 {
        self.default_ms
    }

    /// Explicitly configured thresholds.
    pub fn overrides(&self) -> &HashMap<String, f64> {
        &self.overrides
    }
}

impl Default for ThresholdRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_resolution() {
        let registry = ThresholdRegistry::new();
        assert_eq!(registry.resolve("anything"), 1000.0);
    }

    #[test]
    fn test_set_overrides_and_remove_restores_default() {
        let mut registry = ThresholdRegistry::new();
        registry.set("slow_op", 200.0);
        assert_eq!(registry.resolve("slow_op"), 200.0);

        registry.set("slow_op", 300.0);
        assert_eq!(registry.resolve("slow_op"), 300.0);

        assert_eq!(registry.remove("slow_op"), Some(300.0));
        assert_eq!(registry.resolve("slow_op"), 1000.0);
    }

    #[test]
    fn test_is_exceeded_is_strict() {
        let mut registry = ThresholdRegistry::with_default(500.0);
        registry.set("fetch", 100.0);

        assert!(!registry.is_exceeded("fetch", 100.0));
        assert!(registry.is_exceeded("fetch", 100.5));
        assert!(!registry.is_exceeded("other", 500.0));
        assert!(registry.is_exceeded("other", 501.0));
    }

    #[test]
    fn test_valid_threshold() {
        assert!(is_valid_threshold(0.5));
        assert!(!is_valid_threshold(0.0));
        assert!(!is_valid_threshold(-10.0));
        assert!(!is_valid_threshold(f64::NAN));
        assert!(!is_valid_threshold(f64::INFINITY));
    }
}
