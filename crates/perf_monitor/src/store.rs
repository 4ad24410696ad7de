//! Bounded per-label measurement storage

use crate::measurement::Measurement;
use std::collections::{BTreeMap, VecDeque};

/// Default number of measurements retained per label.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Per-label series of measurements, oldest first.
///
/// Each series holds at most `max_entries` measurements; recording past
/// the cap drops the oldest entries. Labels iterate in lexical order.
#[derive(Debug, Clone)]
pub struct MetricStore {
    series: BTreeMap<String, VecDeque<Measurement>>,
    max_entries: usize,
}

impl MetricStore {
    /// Create a store with the default capacity.
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    /// Create a store keeping at most `max_entries` measurements per label.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            series: BTreeMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Capacity per label.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Append a measurement to its label's series.
    ///
    /// Returns the number of entries evicted to keep the series within capacity.
    pub fn push(&mut self, measurement: Measurement) -> usize {
        let max_entries = self.max_entries;
        let series = self
            .series
            .entry(measurement.label().to_string())
            .or_insert_with(VecDeque::new);

        series.push_back(measurement);

        let mut evicted = 0;
        while series.len() > max_entries {
            series.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Measurements recorded for `label`, oldest first.
    pub fn series(&self, label: &str) -> Option<&VecDeque<Measurement>> {
        self.series.get(label).filter(|s| !s.is_empty())
    }

    /// Labels with at least one measurement.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.series
            .iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|(label, _)| label.as_str())
    }

    /// Iterate over every non-empty series in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VecDeque<Measurement>)> {
        self.series
            .iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|(label, s)| (label.as_str(), s))
    }

    /// Number of measurements held for `label`.
    pub fn len(&self, label: &str) -> usize {
        self.series.get(label).map_or(0, VecDeque::len)
    }

    /// Total measurements across all labels.
    pub fn total(&self) -> usize {
        self.series.values().map(VecDeque::len).sum()
    }

    /// Whether no measurements are held.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Remove one label's series. Returns whether it existed.
    pub fn remove(&mut self, label: &str) -> bool {
        self.series.remove(label).is_some()
    }

    /// Remove every series.
    pub fn clear(&mut self) {
        self.series.clear();
    }
}

impl Default for MetricStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(label: &str, duration_ms: f64) -> Measurement {
        Measurement::new(label, duration_ms, 0)
    }

    #[test]
    fn test_push_creates_series_lazily() {
        let mut store = MetricStore::new();
        assert!(store.series("load").is_none());

        store.push(m("load", 5.0));
        store.push(m("load", 10.0));
        store.push(m("save", 3.0));

        assert_eq!(store.len("load"), 2);
        assert_eq!(store.len("save"), 1);
        assert_eq!(store.total(), 3);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut store = MetricStore::with_max_entries(3);

        let mut evicted = 0;
        for i in 0..5 {
            evicted += store.push(m("layout", i as f64));
        }

        let durations: Vec<f64> = store
            .series("layout")
            .unwrap()
            .iter()
            .map(Measurement::duration_ms)
            .collect();
        assert_eq!(durations, vec![2.0, 3.0, 4.0]);
        assert_eq!(evicted, 2);
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut store = MetricStore::with_max_entries(0);
        store.push(m("a", 1.0));
        store.push(m("a", 2.0));
        assert_eq!(store.len("a"), 1);
    }

    #[test]
    fn test_labels_in_lexical_order() {
        let mut store = MetricStore::new();
        store.push(m("zeta", 1.0));
        store.push(m("alpha", 1.0));
        store.push(m("mid", 1.0));

        let labels: Vec<&str> = store.labels().collect();
        assert_eq!(labels, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut store = MetricStore::new();
        store.push(m("a", 1.0));
        store.push(m("b", 2.0));

        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        assert_eq!(store.len("b"), 1);

        store.clear();
        assert!(store.is_empty());
    }
}
