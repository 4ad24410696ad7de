//! Integration tests for the performance monitor
//!
//! These exercise the public surface the way an application does: timing
//! operations, reacting to alerts and pulling reports.

use perf_monitor::{
    Alert, ClientKind, DiagnosticSink, ManualClock, Measurement, Metadata, MonitorConfig,
    NoMemoryProbe, NullSink, PerformanceMonitor, Recommendation,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

const START: i64 = 1_700_000_000_000;
const MINUTE: i64 = 60_000;

/// Test harness with a controllable clock
struct Harness {
    clock: ManualClock,
    monitor: PerformanceMonitor,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(MonitorConfig::default())
    }

    fn with_config(config: MonitorConfig) -> Self {
        let clock = ManualClock::new(START);
        let monitor = PerformanceMonitor::builder()
            .config(config)
            .clock(clock.clone())
            .memory_probe(NoMemoryProbe)
            .sink(NullSink)
            .build()
            .unwrap();
        Self { clock, monitor }
    }

    fn record(&self, label: &str, duration_ms: f64) -> Measurement {
        self.monitor.record(label, duration_ms, Metadata::new())
    }
}

#[test]
fn test_fifo_eviction_by_content() {
    let h = Harness::new();
    for i in 0..1005 {
        h.record("bulk", i as f64);
    }

    let kept = h.monitor.measurements("bulk");
    assert_eq!(kept.len(), 1000);
    assert_eq!(kept.first().unwrap().duration_ms(), 5.0);
    assert_eq!(kept.last().unwrap().duration_ms(), 1004.0);
    assert_eq!(h.monitor.get_stats("bulk").unwrap().count, 1000);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_count_is_min_of_records_and_capacity(n in 0usize..60, cap in 1usize..20) {
        let h = Harness::with_config(MonitorConfig::new().with_max_entries(cap));
        for i in 0..n {
            h.record("p", i as f64);
        }

        let kept = h.monitor.measurements("p");
        prop_assert_eq!(kept.len(), n.min(cap));
        let expected: Vec<f64> = (n.saturating_sub(cap)..n).map(|i| i as f64).collect();
        let actual: Vec<f64> = kept.iter().map(Measurement::duration_ms).collect();
        prop_assert_eq!(actual, expected);
        prop_assert_eq!(h.monitor.get_stats("p").is_none(), n == 0);
    }
}

#[test]
fn test_stats_absent_only_without_measurements() {
    let h = Harness::new();
    assert!(h.monitor.get_stats("never").is_none());

    h.record("once", 10.0);
    assert!(h.monitor.get_stats("once").is_some());

    h.monitor.clear_metrics(Some("once"));
    assert!(h.monitor.get_stats("once").is_none());
}

#[test]
fn test_average_and_standard_deviation() {
    let h = Harness::new();
    for d in [100.0, 200.0, 300.0] {
        h.record("calc", d);
    }

    let stats = h.monitor.get_stats("calc").unwrap();
    assert_eq!(stats.average, 200.0);
    assert!((stats.standard_deviation - 81.65).abs() < 0.01);
}

#[test]
fn test_ten_samples_percentiles_select_maximum() {
    let h = Harness::new();
    for d in [5.0, 1.0, 9.0, 3.0, 7.0, 2.0, 10.0, 8.0, 4.0, 6.0] {
        h.record("ten", d);
    }

    let stats = h.monitor.get_stats("ten").unwrap();
    assert_eq!(stats.p95, 10.0);
    assert_eq!(stats.p99, 10.0);
    assert_eq!(stats.latest, 6.0);
}

#[test]
fn test_throughput_over_trailing_minute() {
    let h = Harness::new();
    for _ in 0..5 {
        h.record("tick", 1.0);
        h.clock.advance_ms(1_000);
    }

    let stats = h.monitor.get_stats("tick").unwrap();
    assert!((stats.throughput - 5.0 / 60.0).abs() < 1e-9);

    h.clock.advance_minutes(2);
    assert_eq!(h.monitor.get_stats("tick").unwrap().throughput, 0.0);
}

#[test]
fn test_default_threshold_alert() {
    let h = Harness::new();
    h.record("predict", 1500.0);

    let alerts = h.monitor.get_recent_alerts(None);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].threshold, 1000.0);
    assert_eq!(alerts[0].value, 1500.0);
    assert_eq!(alerts[0].label, "predict");
}

#[test]
fn test_custom_threshold_alert() {
    let h = Harness::new();
    h.monitor.set_threshold("slow_op", 200.0);
    h.record("slow_op", 150.0);
    h.record("slow_op", 250.0);

    let alerts = h.monitor.get_recent_alerts(None);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].value, 250.0);
    assert_eq!(alerts[0].threshold, 200.0);
}

#[test]
fn test_alerts_pruned_on_next_write_only() {
    let h = Harness::new();
    h.record("a", 2000.0);

    h.clock.advance_minutes(61);
    // Retention pruning happens when the next alert is recorded.
    assert!(h.monitor.get_recent_alerts(Some(120)).len() == 1);

    h.record("b", 2000.0);
    let alerts = h.monitor.get_recent_alerts(Some(120));
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].label, "b");
}

#[test]
fn test_recent_alerts_narrow_window_keeps_retention() {
    let h = Harness::new();
    h.record("early", 2000.0);
    h.clock.advance_ms(30 * MINUTE);
    h.record("late", 2000.0);

    assert_eq!(h.monitor.get_recent_alerts(Some(10)).len(), 1);
    assert_eq!(h.monitor.get_recent_alerts(None).len(), 2);
}

#[test]
fn test_failing_subscriber_does_not_block_others() {
    let h = Harness::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let first_calls = Arc::new(AtomicUsize::new(0));

    let calls = Arc::clone(&first_calls);
    h.monitor.on_alert(move |_: &Alert| -> anyhow::Result<()> {
        calls.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("subscriber failure")
    });
    let sink = Arc::clone(&seen);
    h.monitor.on_alert(move |alert: &Alert| -> anyhow::Result<()> {
        sink.lock().unwrap().push(alert.value);
        Ok(())
    });

    h.record("x", 1100.0);
    h.record("x", 1200.0);

    assert_eq!(first_calls.load(Ordering::SeqCst), 2);
    assert_eq!(*seen.lock().unwrap(), vec![1100.0, 1200.0]);
}

#[test]
fn test_panicking_subscriber_is_contained() {
    let h = Harness::new();
    let delivered = Arc::new(AtomicUsize::new(0));

    h.monitor.on_alert(|_: &Alert| -> anyhow::Result<()> { panic!("bad subscriber") });
    let counter = Arc::clone(&delivered);
    h.monitor.on_alert(move |_: &Alert| -> anyhow::Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let timer = h.monitor.start_timer("panics", None);
    h.monitor.set_threshold("panics", 0.001);
    std::thread::sleep(std::time::Duration::from_millis(2));
    timer.finish();

    assert_eq!(delivered.load(Ordering::SeqCst), 1);
    // Recording still works after the panic.
    h.record("after", 5.0);
    assert_eq!(h.monitor.get_stats("after").unwrap().count, 1);
}

#[test]
fn test_subscriber_may_call_back_into_monitor() {
    let h = Harness::new();
    let monitor = h.monitor.clone();
    let observed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&observed);

    h.monitor.on_alert(move |alert: &Alert| -> anyhow::Result<()> {
        let count = monitor.get_stats(&alert.label).map_or(0, |s| s.count);
        counter.store(count, Ordering::SeqCst);
        monitor.record("audit", 1.0, Metadata::new());
        Ok(())
    });

    h.record("reentrant", 5000.0);
    assert_eq!(observed.load(Ordering::SeqCst), 1);
    assert_eq!(h.monitor.get_stats("audit").unwrap().count, 1);
}

#[test]
fn test_remove_subscriber_stops_delivery() {
    let h = Harness::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let id = h.monitor.on_alert(move |_: &Alert| -> anyhow::Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    h.record("x", 2000.0);
    assert!(h.monitor.remove_subscriber(id));
    h.record("x", 2000.0);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_alert_channel_delivery_and_overflow() {
    let h = Harness::new();
    let mut receiver = h.monitor.alert_channel(2);

    for _ in 0..3 {
        h.record("chan", 1500.0);
    }
    assert_eq!(h.monitor.get_stats("chan").unwrap().count, 3);

    assert!(receiver.try_recv().is_ok());
    assert!(receiver.try_recv().is_ok());
    assert!(receiver.try_recv().is_err());

    drop(receiver);
    h.record("chan", 1500.0);
    assert_eq!(h.monitor.subscriber_count(), 0);
}

#[test]
fn test_clear_single_label_keeps_others_and_alerts() {
    let h = Harness::new();
    h.record("a", 1500.0);
    h.record("b", 20.0);

    h.monitor.clear_metrics(Some("a"));
    assert!(h.monitor.get_stats("a").is_none());
    assert!(h.monitor.get_stats("b").is_some());
    assert_eq!(h.monitor.get_recent_alerts(None).len(), 1);

    h.monitor.clear_metrics(None);
    assert!(h.monitor.get_all_stats().is_empty());
    assert!(h.monitor.get_recent_alerts(None).is_empty());
}

#[test]
fn test_slow_operations_default_and_custom_threshold() {
    let h = Harness::new();
    h.record("a", 900.0);
    h.record("b", 1100.0);
    h.record("c", 2500.0);

    let slow: Vec<f64> = h
        .monitor
        .get_slow_operations(None)
        .iter()
        .map(Measurement::duration_ms)
        .collect();
    assert_eq!(slow, vec![2500.0, 1100.0]);
    assert_eq!(h.monitor.get_slow_operations(Some(500.0)).len(), 3);
}

#[test]
fn test_report_recommendations_use_full_slow_set() {
    let h = Harness::new();
    for i in 0..10 {
        h.record("bulk", 5000.0 + i as f64);
    }
    // Entries 11-15 carry the only memory and mobile signals.
    for _ in 0..3 {
        h.monitor.record(
            "upload",
            1200.0,
            Metadata::new().with_memory_delta(20 * 1024 * 1024),
        );
    }
    for _ in 0..2 {
        h.monitor.record(
            "render_results",
            3100.0,
            Metadata::new().with_client(ClientKind::Mobile),
        );
    }

    let report = h.monitor.generate_report();
    assert_eq!(report.slow_operations.len(), 10);
    assert!(report
        .slow_operations
        .iter()
        .all(|m| m.label() == "bulk"));

    let memory = Recommendation::ReduceMemory.to_string();
    let mobile = Recommendation::MobilePerformance.to_string();
    assert!(report.recommendations.contains(&memory), "{:?}", report.recommendations);
    assert!(report.recommendations.contains(&mobile), "{:?}", report.recommendations);
    assert_eq!(report.recent_alerts.len(), 15);
    assert_eq!(report.memory_usage, 0);
}

#[test]
fn test_untagged_slow_operations_get_no_mobile_advice() {
    let h = Harness::new();
    for _ in 0..2 {
        h.record("mobile_view", 3100.0);
    }

    let report = h.monitor.generate_report();
    let mobile = Recommendation::MobilePerformance.to_string();
    assert_eq!(report.slow_operations.len(), 2);
    assert!(!report.recommendations.contains(&mobile));
    assert_eq!(report.recommendations.len(), 1);
}

#[test]
fn test_report_summary_and_label_recommendations() {
    let h = Harness::new();
    for _ in 0..3 {
        h.record("heavy", 2500.0);
    }
    h.record("light", 10.0);

    let report = h.monitor.generate_report();
    assert_eq!(report.summary.len(), 2);
    assert_eq!(report.generated_at, START);
    assert_eq!(
        report.recommendations,
        vec!["Consider optimizing \"heavy\": average duration is 2500ms".to_string()]
    );
}

#[test]
fn test_concurrent_recording() {
    let monitor = PerformanceMonitor::builder()
        .memory_probe(NoMemoryProbe)
        .sink(NullSink)
        .build()
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let monitor = monitor.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    let label = if i % 2 == 0 { "even" } else { "odd" };
                    monitor.record(label, (t * 10 + i) as f64, Metadata::new());
                    let _ = monitor.get_stats(label);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(monitor.get_stats("even").unwrap().count, 800);
    assert_eq!(monitor.get_stats("odd").unwrap().count, 800);
}

/// Sink that queries the monitor it is attached to.
#[derive(Default)]
struct StatsReadingSink {
    monitor: std::sync::OnceLock<PerformanceMonitor>,
    counts: Mutex<Vec<usize>>,
    rejected: Mutex<Vec<(String, f64)>>,
}

impl DiagnosticSink for StatsReadingSink {
    fn measurement_recorded(&self, measurement: &Measurement, _evicted: usize) {
        if let Some(monitor) = self.monitor.get() {
            let count = monitor.get_stats(measurement.label()).map_or(0, |s| s.count);
            self.counts.lock().unwrap().push(count);
        }
    }

    fn threshold_rejected(&self, label: &str, ms: f64) {
        self.rejected.lock().unwrap().push((label.to_string(), ms));
    }
}

fn monitor_with_sink() -> (PerformanceMonitor, Arc<StatsReadingSink>) {
    let sink = Arc::new(StatsReadingSink::default());
    let monitor = PerformanceMonitor::builder()
        .memory_probe(NoMemoryProbe)
        .sink(Arc::clone(&sink))
        .build()
        .unwrap();
    let _ = sink.monitor.set(monitor.clone());
    (monitor, sink)
}

#[test]
fn test_sink_may_call_back_into_monitor() {
    let (monitor, sink) = monitor_with_sink();

    let (done_tx, done_rx) = mpsc::channel();
    let worker = monitor.clone();
    thread::spawn(move || {
        worker.record("op", 5.0, Metadata::new());
        worker.record("op", 6.0, Metadata::new());
        let _ = done_tx.send(());
    });

    done_rx
        .recv_timeout(Duration::from_secs(3))
        .expect("record should return while the sink reads stats");
    assert_eq!(*sink.counts.lock().unwrap(), vec![1, 2]);
}

#[test]
fn test_invalid_thresholds_are_ignored() {
    let (monitor, sink) = monitor_with_sink();
    monitor.set_threshold("predict", 200.0);

    monitor.set_threshold("predict", f64::NAN);
    monitor.set_threshold("predict", -5.0);
    monitor.set_threshold("lookup", 0.0);

    assert_eq!(monitor.threshold("predict"), 200.0);
    assert_eq!(monitor.threshold("lookup"), 1000.0);
    assert_eq!(sink.rejected.lock().unwrap().len(), 3);

    monitor.record("predict", 250.0, Metadata::new());
    assert_eq!(monitor.get_recent_alerts(None).len(), 1);
}

#[test]
fn test_thresholds_snapshot_lists_explicit_entries() {
    let h = Harness::new();
    assert!(h.monitor.thresholds().is_empty());

    h.monitor.set_threshold("predict", 200.0);
    h.monitor.set_threshold("lookup", 50.0);
    let snapshot = h.monitor.thresholds();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot["predict"], 200.0);

    h.monitor.remove_threshold("lookup");
    assert!(!h.monitor.thresholds().contains_key("lookup"));
    // The snapshot is a copy.
    assert_eq!(snapshot.len(), 2);
}

#[test]
fn test_full_clear_keeps_alerts_matched_to_measurements() {
    let monitor = PerformanceMonitor::builder()
        .config(MonitorConfig::new().with_max_entries(100_000))
        .memory_probe(NoMemoryProbe)
        .sink(NullSink)
        .build()
        .unwrap();

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let monitor = monitor.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    monitor.record("slow", 1500.0, Metadata::new());
                }
            })
        })
        .collect();
    for _ in 0..200 {
        monitor.clear_metrics(None);
    }
    for writer in writers {
        writer.join().unwrap();
    }

    // Every recorded measurement raised exactly one alert.
    let measurements = monitor.measurements("slow").len();
    assert_eq!(monitor.get_recent_alerts(None).len(), measurements);
}
