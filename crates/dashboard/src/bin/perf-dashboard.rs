//! Runs a short simulated workload through the monitor and prints the
//! resulting dashboard as JSON.
//!
//! Usage: `perf-dashboard [config.json]`

use dashboard::{CacheCounters, Dashboard, DashboardResult, ServiceHealth, ServiceHealthSource};
use perf_monitor::{Alert, ClientKind, Metadata, MonitorConfig, PerformanceMonitor};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Stand-in for the identification service's health endpoint.
struct SimulatedService {
    model_loaded: bool,
}

impl ServiceHealthSource for SimulatedService {
    async fn service_health(&self) -> DashboardResult<ServiceHealth> {
        let started = Instant::now();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let elapsed = started.elapsed().as_secs_f64() * 1000.0;

        Ok(if self.model_loaded {
            ServiceHealth::up("healthy", elapsed)
        } else {
            ServiceHealth::down("model not loaded", elapsed)
        })
    }
}

async fn run_workload(monitor: &PerformanceMonitor, cache: &CacheCounters) {
    for round in 0..5u64 {
        let timer = monitor.start_timer("lookup_crop", None);
        tokio::time::sleep(Duration::from_millis(10 + round * 2)).await;
        if round % 2 == 0 {
            cache.record_hit();
        } else {
            cache.record_miss();
        }
        timer.finish();
    }
    cache.set_size(3, 3 * 2048);

    let timer = monitor.start_timer(
        "identify_pest",
        Some(Metadata::new().with_client(ClientKind::Mobile)),
    );
    tokio::time::sleep(Duration::from_millis(60)).await;
    timer.finish();

    // Durations reported by a remote worker.
    for duration_ms in [850.0, 1_250.0, 3_400.0] {
        monitor.record(
            "generate_advice",
            duration_ms,
            Metadata::new().with_client(ClientKind::Mobile),
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            tracing::info!("Loading monitor config from {:?}", path);
            MonitorConfig::load_sync(&path)?
        }
        None => MonitorConfig::default(),
    };

    let monitor = PerformanceMonitor::with_config(config)?;
    monitor.set_threshold("identify_pest", 50.0);
    monitor.on_alert(|alert: &Alert| -> anyhow::Result<()> {
        tracing::warn!("{alert}");
        Ok(())
    });

    let cache = Arc::new(CacheCounters::new());
    tracing::info!("Running simulated workload");
    run_workload(&monitor, &cache).await;

    let dashboard = Dashboard::new(monitor)
        .with_cache_source(cache)
        .with_health_source(SimulatedService { model_loaded: true });
    let payload = dashboard.snapshot().await;

    println!("{}", payload.to_json()?);
    Ok(())
}
