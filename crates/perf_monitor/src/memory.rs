//! Best-effort process memory introspection.
//!
//! The monitor asks a [`MemoryProbe`] for the current memory footprint when
//! a timer starts and stops (to derive a per-operation delta) and when a
//! report is generated. Hosts that cannot report memory simply return
//! `None`, which degrades to "no delta" and a zero usage figure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
#[cfg(feature = "process-memory")]
use std::sync::{Mutex, PoisonError};

/// Source of the current process memory footprint.
pub trait MemoryProbe: Send + Sync {
    /// Current usage in bytes, or `None` when the host cannot report it.
    fn current_usage_bytes(&self) -> Option<u64>;
}

/// Probe that never reports memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMemoryProbe;

impl MemoryProbe for NoMemoryProbe {
    fn current_usage_bytes(&self) -> Option<u64> {
        None
    }
}

/// Probe reading resident set size of the current process.
///
/// Backed by `sysinfo` when the `process-memory` feature is enabled; reports
/// nothing otherwise or on hosts `sysinfo` does not support.
#[derive(Default)]
pub struct ProcessMemoryProbe {
    #[cfg(feature = "process-memory")]
    system: Mutex<sysinfo::System>,
}

impl ProcessMemoryProbe {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    #[cfg(feature = "process-memory")]
    fn current_usage_bytes(&self) -> Option<u64> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        if !system.refresh_process(pid) {
            return None;
        }
        system.process(pid).map(|process| process.memory())
    }

    #[cfg(not(feature = "process-memory"))]
    fn current_usage_bytes(&self) -> Option<u64> {
        None
    }
}

impl std::fmt::Debug for ProcessMemoryProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessMemoryProbe").finish_non_exhaustive()
    }
}

/// Probe returning a settable value.
///
/// Clones share the value, which makes it convenient for simulating memory
/// growth inside tests and demos.
#[derive(Debug, Clone, Default)]
pub struct FixedMemoryProbe {
    bytes: Arc<AtomicU64>,
}

impl FixedMemoryProbe {
    /// Create a probe reporting `bytes`.
    pub fn new(bytes: u64) -> Self {
        Self {
            bytes: Arc::new(AtomicU64::new(bytes)),
        }
    }

    /// Change the reported value.
    pub fn set(&self, bytes: u64) {
        self.bytes.store(bytes, Ordering::SeqCst);
    }

    /// Grow the reported value.
    pub fn grow(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::SeqCst);
    }
}

impl MemoryProbe for FixedMemoryProbe {
    fn current_usage_bytes(&self) -> Option<u64> {
        Some(self.bytes.load(Ordering::SeqCst))
    }
}

/// Signed change between two readings, if both are available.
pub fn memory_delta(start: Option<u64>, end: Option<u64>) -> Option<i64> {
    match (start, end) {
        (Some(start), Some(end)) => Some(end as i64 - start as i64),
        _ => None,
    }
}
