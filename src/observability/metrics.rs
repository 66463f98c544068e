//! Metrics registry for keyquery
//!
//! - Counters only (no gauges, no histograms)
//! - Monotonic increase
//! - Reset only on process start
//! - Thread-safe but lock-minimal

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use serde::Serialize;

/// Metrics registry containing all operational counters
///
/// Counters use Relaxed ordering; values are exact once the writing
/// threads are joined.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Records produced by the packer
    records_packed: AtomicU64,
    /// Payload bytes stored in packed records
    payload_bytes: AtomicU64,
    /// Pack requests rejected
    packs_rejected: AtomicU64,
    /// Predicates compiled into queries
    queries_compiled: AtomicU64,
    /// Predicates or queries rejected
    queries_rejected: AtomicU64,
    /// Ge/Le pairs merged into a range
    ranges_merged: AtomicU64,
    /// Type schemas registered
    schemas_registered: AtomicU64,
}

static GLOBAL: OnceLock<MetricsRegistry> = OnceLock::new();

/// The process-wide metrics registry
pub fn metrics() -> &'static MetricsRegistry {
    GLOBAL.get_or_init(MetricsRegistry::new)
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Packing

    /// Count one packed record and its payload size
    pub fn record_packed(&self, payload_bytes: u64) {
        self.records_packed.fetch_add(1, Ordering::Relaxed);
        self.payload_bytes.fetch_add(payload_bytes, Ordering::Relaxed);
    }

    /// Increment rejected pack requests
    pub fn increment_packs_rejected(&self) {
        self.packs_rejected.fetch_add(1, Ordering::Relaxed);
    }

    // Queries

    /// Increment compiled queries
    pub fn increment_queries_compiled(&self) {
        self.queries_compiled.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment rejected queries
    pub fn increment_queries_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment merged ranges
    pub fn increment_ranges_merged(&self) {
        self.ranges_merged.fetch_add(1, Ordering::Relaxed);
    }

    // Schemas

    /// Increment registered schemas
    pub fn increment_schemas_registered(&self) {
        self.schemas_registered.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_packed: self.records_packed.load(Ordering::Relaxed),
            payload_bytes: self.payload_bytes.load(Ordering::Relaxed),
            packs_rejected: self.packs_rejected.load(Ordering::Relaxed),
            queries_compiled: self.queries_compiled.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            ranges_merged: self.ranges_merged.load(Ordering::Relaxed),
            schemas_registered: self.schemas_registered.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_packed: u64,
    pub payload_bytes: u64,
    pub packs_rejected: u64,
    pub queries_compiled: u64,
    pub queries_rejected: u64,
    pub ranges_merged: u64,
    pub schemas_registered: u64,
}
