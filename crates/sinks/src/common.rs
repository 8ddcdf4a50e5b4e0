//! Common types for sinks
//!
//! Shared counters for table writers and producers.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Metrics shared by all sink types
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Total records handed to the sink
    pub records_received: AtomicU64,

    /// Records successfully written or acknowledged
    pub records_written: AtomicU64,

    /// Payload bytes written or sent
    pub bytes_written: AtomicU64,

    /// Failed writes or sends (including timeouts)
    pub write_errors: AtomicU64,

    /// Operations that hit their deadline
    pub timeouts: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            records_received: AtomicU64::new(0),
            records_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
        }
    }

    /// Record a record handed to the sink
    #[inline]
    pub fn record_received(&self) {
        self.records_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful write
    #[inline]
    pub fn record_written(&self, bytes: u64) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a failed write
    #[inline]
    pub fn record_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a timed out write; also counts as an error
    #[inline]
    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        self.record_error();
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_received: self.records_received.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_received: u64,
    pub records_written: u64,
    pub bytes_written: u64,
    pub write_errors: u64,
    pub timeouts: u64,
}
