//! Stage metrics
//!
//! Atomic counters for the stage function.
//! All operations use relaxed ordering.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Metrics for the stage function
///
/// Values may be slightly stale when read from another thread.
#[derive(Debug, Default)]
pub struct StageMetrics {
    /// Invocations received
    events_received: AtomicU64,

    /// Invocations rejected because the payload was not JSON
    parse_errors: AtomicU64,

    /// Control signals handled
    control_signals: AtomicU64,

    /// Events whose PII was masked
    events_masked: AtomicU64,

    /// Table appends that committed
    writes_ok: AtomicU64,

    /// Table appends that failed or timed out
    writes_failed: AtomicU64,

    /// Events handed to the next stage
    forwards_ok: AtomicU64,

    /// Sends that failed, timed out or had no endpoint
    forwards_failed: AtomicU64,

    /// Events that ended at this stage
    terminal: AtomicU64,

    /// Matched chains that did not contain this stage
    integrity_faults: AtomicU64,
}

impl StageMetrics {
    /// Create new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            events_received: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
            control_signals: AtomicU64::new(0),
            events_masked: AtomicU64::new(0),
            writes_ok: AtomicU64::new(0),
            writes_failed: AtomicU64::new(0),
            forwards_ok: AtomicU64::new(0),
            forwards_failed: AtomicU64::new(0),
            terminal: AtomicU64::new(0),
            integrity_faults: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_control_signal(&self) {
        self.control_signals.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_masked(&self) {
        self.events_masked.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of a table append
    #[inline]
    pub fn record_write(&self, ok: bool) {
        let counter = if ok { &self.writes_ok } else { &self.writes_failed };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_forwarded(&self) {
        self.forwards_ok.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_forward_failed(&self) {
        self.forwards_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_terminal(&self) {
        self.terminal.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_integrity_fault(&self) {
        self.integrity_faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time copy of all counters
    pub fn snapshot(&self) -> StageMetricsSnapshot {
        StageMetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            control_signals: self.control_signals.load(Ordering::Relaxed),
            events_masked: self.events_masked.load(Ordering::Relaxed),
            writes_ok: self.writes_ok.load(Ordering::Relaxed),
            writes_failed: self.writes_failed.load(Ordering::Relaxed),
            forwards_ok: self.forwards_ok.load(Ordering::Relaxed),
            forwards_failed: self.forwards_failed.load(Ordering::Relaxed),
            terminal: self.terminal.load(Ordering::Relaxed),
            integrity_faults: self.integrity_faults.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of [`StageMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageMetricsSnapshot {
    pub events_received: u64,
    pub parse_errors: u64,
    pub control_signals: u64,
    pub events_masked: u64,
    pub writes_ok: u64,
    pub writes_failed: u64,
    pub forwards_ok: u64,
    pub forwards_failed: u64,
    pub terminal: u64,
    pub integrity_faults: u64,
}
