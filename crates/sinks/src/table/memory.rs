//! In-memory table store

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use super::{Result, TableStore, WriteError};

/// Table store kept in process memory
///
/// Counts every append attempt and can be told to fail or stall, so tests
/// can observe exactly what the pipeline asked of it.
#[derive(Debug, Default)]
pub struct MemoryTableStore {
    tables: Mutex<HashMap<String, Vec<Bytes>>>,
    appends: AtomicU64,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl MemoryTableStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following append fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Stall every following append for `delay` before committing
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Number of append calls received, successful or not
    pub fn append_count(&self) -> u64 {
        self.appends.load(Ordering::Relaxed)
    }

    /// Paths that hold at least one record
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.tables.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn append(&self, path: &str, payload: Bytes) -> Result<u64> {
        self.appends.fetch_add(1, Ordering::Relaxed);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::Relaxed) {
            return Err(WriteError::unavailable(path, "injected failure"));
        }

        let mut tables = self.tables.lock();
        let records = tables.entry(path.to_string()).or_default();
        records.push(payload);
        Ok(records.len() as u64)
    }

    async fn read(&self, path: &str) -> Result<Vec<Bytes>> {
        Ok(self.tables.lock().get(path).cloned().unwrap_or_default())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
