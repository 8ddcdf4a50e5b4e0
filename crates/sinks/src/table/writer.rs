//! Table writer
//!
//! Wraps a [`TableStore`] with the write policy: root prefix, deadline and
//! optional read-back verification.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use rtdl_config::{StorageConfig, StorageKind};
use serde::Serialize;
use tokio::time::timeout;

use super::{Destination, DiskTableStore, MemoryTableStore, Result, TableStore, WriteError};
use crate::common::SinkMetrics;

/// Proof of a committed append
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteReceipt {
    /// Store path written to
    pub path: String,
    /// Version the record was committed as
    pub version: u64,
    /// Payload size
    pub bytes: usize,
    /// Whether the write was read back and confirmed
    pub verified: bool,
    /// When the append returned
    pub committed_at: DateTime<Utc>,
}

/// Appends events to their destination tables
pub struct TableWriter {
    store: Arc<dyn TableStore>,
    root_prefix: Option<String>,
    write_timeout: Duration,
    verify: bool,
    metrics: Arc<SinkMetrics>,
}

impl std::fmt::Debug for TableWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableWriter")
            .field("store", &self.store.kind())
            .field("root_prefix", &self.root_prefix)
            .field("write_timeout", &self.write_timeout)
            .field("verify", &self.verify)
            .finish()
    }
}

impl TableWriter {
    /// Create a writer with a 10s deadline, no root prefix and no verification
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            store,
            root_prefix: None,
            write_timeout: Duration::from_secs(10),
            verify: false,
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    /// Create a writer, and its store, from the `[storage]` section
    pub fn from_config(config: &StorageConfig) -> Self {
        let store: Arc<dyn TableStore> = match config.kind {
            StorageKind::Disk => Arc::new(DiskTableStore::new(config.path.clone())),
            StorageKind::Memory => Arc::new(MemoryTableStore::new()),
        };
        Self::new(store)
            .with_root_prefix(config.root_prefix())
            .with_write_timeout(config.write_timeout)
            .with_verify(config.verify_writes)
    }

    /// Set the root prefix; blank or slash-only values mean none
    #[must_use]
    pub fn with_root_prefix(mut self, root_prefix: Option<&str>) -> Self {
        self.root_prefix = root_prefix
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        self
    }

    /// Set the write deadline
    #[must_use]
    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    /// Enable or disable read-back verification
    #[must_use]
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Underlying store
    #[inline]
    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    /// Write counters
    #[inline]
    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Store path for a destination
    #[inline]
    pub fn path_for(&self, destination: &Destination) -> String {
        destination.path(self.root_prefix.as_deref())
    }

    /// Append one record to `destination`
    ///
    /// The whole operation, including verification, is bounded by the write
    /// timeout. A timed out append may or may not have been committed.
    ///
    /// # Errors
    ///
    /// Returns a [`WriteError`] on any failure; none of them are fatal to the caller.
    pub async fn append(&self, destination: &Destination, payload: Bytes) -> Result<WriteReceipt> {
        let path = self.path_for(destination);
        self.metrics.record_received();

        let result = match timeout(self.write_timeout, self.append_inner(&path, payload)).await {
            Ok(result) => result,
            Err(_) => {
                self.metrics.record_timeout();
                return Err(WriteError::Timeout {
                    path,
                    timeout: self.write_timeout,
                });
            }
        };

        match &result {
            Ok(receipt) => {
                self.metrics.record_written(receipt.bytes as u64);
                tracing::debug!(
                    path = %receipt.path,
                    version = receipt.version,
                    bytes = receipt.bytes,
                    verified = receipt.verified,
                    "record appended"
                );
            }
            Err(_) => self.metrics.record_error(),
        }
        result
    }

    async fn append_inner(&self, path: &str, payload: Bytes) -> Result<WriteReceipt> {
        let bytes = payload.len();
        let before = if self.verify {
            Some(self.store.count(path).await?)
        } else {
            None
        };

        let version = self.store.append(path, payload).await?;
        let committed_at = Utc::now();

        if let Some(before) = before {
            let after = self.store.count(path).await?;
            if after <= before {
                return Err(WriteError::Verify {
                    path: path.to_string(),
                    before,
                    after,
                });
            }
        }

        Ok(WriteReceipt {
            path: path.to_string(),
            version,
            bytes,
            verified: before.is_some(),
            committed_at,
        })
    }
}
