//! Table Sink - append-only, versioned table storage
//!
//! Events are appended to a table addressed by a slash separated path
//! `[root_prefix/]namespace/table`. Every append creates a new version; an
//! existing version is never overwritten.
//!
//! # Adapters
//!
//! | Store | Purpose |
//! |-------|---------|
//! | [`DiskTableStore`] | One commit file per version under a base directory |
//! | [`MemoryTableStore`] | In-process, with failure injection for tests |
//!
//! [`TableWriter`] wraps a store with the write timeout, root prefix and
//! optional read-back verification.

mod disk;
mod memory;
mod writer;

use std::borrow::Cow;
use std::fmt;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

pub use disk::DiskTableStore;
pub use memory::MemoryTableStore;
pub use writer::{TableWriter, WriteReceipt};

/// Namespace used when an event carries no namespace field
pub const DEFAULT_NAMESPACE: &str = "rtdl_default_db";

/// Table used when an event carries no table field
pub const DEFAULT_TABLE: &str = "rtdl_default_table";

/// Logical storage destination of an event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Destination {
    /// Dataset the table lives in
    pub namespace: String,
    /// Table name
    pub table: String,
}

impl Destination {
    /// Create a destination
    pub fn new(namespace: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            table: table.into(),
        }
    }

    /// Store path of this destination under an optional root prefix
    ///
    /// Namespace and table are each kept to one path segment, so separators
    /// inside them are replaced with `_`. Only the root prefix may span
    /// several segments.
    ///
    /// ```
    /// use rtdl_sinks::table::Destination;
    ///
    /// let dest = Destination::new("proj", "orders");
    /// assert_eq!(dest.path(None), "proj/orders");
    /// assert_eq!(dest.path(Some("lake")), "lake/proj/orders");
    /// assert_eq!(Destination::new("a/b", "c").path(None), "a_b/c");
    /// ```
    pub fn path(&self, root_prefix: Option<&str>) -> String {
        let namespace = single_segment(&self.namespace);
        let table = single_segment(&self.table);
        match root_prefix {
            Some(root) => format!("{root}/{namespace}/{table}"),
            None => format!("{namespace}/{table}"),
        }
    }
}

fn single_segment(name: &str) -> Cow<'_, str> {
    if name.contains(['/', '\\']) {
        Cow::Owned(name.replace(['/', '\\'], "_"))
    } else {
        Cow::Borrowed(name)
    }
}

impl Default for Destination {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE, DEFAULT_TABLE)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.table)
    }
}

/// Result type for table operations
pub type Result<T> = std::result::Result<T, WriteError>;

/// Table write failures
///
/// All of these are non-fatal for an invocation: the caller logs them and
/// carries on with dispatch.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Filesystem or transport failure
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Append did not finish within the write timeout
    #[error("write to {path} timed out after {timeout:?}")]
    Timeout { path: String, timeout: Duration },

    /// Kept losing the race for the next version
    #[error("could not claim a new version of {path} after {attempts} attempts")]
    Conflict { path: String, attempts: usize },

    /// Read-back after the write did not show the new record
    #[error("verification of {path} failed: {before} records before write, {after} after")]
    Verify {
        path: String,
        before: usize,
        after: usize,
    },

    /// Store refused the operation
    #[error("table store unavailable for {path}: {message}")]
    Unavailable { path: String, message: String },
}

impl WriteError {
    /// Create an Io error
    #[inline]
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an Unavailable error
    #[inline]
    pub fn unavailable(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable kind, for reports and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Timeout { .. } => "timeout",
            Self::Conflict { .. } => "conflict",
            Self::Verify { .. } => "verify",
            Self::Unavailable { .. } => "unavailable",
        }
    }
}

/// Append-only store addressed by path
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Append one record; returns the version it was committed as
    ///
    /// The append is atomic: on error nothing was committed.
    async fn append(&self, path: &str, payload: Bytes) -> Result<u64>;

    /// All records at `path` in version order; empty if the table does not exist
    async fn read(&self, path: &str) -> Result<Vec<Bytes>>;

    /// Number of records at `path`
    async fn count(&self, path: &str) -> Result<usize> {
        Ok(self.read(path).await?.len())
    }

    /// Store kind, for logs
    fn kind(&self) -> &'static str;
}

#[cfg(test)]
#[path = "table_test.rs"]
mod table_test;
