//! Table storage configuration
//!
//! Selects the table-store adapter and the write policy applied by the
//! table writer.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Default storage cluster host
pub const DEFAULT_CLUSTER_HOST: &str = "host.docker.internal";

/// Default storage cluster port
pub const DEFAULT_CLUSTER_PORT: u16 = 7077;

/// Table store adapter
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Versioned commit files on local disk (default)
    #[default]
    Disk,
    /// In-process store, lost on restart
    Memory,
}

/// Storage configuration
///
/// # Example
///
/// ```toml
/// [storage]
/// kind = "disk"
/// path = "data"
/// root_prefix = "lake"
/// cluster_host = "spark-master"
/// cluster_port = 7077
/// write_timeout = "10s"
/// verify_writes = false
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Adapter to use
    /// Default: disk
    pub kind: StorageKind,

    /// Base directory for the disk adapter
    /// Default: "data"
    pub path: PathBuf,

    /// Prefix prepended to every destination path when set and non-empty
    pub root_prefix: Option<String>,

    /// Storage cluster host
    /// Default: "host.docker.internal"
    pub cluster_host: String,

    /// Storage cluster port
    /// Default: 7077
    pub cluster_port: u16,

    /// Upper bound on a single append
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,

    /// Read the destination back after every write
    /// Default: false
    pub verify_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::Disk,
            path: PathBuf::from("data"),
            root_prefix: None,
            cluster_host: DEFAULT_CLUSTER_HOST.to_string(),
            cluster_port: DEFAULT_CLUSTER_PORT,
            write_timeout: Duration::from_secs(10),
            verify_writes: false,
        }
    }
}

impl StorageConfig {
    /// Root prefix, if one is set and non-empty
    pub fn root_prefix(&self) -> Option<&str> {
        self.root_prefix
            .as_deref()
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
    }

    /// Storage cluster URL
    pub fn cluster_url(&self) -> String {
        format!("spark://{}:{}", self.cluster_host, self.cluster_port)
    }
}
