//! Messaging configuration
//!
//! Where forwarded events are published and how long a send may take.

use std::time::Duration;

use serde::Deserialize;

/// Messaging adapter
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessagingKind {
    /// Framed TCP producer (default)
    #[default]
    Tcp,
    /// Records sends in memory, nothing leaves the process
    Memory,
}

/// Messaging configuration
///
/// # Example
///
/// ```toml
/// [messaging]
/// endpoint = "broker:9092"
/// send_timeout = "10s"
/// connect_timeout = "5s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Adapter to use
    /// Default: tcp
    pub kind: MessagingKind,

    /// Broker address (host:port). Required only when a forward happens.
    pub endpoint: Option<String>,

    /// Upper bound on waiting for a send acknowledgment
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub send_timeout: Duration,

    /// Upper bound on establishing a connection
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            kind: MessagingKind::Tcp,
            endpoint: None,
            send_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl MessagingConfig {
    /// Broker endpoint, if one is set and non-empty
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}
