//! HTTP server configuration

use serde::Deserialize;

/// HTTP server configuration
///
/// # Example
///
/// ```toml
/// [server]
/// host = "0.0.0.0"          # default
/// port = 8083               # default
/// ingest_topic = "ingress"  # default
/// max_payload_size = 1048576
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    /// Default: "0.0.0.0"
    pub host: String,

    /// Port to listen on
    /// Default: 8083
    pub port: u16,

    /// Topic the `/ingest` front door publishes to
    /// Default: "ingress"
    pub ingest_topic: String,

    /// Largest accepted request body in bytes
    /// Default: 1 MiB
    pub max_payload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8083,
            ingest_topic: "ingress".to_string(),
            max_payload_size: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Address to bind, as `host:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8083");
        assert_eq!(config.ingest_topic, "ingress");
        assert_eq!(config.max_payload_size, 1024 * 1024);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ServerConfig = toml::from_str("port = 9000").unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
    }
}
