//! RTDL Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use rtdl_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[stage]\nname = \"deltawriter\"").unwrap();
//! assert_eq!(config.stage.name, "deltawriter");
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [stage]
//! name = "deltawriter"
//!
//! [routing]
//! config_dir = "storage/configs"
//!
//! [storage]
//! kind = "disk"
//! path = "data"
//!
//! [messaging]
//! endpoint = "kafka:9092"
//!
//! [server]
//! port = 8083
//! ```
//!
//! Environment variables override the file, see [`Config::apply_env`].

mod env;
mod error;
mod logging;
mod messaging;
mod routing;
mod server;
mod stage;
mod storage;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use env::{
    CLUSTER_HOST, CLUSTER_PORT, CONFIG_DIR, INGEST_TOPIC, MESSAGING_ENDPOINT, STORAGE_ROOT,
};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, STAGE_TARGETS};
pub use messaging::{MessagingConfig, MessagingKind};
pub use routing::{DEFAULT_CONTROL_CODE, RoutingConfig};
pub use server::ServerConfig;
pub use stage::{DEFAULT_STAGE_NAME, StageConfig};
pub use storage::{DEFAULT_CLUSTER_HOST, DEFAULT_CLUSTER_PORT, StorageConfig, StorageKind};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Identity of this processing stage
    pub stage: StageConfig,

    /// Routing rule source and control code
    pub routing: RoutingConfig,

    /// Table storage adapter and write policy
    pub storage: StorageConfig,

    /// Messaging adapter for forwards
    pub messaging: MessagingConfig,

    /// HTTP server settings
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Apply overrides from the process environment, then re-validate
    ///
    /// # Errors
    ///
    /// Returns error if a variable holds an unusable value.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`, then re-validate
    ///
    /// # Errors
    ///
    /// Returns error if a variable holds an unusable value.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        env::apply(self, lookup)?;
        self.validate()
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
