//! Environment overrides
//!
//! Deployments configure the stage through environment variables as well as
//! the TOML file. Variables win over the file; empty values are ignored so
//! the file or built-in defaults still apply.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `RTDL_STORAGE_ROOT` | `storage.root_prefix` |
//! | `RTDL_CONFIG_DIR` | `routing.config_dir` |
//! | `KAFKA_URL` | `messaging.endpoint` |
//! | `KAFKA_TOPIC` | `server.ingest_topic` |
//! | `SPARK_MASTER_HOST` | `storage.cluster_host` |
//! | `SPARK_MASTER_PORT` | `storage.cluster_port` |

use std::path::PathBuf;

use crate::Config;
use crate::error::{ConfigError, Result};

pub const STORAGE_ROOT: &str = "RTDL_STORAGE_ROOT";
pub const CONFIG_DIR: &str = "RTDL_CONFIG_DIR";
pub const MESSAGING_ENDPOINT: &str = "KAFKA_URL";
pub const INGEST_TOPIC: &str = "KAFKA_TOPIC";
pub const CLUSTER_HOST: &str = "SPARK_MASTER_HOST";
pub const CLUSTER_PORT: &str = "SPARK_MASTER_PORT";

/// Apply overrides using `lookup` to read variables
pub(crate) fn apply<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(root) = get(STORAGE_ROOT) {
        config.storage.root_prefix = Some(root);
    }
    if let Some(dir) = get(CONFIG_DIR) {
        config.routing.config_dir = PathBuf::from(dir);
    }
    if let Some(endpoint) = get(MESSAGING_ENDPOINT) {
        config.messaging.endpoint = Some(endpoint);
    }
    if let Some(topic) = get(INGEST_TOPIC) {
        config.server.ingest_topic = topic;
    }
    if let Some(host) = get(CLUSTER_HOST) {
        config.storage.cluster_host = host;
    }
    if let Some(port) = get(CLUSTER_PORT) {
        config.storage.cluster_port = port
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid_env(CLUSTER_PORT, port.clone(), "not a port number"))?;
    }

    Ok(())
}
