//! Configuration validation
//!
//! Validates config consistency:
//! - Stage name is usable as a chain element
//! - Control code and ingest topic are non-empty
//! - Timeouts and size limits are non-zero

use std::time::Duration;

use crate::Config;
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_stage(config)?;
    validate_routing(config)?;
    validate_storage(config)?;
    validate_messaging(config)?;
    validate_server(config)?;
    Ok(())
}

fn validate_stage(config: &Config) -> Result<()> {
    let name = &config.stage.name;
    if name.trim().is_empty() {
        return Err(ConfigError::missing_field("stage", "name"));
    }
    // Stage lists are comma separated and trimmed, so these could never match
    if name.contains(',') || name.trim() != name {
        return Err(ConfigError::invalid_value(
            "stage",
            "name",
            "must not contain commas or surrounding whitespace",
        ));
    }
    Ok(())
}

fn validate_routing(config: &Config) -> Result<()> {
    if config.routing.control_code.trim().is_empty() {
        return Err(ConfigError::missing_field("routing", "control_code"));
    }
    if config.routing.config_dir.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("routing", "config_dir"));
    }
    Ok(())
}

fn validate_storage(config: &Config) -> Result<()> {
    non_zero("storage", "write_timeout", config.storage.write_timeout)?;
    if config.storage.cluster_host.trim().is_empty() {
        return Err(ConfigError::missing_field("storage", "cluster_host"));
    }
    Ok(())
}

fn validate_messaging(config: &Config) -> Result<()> {
    non_zero("messaging", "send_timeout", config.messaging.send_timeout)?;
    non_zero("messaging", "connect_timeout", config.messaging.connect_timeout)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<()> {
    if config.server.ingest_topic.trim().is_empty() {
        return Err(ConfigError::missing_field("server", "ingest_topic"));
    }
    if config.server.max_payload_size == 0 {
        return Err(ConfigError::invalid_value(
            "server",
            "max_payload_size",
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn non_zero(section: &'static str, field: &'static str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(ConfigError::invalid_value(section, field, "must be greater than zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_stage_name() {
        let mut config = Config::default();
        config.stage.name = String::new();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { section: "stage", .. }));
    }

    #[test]
    fn test_stage_name_with_comma() {
        let mut config = Config::default();
        config.stage.name = "deltawriter,enricher".into();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "name", .. }));
    }

    #[test]
    fn test_zero_write_timeout() {
        let mut config = Config::default();
        config.storage.write_timeout = Duration::ZERO;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("write_timeout"));
    }

    #[test]
    fn test_zero_send_timeout() {
        let mut config = Config::default();
        config.messaging.send_timeout = Duration::ZERO;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_blank_control_code() {
        let mut config = Config::default();
        config.routing.control_code = "  ".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_ingest_topic() {
        let mut config = Config::default();
        config.server.ingest_topic = String::new();
        assert!(validate_config(&config).is_err());
    }
}
