//! Command implementations for the RTDL CLI

pub mod check;
pub mod serve;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use rtdl_config::Config;
use rtdl_routing::{DirectoryRuleSource, RuleStore};

/// Files tried, in order, when no `--config` is given
const DEFAULT_CONFIG_PATHS: [&str; 2] = ["configs/config.toml", "config.toml"];

/// Load the configuration file, then apply environment overrides
///
/// An explicit path must exist. Without one the default paths are tried
/// and built-in defaults are used if none exists.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => {
            if !path.exists() {
                bail!("config file not found: {}", path.display());
            }
            Config::from_file(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => match DEFAULT_CONFIG_PATHS.iter().map(Path::new).find(|p| p.exists()) {
            Some(path) => Config::from_file(path).with_context(|| {
                format!("failed to load configuration from {}", path.display())
            })?,
            None => Config::default(),
        },
    };

    config
        .apply_env()
        .context("invalid configuration in environment")?;
    Ok(config)
}

/// Rule source described by the `[routing]` section
pub fn rule_source(config: &Config) -> DirectoryRuleSource {
    DirectoryRuleSource::new(config.routing.config_dir.clone())
}

/// Build and load the process-wide rule store
pub fn load_rule_store(config: &Config) -> Result<Arc<RuleStore>> {
    let store = RuleStore::load(Arc::new(rule_source(config))).with_context(|| {
        format!(
            "failed to load routing rules from {}",
            config.routing.config_dir.display()
        )
    })?;
    Ok(Arc::new(store))
}
