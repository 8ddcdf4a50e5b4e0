//! Routing configuration
//!
//! Points at the directory of routing rule records and names the control code
//! that triggers a reload of those records.
//!
//! # Example
//!
//! ```toml
//! [routing]
//! config_dir = "storage/configs"
//! control_code = "rtdl_205"
//! ```

use std::path::PathBuf;

use serde::Deserialize;

/// Default control code that triggers a rule reload
pub const DEFAULT_CONTROL_CODE: &str = "rtdl_205";

/// Routing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Directory holding one JSON rule record per file
    /// Default: "storage/configs"
    pub config_dir: PathBuf,

    /// Value of `message_type`/`type` that means "reload rules"
    /// Default: "rtdl_205"
    pub control_code: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("storage/configs"),
            control_code: DEFAULT_CONTROL_CODE.to_string(),
        }
    }
}
