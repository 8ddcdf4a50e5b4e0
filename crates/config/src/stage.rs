//! Stage identity configuration
//!
//! Names the processing stage this process implements. The name is looked up
//! in each routing rule's stage chain to find the next hop.

use serde::Deserialize;

/// Default stage name
pub const DEFAULT_STAGE_NAME: &str = "deltawriter";

/// Stage configuration
///
/// # Example
///
/// ```toml
/// [stage]
/// name = "deltawriter"   # default
/// mask_pii = false       # default
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Name of this stage in routing chains
    /// Default: "deltawriter"
    pub name: String,

    /// Mask SSNs and phone numbers before writing and forwarding
    /// Default: false
    pub mask_pii: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_STAGE_NAME.to_string(),
            mask_pii: false,
        }
    }
}
