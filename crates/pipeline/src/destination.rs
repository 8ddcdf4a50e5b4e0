//! Destination resolution
//!
//! Namespace and table are picked independently, each from the first
//! present field of its candidate list:
//!
//! | Part | Candidates | Fallback |
//! |------|------------|----------|
//! | namespace | `project_id`, `stream_alt_id`, `stream_id` | `rtdl_default_db` |
//! | table | `type`, `message_type` | `rtdl_default_table` |
//!
//! A field counts only when it is a non-empty string.

use rtdl_routing::field_str;
use rtdl_sinks::table::{DEFAULT_NAMESPACE, DEFAULT_TABLE, Destination};
use serde_json::Value;

/// Namespace candidates, highest priority first
pub const NAMESPACE_FIELDS: [&str; 3] = ["project_id", "stream_alt_id", "stream_id"];

/// Table candidates, highest priority first
pub const TABLE_FIELDS: [&str; 2] = ["type", "message_type"];

/// Resolve the storage destination of an event
///
/// Never fails; a non-object event resolves to the defaults.
pub fn resolve(event: &Value) -> Destination {
    Destination::new(
        first_present(event, &NAMESPACE_FIELDS).unwrap_or(DEFAULT_NAMESPACE),
        first_present(event, &TABLE_FIELDS).unwrap_or(DEFAULT_TABLE),
    )
}

fn first_present<'a>(event: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| field_str(event, key))
}
