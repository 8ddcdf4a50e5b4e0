//! Identity fields shared by events and routing rules
//!
//! `IdentityField` is a lightweight, Copy name for one of the three fields
//! that tie an event to a stream.

use std::fmt;

use serde_json::Value;

/// Identity field used for rule matching
///
/// The declaration order is the order a rule's fields are checked in. Rule
/// load order decides between rules.
///
/// # Example
///
/// ```
/// use rtdl_routing::IdentityField;
///
/// let first = IdentityField::ALL[0];
/// assert_eq!(first, IdentityField::ProjectId);
/// assert_eq!(first.key(), "project_id");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityField {
    /// `project_id`
    ProjectId,
    /// `stream_alt_id`
    StreamAltId,
    /// `stream_id`
    StreamId,
}

impl IdentityField {
    /// All identity fields in check order
    pub const ALL: [IdentityField; 3] = [
        IdentityField::ProjectId,
        IdentityField::StreamAltId,
        IdentityField::StreamId,
    ];

    /// JSON key of this field
    #[inline]
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::ProjectId => "project_id",
            Self::StreamAltId => "stream_alt_id",
            Self::StreamId => "stream_id",
        }
    }

    /// Position in [`IdentityField::ALL`]
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self as usize
    }

    /// Value of this field in `event`, if present
    #[inline]
    pub fn of(self, event: &Value) -> Option<&str> {
        field_str(event, self.key())
    }
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Read `key` from a JSON object as a "present" string
///
/// A field is present only if it exists, is a string, and is non-empty.
/// Anything else (missing, null, number, object, empty string, or a
/// non-object `value`) reads as absent.
///
/// # Example
///
/// ```
/// use rtdl_routing::field_str;
/// use serde_json::json;
///
/// let event = json!({"stream_id": "s1", "project_id": "", "type": 7});
/// assert_eq!(field_str(&event, "stream_id"), Some("s1"));
/// assert_eq!(field_str(&event, "project_id"), None);
/// assert_eq!(field_str(&event, "type"), None);
/// ```
#[inline]
pub fn field_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
