//! Routing rules and their on-disk record format

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, RoutingError};
use crate::identity::IdentityField;
use crate::stages::StageList;

/// One routing rule, validated at load time
///
/// # Example
///
/// ```
/// use rtdl_routing::{IdentityField, RoutingRule};
///
/// let rule = RoutingRule::new("orders.json")
///     .with_identity(IdentityField::StreamId, "orders")
///     .with_stages("deltawriter,enricher".parse().unwrap());
///
/// assert_eq!(rule.identity(IdentityField::StreamId), Some("orders"));
/// assert_eq!(rule.stages().map(|s| s.len()), Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRule {
    /// Where the rule came from (record file name), for logs
    source: String,
    /// Identity values indexed by `IdentityField::as_usize`
    identities: [Option<String>; 3],
    stages: Option<StageList>,
    active: bool,
    message_type: Option<String>,
    folder_name: Option<String>,
}

impl RoutingRule {
    /// Create an active rule with no identities and no stages
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            identities: [None, None, None],
            stages: None,
            active: true,
            message_type: None,
            folder_name: None,
        }
    }

    /// Set an identity field; empty values are ignored
    #[must_use]
    pub fn with_identity(mut self, field: IdentityField, value: impl Into<String>) -> Self {
        let value = value.into();
        self.identities[field.as_usize()] = (!value.is_empty()).then_some(value);
        self
    }

    /// Set the stage chain; an empty chain means no stages
    #[must_use]
    pub fn with_stages(mut self, stages: StageList) -> Self {
        self.stages = (!stages.is_empty()).then_some(stages);
        self
    }

    /// Set the active flag
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Set the informational message type
    #[must_use]
    pub fn with_message_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = Some(message_type.into());
        self
    }

    /// Set the informational folder name
    #[must_use]
    pub fn with_folder_name(mut self, folder_name: impl Into<String>) -> Self {
        self.folder_name = Some(folder_name.into());
        self
    }

    /// Record name this rule was loaded from
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Value of an identity field
    #[inline]
    pub fn identity(&self, field: IdentityField) -> Option<&str> {
        self.identities[field.as_usize()].as_deref()
    }

    /// Whether any identity field is set
    #[inline]
    pub fn has_identity(&self) -> bool {
        self.identities.iter().any(Option::is_some)
    }

    /// Stage chain, if the rule has one
    #[inline]
    pub fn stages(&self) -> Option<&StageList> {
        self.stages.as_ref()
    }

    /// Whether the rule is active
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Informational message type
    #[inline]
    pub fn message_type(&self) -> Option<&str> {
        self.message_type.as_deref()
    }

    /// Informational folder name
    #[inline]
    pub fn folder_name(&self) -> Option<&str> {
        self.folder_name.as_deref()
    }

    /// Check the rule could ever take part in routing
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::NoIdentity`] for a rule with stages but no identity.
    pub fn validate(&self) -> Result<()> {
        if self.stages.is_some() && !self.has_identity() {
            return Err(RoutingError::NoIdentity);
        }
        Ok(())
    }
}

/// Raw rule record as stored in the config directory
///
/// Field values may be plain JSON or the legacy nullable wrapper
/// `{"String": "...", "Valid": true}` / `{"Bool": true, "Valid": true}`.
/// Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RuleRecord {
    pub project_id: Option<Nullable>,
    pub stream_alt_id: Option<Nullable>,
    pub stream_id: Option<Nullable>,
    pub stages: Option<Nullable>,
    pub active: Option<Nullable>,
    pub message_type: Option<Nullable>,
    pub folder_name: Option<Nullable>,
}

/// A record field in either plain or legacy wrapped form
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Nullable {
    /// `{"String": "...", "Valid": true}`
    WrappedString {
        #[serde(rename = "String")]
        value: String,
        #[serde(rename = "Valid", default)]
        valid: bool,
    },
    /// `{"Bool": true, "Valid": true}`
    WrappedBool {
        #[serde(rename = "Bool")]
        value: bool,
        #[serde(rename = "Valid", default)]
        valid: bool,
    },
    /// Any plain JSON value
    Plain(Value),
}

impl Nullable {
    /// Non-empty string content; anything else reads as absent
    fn into_string(self) -> Option<String> {
        match self {
            Self::WrappedString {
                value: s,
                valid: true,
            }
            | Self::Plain(Value::String(s)) => (!s.is_empty()).then_some(s),
            _ => None,
        }
    }

    /// Boolean content; anything else reads as absent
    fn into_bool(self) -> Option<bool> {
        match self {
            Self::WrappedBool {
                value: b,
                valid: true,
            } => Some(b),
            Self::Plain(Value::Bool(b)) => Some(b),
            _ => None,
        }
    }
}

impl RuleRecord {
    /// Validate the record and turn it into a rule
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed stage list or a rule that can never match.
    pub fn into_rule(self, source: impl Into<String>) -> Result<RoutingRule> {
        let string = |field: Option<Nullable>| field.and_then(Nullable::into_string);

        let mut rule = RoutingRule::new(source)
            .with_active(self.active.and_then(Nullable::into_bool).unwrap_or(true));
        for (field, value) in [
            (IdentityField::ProjectId, string(self.project_id)),
            (IdentityField::StreamAltId, string(self.stream_alt_id)),
            (IdentityField::StreamId, string(self.stream_id)),
        ] {
            if let Some(value) = value {
                rule = rule.with_identity(field, value);
            }
        }
        if let Some(stages) = string(self.stages) {
            rule = rule.with_stages(stages.parse()?);
        }
        rule.message_type = string(self.message_type);
        rule.folder_name = string(self.folder_name);

        rule.validate()?;
        Ok(rule)
    }
}
