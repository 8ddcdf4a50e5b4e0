//! Rule set with per-field lookup indexes
//!
//! The rule set is compiled once per reload. Matching an event costs at
//! most one hash lookup per identity field; all allocations happen while
//! the set is built.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use serde_json::Value;

use crate::identity::IdentityField;
use crate::rule::RoutingRule;

/// Immutable collection of routing rules in load order
///
/// Each identity field has its own index from value to the position of the
/// first rule (in load order) carrying that value. The earliest position
/// across the fields gives the same answer as scanning the rules in order,
/// without the scan.
///
/// # Example
///
/// ```
/// use rtdl_routing::{IdentityField, RoutingRule, RuleSet};
/// use serde_json::json;
///
/// let rules = RuleSet::from_rules(vec![
///     RoutingRule::new("a.json").with_identity(IdentityField::StreamId, "s1"),
///     RoutingRule::new("b.json").with_identity(IdentityField::ProjectId, "p1"),
/// ]);
///
/// let event = json!({"stream_id": "s1", "project_id": "p1"});
/// // Both rules match; the first loaded one wins
/// assert_eq!(rules.match_event(&event).unwrap().source(), "a.json");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    /// Rules in load order
    rules: Vec<Arc<RoutingRule>>,

    /// Per-field value → index into `rules`, indexed by `IdentityField::as_usize`
    indexes: [HashMap<String, usize>; 3],

    /// Identity values claimed by more than one rule
    ambiguities: Vec<Ambiguity>,
}

/// An identity value claimed by several rules; the first one wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    /// Field the value was found in
    pub field: IdentityField,
    /// Contested value
    pub value: String,
    /// Record name of the winning rule
    pub winner: String,
    /// Record name of the shadowed rule
    pub shadowed: String,
}

impl RuleSet {
    /// Create an empty rule set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a rule set from rules in load order
    pub fn from_rules(rules: impl IntoIterator<Item = RoutingRule>) -> Self {
        let mut set = Self::new();
        for rule in rules {
            set.push(rule);
        }
        set
    }

    fn push(&mut self, rule: RoutingRule) {
        let position = self.rules.len();
        for field in IdentityField::ALL {
            let Some(value) = rule.identity(field) else {
                continue;
            };
            match self.indexes[field.as_usize()].entry(value.to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(position);
                }
                Entry::Occupied(slot) => {
                    self.ambiguities.push(Ambiguity {
                        field,
                        value: value.to_string(),
                        winner: self.rules[*slot.get()].source().to_string(),
                        shadowed: rule.source().to_string(),
                    });
                }
            }
        }
        self.rules.push(Arc::new(rule));
    }

    /// Find the rule for `event`
    ///
    /// Returns the first rule in load order that shares any identity field
    /// (`project_id`, `stream_alt_id`, `stream_id`) with the event. Later
    /// rules are never considered once an earlier one matches, whichever
    /// field it matched on. Non-object events and events without identity
    /// fields match nothing.
    pub fn match_event(&self, event: &Value) -> Option<&Arc<RoutingRule>> {
        IdentityField::ALL
            .into_iter()
            .filter_map(|field| {
                let value = field.of(event)?;
                self.indexes[field.as_usize()].get(value).copied()
            })
            .min()
            .and_then(|position| self.rules.get(position))
    }

    /// Rules in load order
    #[inline]
    pub fn rules(&self) -> &[Arc<RoutingRule>] {
        &self.rules
    }

    /// Identity values claimed by more than one rule
    #[inline]
    pub fn ambiguities(&self) -> &[Ambiguity] {
        &self.ambiguities
    }

    /// Number of rules
    #[inline]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set holds no rules
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of rules carrying a stage chain
    pub fn chained_count(&self) -> usize {
        self.rules.iter().filter(|r| r.stages().is_some()).count()
    }
}
