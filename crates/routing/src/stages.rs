//! Ordered stage chains
//!
//! A rule's `stages` field is a comma separated string such as
//! `"deltawriter,enricher,sink"`. It is parsed once, at load time, into a
//! `StageList`; dispatch then only does slice lookups.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, RoutingError};

/// Parsed, validated stage chain
///
/// Items are trimmed, non-empty and unique. An empty list is allowed and
/// behaves like a rule without stages.
///
/// # Example
///
/// ```
/// use rtdl_routing::{NextStage, StageList};
///
/// let chain: StageList = "deltawriter, enricher ,sink".parse().unwrap();
/// assert_eq!(chain.next_after("deltawriter"), NextStage::Next("enricher"));
/// assert_eq!(chain.next_after("sink"), NextStage::Last);
/// assert_eq!(chain.next_after("other"), NextStage::Missing);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageList {
    stages: Vec<String>,
}

/// Position of a stage within a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStage<'a> {
    /// The stage has a successor
    Next(&'a str),
    /// The stage ends the chain
    Last,
    /// The stage is not in the chain
    Missing,
}

impl StageList {
    /// Build from already separated names, applying the same validation as parsing
    ///
    /// # Errors
    ///
    /// Returns an error for empty or repeated names.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stages: Vec<String> = Vec::new();
        for (position, raw) in names.into_iter().enumerate() {
            let name = raw.as_ref().trim();
            if name.is_empty() {
                return Err(RoutingError::empty_stage(position));
            }
            if stages.iter().any(|s| s == name) {
                return Err(RoutingError::duplicate_stage(name));
            }
            stages.push(name.to_string());
        }
        Ok(Self { stages })
    }

    /// Successor of `current` in this chain
    pub fn next_after(&self, current: &str) -> NextStage<'_> {
        match self.stages.iter().position(|s| s == current) {
            None => NextStage::Missing,
            Some(i) => match self.stages.get(i + 1) {
                Some(next) => NextStage::Next(next),
                None => NextStage::Last,
            },
        }
    }

    /// Whether `name` is part of this chain
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.stages.iter().any(|s| s == name)
    }

    /// Stage names in chain order
    #[inline]
    pub fn as_slice(&self) -> &[String] {
        &self.stages
    }

    /// Number of stages
    #[inline]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl FromStr for StageList {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        Self::from_names(s.split(','))
    }
}

impl fmt::Display for StageList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stages.join(","))
    }
}
