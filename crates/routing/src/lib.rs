//! RTDL - Routing
//!
//! Routing rules decide where an event goes after this stage has written it.
//! Rules are loaded from a [`RuleSource`], compiled into an immutable
//! [`RuleSet`], and published through a [`RuleStore`] that can be reloaded
//! at any time without blocking readers.
//!
//! # Design
//!
//! - Stage chains are parsed once at load time into a [`StageList`]
//! - Matching is one hash lookup per identity field; the first loaded
//!   matching rule wins
//! - A reload replaces the whole set in one atomic swap
//! - Bad records are skipped with a warning; a reload never fails because
//!   of one record
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rtdl_routing::{IdentityField, MemoryRuleSource, NextStage, RoutingRule, RuleStore};
//! use serde_json::json;
//!
//! let source = Arc::new(MemoryRuleSource::new(vec![
//!     RoutingRule::new("orders.json")
//!         .with_identity(IdentityField::StreamId, "orders")
//!         .with_stages("deltawriter,enricher".parse().unwrap()),
//! ]));
//! let store = RuleStore::load(source).unwrap();
//!
//! let rule = store.match_event(&json!({"stream_id": "orders"})).unwrap();
//! let next = rule.stages().unwrap().next_after("deltawriter");
//! assert_eq!(next, NextStage::Next("enricher"));
//! ```

mod error;
mod identity;
mod rule;
mod source;
mod stages;
mod store;
mod table;


pub use error::{ConfigLoadError, Result, RouteIntegrityError, RoutingError};
pub use identity::{IdentityField, field_str};
pub use rule::{Nullable, RoutingRule, RuleRecord};
pub use source::{DirectoryRuleSource, LoadReport, MemoryRuleSource, RuleSource};
pub use stages::{NextStage, StageList};
pub use store::{ReloadSummary, RuleStore};
pub use table::{Ambiguity, RuleSet};
