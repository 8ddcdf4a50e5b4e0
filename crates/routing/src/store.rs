//! Hot-swappable rule store
//!
//! ```text
//! [match_event()] → [ArcSwap::load()] → [RuleSet::match_event()]
//!                         ↑
//! [reload()] → [source.load()] → [RuleSet::from_rules()] → [ArcSwap::store()]
//! ```
//!
//! Readers never lock. Reloads build a complete new set off to the side and
//! publish it with one pointer swap, so a reader sees either the whole old
//! set or the whole new one. Reloads are serialized so the last one to
//! finish is the one that stays published.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::ConfigLoadError;
use crate::rule::RoutingRule;
use crate::source::RuleSource;
use crate::table::RuleSet;

/// Summary of one reload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadSummary {
    /// Rules now published
    pub loaded: usize,
    /// Records skipped as malformed or invalid
    pub skipped: usize,
    /// Records excluded as inactive
    pub inactive: usize,
    /// Identity values claimed by more than one rule
    pub ambiguous: usize,
    /// Generation number of the published set
    pub generation: u64,
}

/// Process-wide owner of the current rule set
pub struct RuleStore {
    current: ArcSwap<RuleSet>,
    source: Arc<dyn RuleSource>,
    reload_lock: Mutex<()>,
    generation: AtomicU64,
}

impl std::fmt::Debug for RuleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleStore")
            .field("source", &self.source.describe())
            .field("rules", &self.current.load().len())
            .field("generation", &self.generation())
            .finish()
    }
}

impl RuleStore {
    /// Create a store with an empty rule set; call [`RuleStore::reload`] to fill it
    pub fn new(source: Arc<dyn RuleSource>) -> Self {
        Self {
            current: ArcSwap::from_pointee(RuleSet::new()),
            source,
            reload_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Create a store and load it once
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be listed at all.
    pub fn load(source: Arc<dyn RuleSource>) -> Result<Self, ConfigLoadError> {
        let store = Self::new(source);
        store.reload()?;
        Ok(store)
    }

    /// Current rule set
    #[inline]
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.current.load_full()
    }

    /// Find the rule for `event` in the current set
    pub fn match_event(&self, event: &Value) -> Option<Arc<RoutingRule>> {
        self.current.load().match_event(event).cloned()
    }

    /// Number of completed reloads
    ///
    /// Bumped only after the new set is published, so a snapshot taken after
    /// reading generation `n` is at least as new as reload `n`.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Location of the rule source, for logs
    pub fn describe(&self) -> String {
        self.source.describe()
    }

    /// Re-read the source and publish a new rule set
    ///
    /// Bad records are skipped with a warning. If the source as a whole
    /// cannot be read, the current set stays published.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be listed at all.
    pub fn reload(&self) -> Result<ReloadSummary, ConfigLoadError> {
        let _guard = self.reload_lock.lock();

        let report = match self.source.load() {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(source = %self.source.describe(), error = %e, "rule reload failed, keeping current rules");
                return Err(e);
            }
        };

        for skipped in &report.skipped {
            tracing::warn!(record = %skipped.path().display(), error = %skipped, "skipping rule record");
        }

        let rules = RuleSet::from_rules(report.rules);
        for ambiguity in rules.ambiguities() {
            tracing::warn!(
                field = %ambiguity.field,
                value = %ambiguity.value,
                winner = %ambiguity.winner,
                shadowed = %ambiguity.shadowed,
                "identity value claimed by more than one rule, first loaded wins"
            );
        }

        let loaded = rules.len();
        let ambiguous = rules.ambiguities().len();
        self.current.store(Arc::new(rules));

        let summary = ReloadSummary {
            loaded,
            skipped: report.skipped.len(),
            inactive: report.inactive,
            ambiguous,
            generation: self.generation.fetch_add(1, Ordering::Release) + 1,
        };

        tracing::info!(
            source = %self.source.describe(),
            loaded = summary.loaded,
            skipped = summary.skipped,
            inactive = summary.inactive,
            generation = summary.generation,
            "routing rules reloaded"
        );
        Ok(summary)
    }
}
