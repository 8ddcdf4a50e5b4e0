//! Mask Transformer - blank out PII before events are stored or forwarded
//!
//! The event is serialized, every match of the built-in patterns is
//! replaced with `###`, and the text is parsed back into JSON.
//!
//! # Built-in Patterns
//!
//! | Pattern | Regex | Example |
//! |---------|-------|---------|
//! | US SSN | `\d{3}-\d{2}-\d{4}` | `123-45-6789` |
//! | US phone | `[2-9]\d{2}-\d{3}-\d{4}` | `555-123-4567` |
//!
//! Patterns apply in that order to the whole serialized event, keys
//! included.
//!
//! # Example
//!
//! ```
//! use rtdl_transform::PiiMasker;
//! use serde_json::json;
//!
//! let masker = PiiMasker::new();
//! let event = json!({"note": "call 555-123-4567"});
//! let masked = masker.mask_event(&event).unwrap();
//! assert_eq!(masked, Some(json!({"note": "call ###"})));
//! ```

mod patterns;

pub use patterns::{MASK, PHONE_US, SSN_US};

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use crate::TransformError;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Metrics for the masker
#[derive(Debug, Default)]
pub struct MaskMetrics {
    /// Events scanned
    pub events_processed: AtomicU64,
    /// Events that contained at least one match
    pub events_masked: AtomicU64,
    /// Events left unmasked because masking broke the JSON
    pub reparse_failures: AtomicU64,
}

/// PII masker
///
/// Stateless apart from its counters; safe to share across invocations.
#[derive(Debug, Default)]
pub struct PiiMasker {
    metrics: MaskMetrics,
}

impl PiiMasker {
    /// Create a masker with the built-in patterns
    pub fn new() -> Self {
        Self::default()
    }

    /// Get masker metrics
    pub fn metrics(&self) -> &MaskMetrics {
        &self.metrics
    }

    /// Replace every PII match in `text` with [`MASK`]
    ///
    /// Borrows the input when nothing matched.
    pub fn mask_text<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut out = Cow::Borrowed(text);
        for pattern in patterns::patterns() {
            let replaced = match pattern.replace_all(&out, MASK) {
                Cow::Owned(replaced) => Some(replaced),
                Cow::Borrowed(_) => None,
            };
            if let Some(replaced) = replaced {
                out = Cow::Owned(replaced);
            }
        }
        out
    }

    /// Mask an event
    ///
    /// Returns `Ok(None)` when the event contains no PII.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Reparse`] if the masked text is no longer
    /// valid JSON; callers should keep the original event.
    pub fn mask_event(&self, event: &Value) -> Result<Option<Value>, TransformError> {
        self.metrics.events_processed.fetch_add(1, Ordering::Relaxed);

        let text = serde_json::to_string(event).map_err(TransformError::Encode)?;
        let masked = match self.mask_text(&text) {
            Cow::Borrowed(_) => return Ok(None),
            Cow::Owned(masked) => masked,
        };

        match serde_json::from_str(&masked) {
            Ok(value) => {
                self.metrics.events_masked.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            Err(e) => {
                self.metrics.reparse_failures.fetch_add(1, Ordering::Relaxed);
                Err(TransformError::Reparse(e))
            }
        }
    }
}
