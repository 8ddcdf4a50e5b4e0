//! Transform error types

use thiserror::Error;

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

/// Errors that can occur during transformation
#[derive(Debug, Error)]
pub enum TransformError {
    /// Event could not be serialized for scanning
    #[error("failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),

    /// Masked text is no longer valid JSON
    #[error("masked event is not valid JSON: {0}")]
    Reparse(#[source] serde_json::Error),
}
