//! Pipeline error types
//!
//! Only [`PipelineError`] aborts an invocation. Write and forward failures
//! are reported in the invocation outcome and processing continues.

use rtdl_routing::RouteIntegrityError;
use rtdl_sinks::forwarder::ForwardError;
use thiserror::Error;

use crate::dispatch::ForwardTarget;

/// Errors that abort an invocation
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Inbound payload is not valid JSON
    #[error("event is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// Inbound payload is JSON but not an object
    #[error("event must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors building an ingest envelope
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Body is not valid JSON
    #[error("body is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// Body is valid JSON but not an object
    #[error("body must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// Envelope could not be serialized
    #[error("envelope could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Dispatch failures
///
/// Never fatal; the stage function logs them and reports them.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Matched rule's chain does not contain the running stage
    #[error(transparent)]
    Integrity(#[from] RouteIntegrityError),

    /// The next stage was known but the send failed
    #[error("forward to {} failed: {source}", target.topic)]
    Forward {
        target: ForwardTarget,
        #[source]
        source: ForwardError,
    },
}

impl DispatchError {
    /// Short machine-readable kind, for reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Integrity(_) => "integrity",
            Self::Forward { source, .. } => source.kind(),
        }
    }
}
