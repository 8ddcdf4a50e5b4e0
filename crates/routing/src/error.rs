//! Routing error types

use std::path::PathBuf;

use thiserror::Error;

/// Result type for rule validation
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Errors raised while validating a single routing rule
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    /// Stage list contains an empty item, e.g. `"a,,b"`
    #[error("stage list has an empty entry at position {position}")]
    EmptyStage {
        /// Zero-based position of the empty item
        position: usize,
    },

    /// Same stage named twice in one chain
    #[error("stage '{name}' appears more than once in the stage list")]
    DuplicateStage {
        /// Repeated stage name
        name: String,
    },

    /// Rule carries stages but no identity field, so it can never match
    #[error("rule has stages but no project_id, stream_alt_id or stream_id")]
    NoIdentity,
}

impl RoutingError {
    /// Create an EmptyStage error
    #[inline]
    pub fn empty_stage(position: usize) -> Self {
        Self::EmptyStage { position }
    }

    /// Create a DuplicateStage error
    #[inline]
    pub fn duplicate_stage(name: impl Into<String>) -> Self {
        Self::DuplicateStage { name: name.into() }
    }
}

/// A rule record that could not be loaded
///
/// Never fatal for a reload: the record is skipped and the error logged.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// Record could not be read
    #[error("failed to read rule record {path}: {source}")]
    Io {
        /// Record path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Record is not a valid JSON rule
    #[error("malformed rule record {path}: {source}")]
    Json {
        /// Record path
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Record parsed but failed validation
    #[error("invalid rule record {path}: {source}")]
    Invalid {
        /// Record path
        path: PathBuf,
        /// Validation failure
        #[source]
        source: RoutingError,
    },
}

impl ConfigLoadError {
    /// Path of the offending record
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Io { path, .. } | Self::Json { path, .. } | Self::Invalid { path, .. } => path,
        }
    }
}

/// A matched rule whose chain is inconsistent with the running stage
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteIntegrityError {
    /// The running stage is not an element of the matched rule's chain
    #[error("stage '{stage}' is not part of chain '{chain}'")]
    StageNotInChain {
        /// Name of the running stage
        stage: String,
        /// The rule's chain, comma-joined
        chain: String,
    },
}
