//! RTDL - Sinks
//!
//! Outputs of the ingestion stage: the append-only table store every event
//! is written to, and the producer that hands events to the next stage.
//!
//! ```text
//! [StageFunction] --Bytes--> [TableWriter] --> [TableStore]
//!                 --Bytes--> [Producer] --> <next-stage>-ingress
//! ```
//!
//! # Available Sinks
//!
//! | Sink | Purpose |
//! |------|---------|
//! | `table::DiskTableStore` | Versioned commit files on local disk |
//! | `table::MemoryTableStore` | In-process store for tests and dry runs |
//! | `forwarder::TcpProducer` | Framed TCP messaging to a broker |
//! | `forwarder::MemoryProducer` | Records sends for tests and dry runs |
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rtdl_sinks::table::{Destination, MemoryTableStore, TableWriter};
//!
//! let writer = TableWriter::new(Arc::new(MemoryTableStore::new()));
//! let receipt = writer.append(&Destination::default(), payload).await?;
//! ```

// =============================================================================
// Sink implementations (each in its own submodule)
// =============================================================================

/// Table sink - append-only, versioned table storage
pub mod table;

/// Forwarder sink - next-stage messaging
pub mod forwarder;

// =============================================================================
// Shared types
// =============================================================================

mod common;

#[cfg(test)]
mod common_test;

pub use common::{MetricsSnapshot, SinkMetrics};
