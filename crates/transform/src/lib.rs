//! RTDL - Transform
//!
//! In-flight event transforms applied before an event is written and
//! forwarded.
//!
//! # Design Principles
//!
//! - **Fast**: Transforms should add microseconds, not milliseconds
//! - **Non-blocking**: Never block on I/O or external services
//! - **Thread-safe**: Transforms may be called concurrently
//! - **Fail open**: A transform that cannot apply leaves the event unchanged
//!
//! # Modules
//!
//! - `mask` - PII masking (US SSN and phone numbers)

mod error;

/// PII masking
pub mod mask;

pub use error::TransformError;
pub use mask::{MaskMetrics, PiiMasker};
