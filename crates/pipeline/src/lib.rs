//! RTDL - Pipeline
//!
//! The delta-writer stage: every inbound event is written to its table and
//! then handed to the next stage of its routing chain.
//!
//! # Architecture
//!
//! ```text
//!                      ┌──────────────┐
//! bytes ──► parse ───► │ControlHandler│──► RuleStore::reload (control signal)
//!                      └──────┬───────┘
//!                             ▼
//!                  resolve ─► mask ─► TableWriter ─► TableStore
//!                                          │
//!                    RuleStore::match ─► Dispatcher ─► Producer ─► <next>-ingress
//! ```
//!
//! # Key Design
//!
//! - **Only parsing is fatal**: write and forward failures are logged,
//!   counted and reported, and never stop the invocation
//! - **Write before forward**: a failed write still dispatches
//! - **Lock-free reads**: rules are read from an `ArcSwap` snapshot
//! - **Control events are consumed**: never masked, written or forwarded
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rtdl_pipeline::StageFunction;
//! use rtdl_routing::{DirectoryRuleSource, RuleStore};
//!
//! let rules = Arc::new(RuleStore::load(Arc::new(DirectoryRuleSource::new(&config.routing.config_dir)))?);
//! let stage = StageFunction::from_config(&config, rules);
//! let report = stage.invoke(br#"{"stream_id":"s1","type":"orders"}"#).await?;
//! ```

mod control;
mod destination;
mod dispatch;
mod envelope;
mod error;
mod function;
mod metrics;

pub use control::ControlHandler;
pub use destination::{NAMESPACE_FIELDS, TABLE_FIELDS, resolve};
pub use dispatch::{
    DEFAULT_SEND_TIMEOUT, Dispatcher, FORWARD_KEY, ForwardTarget, INGRESS_SUFFIX, plan,
};
pub use envelope::Envelope;
pub use error::{DispatchError, EnvelopeError, PipelineError, Result};
pub use function::{InvocationReport, RouteOutcome, StageFunction, WriteOutcome};
pub use metrics::{StageMetrics, StageMetricsSnapshot};
