//! Stage function - one invocation of the delta-writer stage
//!
//! ```text
//! bytes ─► parse ─► control? ──yes──► reload rules, stop
//!                      │no
//!                      ▼
//!                   resolve ─► mask (opt) ─► append ─► match ─► dispatch
//! ```
//!
//! Only a parse failure aborts the invocation. Write and forward failures
//! are logged, counted, and reported in the returned
//! [`InvocationReport`]; a failed write does not stop the dispatch.

use std::sync::Arc;

use bytes::Bytes;
use rtdl_config::Config;
use rtdl_routing::{RoutingRule, RuleStore};
use rtdl_sinks::forwarder::{Producer, producer_from_config};
use rtdl_sinks::table::{Destination, TableWriter, WriteReceipt};
use rtdl_transform::PiiMasker;
use serde::Serialize;
use serde_json::Value;

use crate::control::ControlHandler;
use crate::destination::resolve;
use crate::dispatch::{Dispatcher, ForwardTarget};
use crate::envelope::json_kind;
use crate::error::{DispatchError, PipelineError, Result};
use crate::metrics::StageMetrics;

/// What one invocation did
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InvocationReport {
    /// The event was a control signal; rules were reloaded
    Control {
        code: String,
        generation: u64,
    },

    /// The event was written and routed
    Processed {
        destination: Destination,
        masked: bool,
        write: WriteOutcome,
        route: RouteOutcome,
    },
}

/// Result of the table append
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WriteOutcome {
    Committed(WriteReceipt),
    Failed { kind: &'static str, error: String },
}

/// Result of matching and dispatch
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteOutcome {
    /// No rule matched the event
    Unmatched,
    /// A rule matched and the event ends here
    Terminal { rule: String },
    /// The event was sent to the next stage
    Forwarded { rule: String, target: ForwardTarget },
    /// The chain was inconsistent or the send failed
    Failed {
        rule: Option<String>,
        kind: &'static str,
        error: String,
        target: Option<ForwardTarget>,
    },
}

/// The delta-writer stage
pub struct StageFunction {
    control: ControlHandler,
    writer: TableWriter,
    dispatcher: Dispatcher,
    masker: Option<PiiMasker>,
    metrics: Arc<StageMetrics>,
}

impl std::fmt::Debug for StageFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageFunction")
            .field("stage", &self.dispatcher.stage())
            .field("control_code", &self.control.code())
            .field("writer", &self.writer)
            .field("masking", &self.masker.is_some())
            .finish()
    }
}

impl StageFunction {
    /// Assemble a stage from its parts
    pub fn new(control: ControlHandler, writer: TableWriter, dispatcher: Dispatcher) -> Self {
        Self {
            control,
            writer,
            dispatcher,
            masker: None,
            metrics: Arc::new(StageMetrics::new()),
        }
    }

    /// Build the stage described by `config` over an existing rule store
    pub fn from_config(config: &Config, store: Arc<RuleStore>) -> Self {
        let producer = producer_from_config(&config.messaging);
        Self::from_config_with_producer(config, store, producer)
    }

    /// Like [`StageFunction::from_config`] with an explicit producer
    pub fn from_config_with_producer(
        config: &Config,
        store: Arc<RuleStore>,
        producer: Option<Arc<dyn Producer>>,
    ) -> Self {
        let control = ControlHandler::new(store, config.routing.control_code.as_str());
        let writer = TableWriter::from_config(&config.storage);
        let dispatcher = Dispatcher::new(config.stage.name.as_str(), producer)
            .with_send_timeout(config.messaging.send_timeout);
        Self::new(control, writer, dispatcher).with_masking(config.stage.mask_pii)
    }

    /// Enable or disable PII masking
    #[must_use]
    pub fn with_masking(mut self, enabled: bool) -> Self {
        self.masker = enabled.then(PiiMasker::new);
        self
    }

    /// Name of this stage
    pub fn stage(&self) -> &str {
        self.dispatcher.stage()
    }

    pub fn control(&self) -> &ControlHandler {
        &self.control
    }

    pub fn writer(&self) -> &TableWriter {
        &self.writer
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn masker(&self) -> Option<&PiiMasker> {
        self.masker.as_ref()
    }

    pub fn metrics(&self) -> &Arc<StageMetrics> {
        &self.metrics
    }

    /// Process one inbound payload
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Parse`] if `payload` is not JSON and
    /// [`PipelineError::NotAnObject`] if it is not a JSON object. Every
    /// other failure is reported in the returned [`InvocationReport`].
    pub async fn invoke(&self, payload: &[u8]) -> Result<InvocationReport> {
        self.metrics.record_received();

        let event: Value = match serde_json::from_slice(payload) {
            Ok(event) => event,
            Err(e) => {
                self.metrics.record_parse_error();
                tracing::warn!(stage = %self.stage(), error = %e, bytes = payload.len(), "rejecting unparseable event");
                return Err(PipelineError::Parse(e));
            }
        };
        if !event.is_object() {
            self.metrics.record_parse_error();
            let kind = json_kind(&event);
            tracing::warn!(stage = %self.stage(), kind, "rejecting non-object event");
            return Err(PipelineError::NotAnObject(kind));
        }

        if self.control.handle(&event).await {
            self.metrics.record_control_signal();
            return Ok(InvocationReport::Control {
                code: self.control.code().to_string(),
                generation: self.control.store().generation(),
            });
        }

        let destination = resolve(&event);
        let matched = self.control.store().match_event(&event);
        let (event, masked) = self.mask(event);
        let body = Bytes::from(event.to_string());

        let write = self.write(&destination, body.clone()).await;
        let route = self.route(matched.as_deref(), body).await;

        Ok(InvocationReport::Processed {
            destination,
            masked,
            write,
            route,
        })
    }

    fn mask(&self, event: Value) -> (Value, bool) {
        let Some(masker) = &self.masker else {
            return (event, false);
        };
        match masker.mask_event(&event) {
            Ok(Some(masked)) => {
                self.metrics.record_masked();
                (masked, true)
            }
            Ok(None) => (event, false),
            Err(e) => {
                tracing::warn!(stage = %self.stage(), error = %e, "masking failed, keeping event unmasked");
                (event, false)
            }
        }
    }

    async fn write(&self, destination: &Destination, body: Bytes) -> WriteOutcome {
        match self.writer.append(destination, body).await {
            Ok(receipt) => {
                self.metrics.record_write(true);
                WriteOutcome::Committed(receipt)
            }
            Err(e) => {
                self.metrics.record_write(false);
                tracing::error!(
                    stage = %self.stage(),
                    destination = %destination,
                    kind = e.kind(),
                    error = %e,
                    "table append failed, continuing"
                );
                WriteOutcome::Failed {
                    kind: e.kind(),
                    error: e.to_string(),
                }
            }
        }
    }

    async fn route(&self, matched: Option<&RoutingRule>, body: Bytes) -> RouteOutcome {
        let rule = matched.map(|r| r.source().to_string());

        match self.dispatcher.dispatch(matched, body).await {
            Ok(Some(target)) => {
                self.metrics.record_forwarded();
                RouteOutcome::Forwarded {
                    rule: rule.unwrap_or_default(),
                    target,
                }
            }
            Ok(None) => {
                self.metrics.record_terminal();
                match rule {
                    Some(rule) => RouteOutcome::Terminal { rule },
                    None => RouteOutcome::Unmatched,
                }
            }
            Err(DispatchError::Integrity(e)) => {
                self.metrics.record_integrity_fault();
                tracing::error!(stage = %self.stage(), rule = ?rule, error = %e, "matched chain does not contain this stage, not forwarding");
                RouteOutcome::Failed {
                    rule,
                    kind: "integrity",
                    error: e.to_string(),
                    target: None,
                }
            }
            Err(DispatchError::Forward { target, source }) => {
                self.metrics.record_forward_failed();
                tracing::error!(
                    stage = %self.stage(),
                    rule = ?rule,
                    topic = %target.topic,
                    kind = source.kind(),
                    error = %source,
                    "forward failed"
                );
                RouteOutcome::Failed {
                    rule,
                    kind: source.kind(),
                    error: source.to_string(),
                    target: Some(target),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "function_test.rs"]
mod function_test;
