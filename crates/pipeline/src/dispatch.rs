//! Dispatcher - forward an event to the next stage of its chain
//!
//! ```text
//! matched rule ──► stage list ──► position of this stage ──► next stage
//!                                                              │
//!                              "<next>-ingress", key "message" ◄┘
//! ```
//!
//! | Situation | Outcome |
//! |-----------|---------|
//! | no rule, or rule without stages | terminal |
//! | this stage is last | terminal |
//! | this stage not in the chain | [`RouteIntegrityError::StageNotInChain`] |
//! | next stage exists | send to `<next>-ingress` |

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rtdl_routing::{NextStage, RouteIntegrityError, RoutingRule};
use rtdl_sinks::forwarder::{ForwardError, Producer};
use serde::Serialize;

use crate::error::DispatchError;

/// Suffix appended to a stage name to form its inbound topic
pub const INGRESS_SUFFIX: &str = "-ingress";

/// Key of every forwarded message
pub const FORWARD_KEY: &str = "message";

/// Default acknowledgement deadline for a forward
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Where an event is forwarded to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardTarget {
    /// Name of the next stage
    pub stage: String,
    /// Topic the next stage consumes
    pub topic: String,
}

impl ForwardTarget {
    /// Target for `stage`, consuming `<stage>-ingress`
    pub fn new(stage: impl Into<String>) -> Self {
        let stage = stage.into();
        let topic = format!("{stage}{INGRESS_SUFFIX}");
        Self { stage, topic }
    }
}

/// Decide where an event goes after `current_stage`
///
/// `Ok(None)` means the event ends here.
///
/// # Errors
///
/// Returns [`RouteIntegrityError::StageNotInChain`] when the rule has a
/// chain that does not contain `current_stage`.
pub fn plan(
    matched: Option<&RoutingRule>,
    current_stage: &str,
) -> Result<Option<ForwardTarget>, RouteIntegrityError> {
    let Some(stages) = matched.and_then(RoutingRule::stages) else {
        return Ok(None);
    };

    match stages.next_after(current_stage) {
        NextStage::Next(next) => Ok(Some(ForwardTarget::new(next))),
        NextStage::Last => Ok(None),
        NextStage::Missing => Err(RouteIntegrityError::StageNotInChain {
            stage: current_stage.to_string(),
            chain: stages.to_string(),
        }),
    }
}

/// Sends events to the next stage of their matched chain
pub struct Dispatcher {
    stage: String,
    producer: Option<Arc<dyn Producer>>,
    send_timeout: Duration,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("stage", &self.stage)
            .field("producer", &self.producer.as_ref().map(|p| p.kind()))
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher for the stage named `stage`
    ///
    /// Without a producer every needed forward fails with
    /// [`ForwardError::MissingEndpoint`].
    pub fn new(stage: impl Into<String>, producer: Option<Arc<dyn Producer>>) -> Self {
        Self {
            stage: stage.into(),
            producer,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Set the acknowledgement deadline
    #[must_use]
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Name of the running stage
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Producer used for forwards, if configured
    pub fn producer(&self) -> Option<&Arc<dyn Producer>> {
        self.producer.as_ref()
    }

    /// Forward `payload` according to `matched`
    ///
    /// Returns the target the event was sent to, or `None` if the event
    /// ends at this stage.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Integrity`] for a chain without this stage
    /// and [`DispatchError::Forward`] when the send fails.
    pub async fn dispatch(
        &self,
        matched: Option<&RoutingRule>,
        payload: Bytes,
    ) -> Result<Option<ForwardTarget>, DispatchError> {
        let Some(target) = plan(matched, &self.stage)? else {
            return Ok(None);
        };

        let Some(producer) = &self.producer else {
            return Err(DispatchError::Forward {
                target,
                source: ForwardError::MissingEndpoint,
            });
        };

        match producer
            .send(&target.topic, FORWARD_KEY, payload, self.send_timeout)
            .await
        {
            Ok(()) => {
                tracing::debug!(stage = %self.stage, next = %target.stage, topic = %target.topic, "event forwarded");
                Ok(Some(target))
            }
            Err(source) => Err(DispatchError::Forward { target, source }),
        }
    }
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod dispatch_test;
