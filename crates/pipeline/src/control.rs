//! Control channel
//!
//! An event whose `message_type` or `type` equals the control code
//! (case-insensitive) asks the stage to reload its routing rules. Such
//! events are consumed here: they are never masked, written or forwarded.

use std::sync::Arc;

use rtdl_routing::{ReloadSummary, RuleStore, field_str};
use serde_json::Value;

/// Fields that may carry the control code
const CODE_FIELDS: [&str; 2] = ["message_type", "type"];

/// Intercepts control signals and reloads the rule store
#[derive(Debug, Clone)]
pub struct ControlHandler {
    store: Arc<RuleStore>,
    code: String,
}

impl ControlHandler {
    /// Create a handler for `code` over `store`
    pub fn new(store: Arc<RuleStore>, code: impl Into<String>) -> Self {
        Self {
            store,
            code: code.into(),
        }
    }

    /// The control code this handler reacts to
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Rule store reloaded by this handler
    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    /// Whether `event` is a control signal
    pub fn is_control(&self, event: &Value) -> bool {
        CODE_FIELDS
            .iter()
            .filter_map(|key| field_str(event, key))
            .any(|value| value.eq_ignore_ascii_case(&self.code))
    }

    /// Handle `event` if it is a control signal
    ///
    /// Returns `true` when the event was consumed. A failed reload is
    /// logged and the previous rules stay active; the event is still
    /// consumed.
    pub async fn handle(&self, event: &Value) -> bool {
        if !self.is_control(event) {
            return false;
        }
        tracing::info!(code = %self.code, "control signal received, reloading rules");
        self.reload().await;
        true
    }

    /// Reload the rule store off the async runtime
    ///
    /// Returns `None` if the reload failed; the failure is logged.
    pub async fn reload(&self) -> Option<ReloadSummary> {
        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || store.reload()).await {
            Ok(Ok(summary)) => Some(summary),
            // RuleStore::reload already logged the source failure
            Ok(Err(_)) => None,
            Err(e) => {
                tracing::error!(error = %e, "rule reload task failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtdl_config::DEFAULT_CONTROL_CODE;
    use rtdl_routing::{IdentityField, MemoryRuleSource, RoutingRule};
    use serde_json::json;

    fn handler_with(source: Arc<MemoryRuleSource>) -> ControlHandler {
        let store = Arc::new(RuleStore::load(source).unwrap());
        ControlHandler::new(store, DEFAULT_CONTROL_CODE)
    }

    #[test]
    fn test_is_control() {
        let handler = handler_with(Arc::new(MemoryRuleSource::new(Vec::new())));

        assert!(handler.is_control(&json!({"message_type": "rtdl_205"})));
        assert!(handler.is_control(&json!({"type": "RTDL_205"})));
        assert!(handler.is_control(&json!({"type": "orders", "message_type": "Rtdl_205"})));
        assert!(!handler.is_control(&json!({"message_type": "rtdl_2050"})));
        assert!(!handler.is_control(&json!({"payload": {"message_type": "rtdl_205"}})));
        assert!(!handler.is_control(&json!({"message_type": 205})));
        assert!(!handler.is_control(&json!(["rtdl_205"])));
    }

    #[test]
    fn test_custom_code() {
        let store = Arc::new(RuleStore::new(Arc::new(MemoryRuleSource::new(Vec::new()))));
        let handler = ControlHandler::new(store, "reload_now");
        assert_eq!(handler.code(), "reload_now");
        assert!(handler.is_control(&json!({"type": "RELOAD_NOW"})));
        assert!(!handler.is_control(&json!({"type": "rtdl_205"})));
    }

    #[tokio::test]
    async fn test_handle_reloads() {
        let source = Arc::new(MemoryRuleSource::new(Vec::new()));
        let handler = handler_with(Arc::clone(&source));
        let event = json!({"stream_id": "s1"});
        assert!(handler.store().match_event(&event).is_none());

        source.set(vec![
            RoutingRule::new("r1").with_identity(IdentityField::StreamId, "s1"),
        ]);
        let before = handler.store().generation();

        assert!(handler.handle(&json!({"message_type": "rtdl_205"})).await);
        assert_eq!(handler.store().generation(), before + 1);
        assert!(handler.store().match_event(&event).is_some());
    }

    #[tokio::test]
    async fn test_handle_ignores_regular_events() {
        let handler = handler_with(Arc::new(MemoryRuleSource::new(Vec::new())));
        let before = handler.store().generation();

        assert!(!handler.handle(&json!({"stream_id": "s1", "type": "orders"})).await);
        assert_eq!(handler.store().generation(), before);
    }

    #[tokio::test]
    async fn test_reload_is_idempotent() {
        let source = Arc::new(MemoryRuleSource::new(vec![
            RoutingRule::new("r1").with_identity(IdentityField::StreamId, "s1"),
        ]));
        let handler = handler_with(source);

        let first = handler.reload().await.unwrap();
        let second = handler.reload().await.unwrap();
        assert_eq!(first.loaded, second.loaded);
        assert_eq!(second.generation, first.generation + 1);
    }
}
