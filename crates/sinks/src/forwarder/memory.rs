//! Recording producer for tests and dry runs

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use super::{ForwardError, Producer};
use crate::common::{MetricsSnapshot, SinkMetrics};

/// One message captured by [`MemoryProducer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub topic: String,
    pub key: String,
    pub value: Bytes,
}

/// Producer that records every message instead of sending it
#[derive(Debug, Default)]
pub struct MemoryProducer {
    sent: Mutex<Vec<SentMessage>>,
    failing: AtomicBool,
    metrics: SinkMetrics,
}

impl MemoryProducer {
    /// Create an empty producer
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Messages accepted so far, in send order
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    /// Messages accepted for `topic`
    pub fn sent_to(&self, topic: &str) -> Vec<SentMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Producer for MemoryProducer {
    async fn send(
        &self,
        topic: &str,
        key: &str,
        value: Bytes,
        _timeout: Duration,
    ) -> Result<(), ForwardError> {
        self.metrics.record_received();
        if self.failing.load(Ordering::Relaxed) {
            self.metrics.record_error();
            return Err(ForwardError::Rejected {
                topic: topic.to_string(),
                code: 1,
            });
        }

        self.metrics.record_written(value.len() as u64);
        self.sent.lock().push(SentMessage {
            topic: topic.to_string(),
            key: key.to_string(),
            value,
        });
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }

    fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
