//! Forwarder Sink - hand events to the next processing stage
//!
//! A [`Producer`] publishes one keyed message to a topic and waits for the
//! broker's acknowledgement. The pipeline uses it to forward an event to
//! `<next-stage>-ingress` and to publish ingested envelopes.
//!
//! # Protocol
//!
//! [`TcpProducer`] opens one connection per message and writes a single
//! frame:
//!
//! ```text
//! [4 bytes: topic len (BE)][topic][4 bytes: key len (BE)][key][4 bytes: value len (BE)][value]
//! ```
//!
//! The broker answers with one byte: `0x00` accepts the message, anything
//! else rejects it. Connect, write and acknowledgement together are bounded
//! by the send timeout, and the connection is closed on every exit path.

mod memory;

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use rtdl_config::{MessagingConfig, MessagingKind};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::common::{MetricsSnapshot, SinkMetrics};

pub use memory::{MemoryProducer, SentMessage};

/// Acknowledgement byte for an accepted message
pub const ACK_OK: u8 = 0x00;

/// Errors from forwarding
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// A forward was needed but no messaging endpoint is configured
    #[error("no messaging endpoint configured")]
    MissingEndpoint,

    /// Connection failed
    #[error("connection failed to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// Write or acknowledgement read failed
    #[error("send to topic {topic} failed: {source}")]
    Send {
        topic: String,
        #[source]
        source: std::io::Error,
    },

    /// No acknowledgement within the send timeout
    #[error("send to topic {topic} timed out after {timeout:?}")]
    Timeout { topic: String, timeout: Duration },

    /// Broker answered with a non-zero acknowledgement
    #[error("broker rejected message for topic {topic} with code {code}")]
    Rejected { topic: String, code: u8 },
}

impl ForwardError {
    /// Short machine-readable kind, for reports and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingEndpoint => "missing_endpoint",
            Self::Connect { .. } => "connect",
            Self::Send { .. } => "send",
            Self::Timeout { .. } => "timeout",
            Self::Rejected { .. } => "rejected",
        }
    }
}

/// Publishes keyed messages to topics
#[async_trait]
pub trait Producer: Send + Sync {
    /// Send one message and wait for its acknowledgement
    async fn send(
        &self,
        topic: &str,
        key: &str,
        value: Bytes,
        timeout: Duration,
    ) -> Result<(), ForwardError>;

    /// Producer kind, for logs
    fn kind(&self) -> &'static str;

    /// Send counters
    fn snapshot(&self) -> MetricsSnapshot;
}

/// Build the producer described by the `[messaging]` section
///
/// Returns `None` for a TCP producer without an endpoint; forwards then
/// fail with [`ForwardError::MissingEndpoint`].
pub fn producer_from_config(config: &MessagingConfig) -> Option<Arc<dyn Producer>> {
    match config.kind {
        MessagingKind::Memory => Some(Arc::new(MemoryProducer::new())),
        MessagingKind::Tcp => config.endpoint().map(|endpoint| {
            Arc::new(TcpProducer::new(endpoint).with_connect_timeout(config.connect_timeout))
                as Arc<dyn Producer>
        }),
    }
}

/// Producer speaking the framed TCP protocol
#[derive(Debug)]
pub struct TcpProducer {
    /// Broker address (host:port)
    endpoint: String,

    /// Connection timeout, also capped by the send timeout
    connect_timeout: Duration,

    metrics: Arc<SinkMetrics>,
}

impl TcpProducer {
    /// Create a producer for `endpoint`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout: Duration::from_secs(5),
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    /// Set connection timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Broker address
    #[inline]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get reference to metrics
    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    async fn connect(&self, topic: &str, budget: Duration) -> Result<TcpStream, ForwardError> {
        let limit = self.connect_timeout.min(budget);
        let stream = match timeout(limit, TcpStream::connect(&self.endpoint)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ForwardError::Connect {
                    endpoint: self.endpoint.clone(),
                    source: e,
                });
            }
            Err(_) if limit == budget => {
                return Err(ForwardError::Timeout {
                    topic: topic.to_string(),
                    timeout: budget,
                });
            }
            Err(_) => {
                return Err(ForwardError::Connect {
                    endpoint: self.endpoint.clone(),
                    source: std::io::Error::new(ErrorKind::TimedOut, "connection timed out"),
                });
            }
        };

        // Set TCP_NODELAY for lower latency (non-fatal if it fails)
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(
                endpoint = %self.endpoint,
                error = %e,
                "failed to set TCP_NODELAY, continuing with default buffering"
            );
        }
        Ok(stream)
    }

    async fn exchange(&self, topic: &str, frame: &[u8], budget: Duration) -> Result<(), ForwardError> {
        let started = tokio::time::Instant::now();
        let mut stream = self.connect(topic, budget).await?;
        let remaining = budget.saturating_sub(started.elapsed());

        let io = async {
            stream.write_all(frame).await?;
            stream.flush().await?;
            let mut ack = [0u8; 1];
            stream.read_exact(&mut ack).await?;
            Ok::<u8, std::io::Error>(ack[0])
        };

        let result = match timeout(remaining, io).await {
            Ok(Ok(ACK_OK)) => Ok(()),
            Ok(Ok(code)) => Err(ForwardError::Rejected {
                topic: topic.to_string(),
                code,
            }),
            Ok(Err(e)) => Err(ForwardError::Send {
                topic: topic.to_string(),
                source: e,
            }),
            Err(_) => Err(ForwardError::Timeout {
                topic: topic.to_string(),
                timeout: budget,
            }),
        };

        // Half-close so the broker sees a clean end; the stream drops either way
        let _ = stream.shutdown().await;
        result
    }
}

#[async_trait]
impl Producer for TcpProducer {
    async fn send(
        &self,
        topic: &str,
        key: &str,
        value: Bytes,
        timeout: Duration,
    ) -> Result<(), ForwardError> {
        self.metrics.record_received();

        let frame = match encode_frame(topic, key, &value) {
            Ok(frame) => frame,
            Err(source) => {
                self.metrics.record_error();
                return Err(ForwardError::Send {
                    topic: topic.to_string(),
                    source,
                });
            }
        };

        let result = self.exchange(topic, &frame, timeout).await;
        match &result {
            Ok(()) => {
                self.metrics.record_written(value.len() as u64);
                tracing::debug!(
                    endpoint = %self.endpoint,
                    topic,
                    bytes = value.len(),
                    "message acknowledged"
                );
            }
            Err(ForwardError::Timeout { .. }) => self.metrics.record_timeout(),
            Err(_) => self.metrics.record_error(),
        }
        result
    }

    fn kind(&self) -> &'static str {
        "tcp"
    }

    fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Encode one message frame
pub fn encode_frame(topic: &str, key: &str, value: &[u8]) -> std::io::Result<Bytes> {
    let parts: [&[u8]; 3] = [topic.as_bytes(), key.as_bytes(), value];
    let mut buf = BytesMut::with_capacity(12 + parts.iter().map(|p| p.len()).sum::<usize>());
    for part in parts {
        let len = u32::try_from(part.len())
            .map_err(|_| std::io::Error::new(ErrorKind::InvalidInput, "frame field too large"))?;
        buf.put_u32(len);
        buf.put_slice(part);
    }
    Ok(buf.freeze())
}

#[cfg(test)]
#[path = "forwarder_test.rs"]
mod forwarder_test;
