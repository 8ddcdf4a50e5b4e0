//! Tests for producers
//!
//! The TCP producer is exercised against a mock broker on a local listener.

use std::time::Duration;

use bytes::Bytes;
use rtdl_config::{MessagingConfig, MessagingKind};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::*;

// =============================================================================
// Frame tests
// =============================================================================

#[test]
fn test_encode_frame_layout() {
    let frame = encode_frame("enricher-ingress", "message", b"{}").unwrap();

    let mut expected = Vec::new();
    expected.extend_from_slice(&16u32.to_be_bytes());
    expected.extend_from_slice(b"enricher-ingress");
    expected.extend_from_slice(&7u32.to_be_bytes());
    expected.extend_from_slice(b"message");
    expected.extend_from_slice(&2u32.to_be_bytes());
    expected.extend_from_slice(b"{}");

    assert_eq!(&frame[..], &expected[..]);
}

#[test]
fn test_encode_frame_empty_fields() {
    let frame = encode_frame("", "", b"").unwrap();
    assert_eq!(&frame[..], &[0u8; 12][..]);
}

// =============================================================================
// Mock broker
// =============================================================================

/// Read one frame from the socket
async fn read_frame(socket: &mut TcpStream) -> (String, String, Vec<u8>) {
    let mut fields = Vec::new();
    for _ in 0..3 {
        let mut len_buf = [0u8; 4];
        socket.read_exact(&mut len_buf).await.expect("read length");
        let mut buf = vec![0u8; u32::from_be_bytes(len_buf) as usize];
        socket.read_exact(&mut buf).await.expect("read field");
        fields.push(buf);
    }
    let value = fields.pop().unwrap();
    let key = String::from_utf8(fields.pop().unwrap()).unwrap();
    let topic = String::from_utf8(fields.pop().unwrap()).unwrap();
    (topic, key, value)
}

/// Accept one connection, read one frame, reply with `ack`
async fn mock_broker(ack: u8) -> (String, tokio::task::JoinHandle<(String, String, Vec<u8>)>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().expect("failed to get addr");

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("failed to accept");
        let frame = read_frame(&mut socket).await;
        socket.write_all(&[ack]).await.expect("write ack");
        frame
    });

    (addr.to_string(), handle)
}

// =============================================================================
// TcpProducer tests
// =============================================================================

#[tokio::test]
async fn test_tcp_send_acknowledged() {
    let (endpoint, broker) = mock_broker(ACK_OK).await;
    let producer = TcpProducer::new(endpoint);

    producer
        .send(
            "enricher-ingress",
            "message",
            Bytes::from_static(b"{\"stream_id\":\"s1\"}"),
            Duration::from_secs(5),
        )
        .await
        .expect("send");

    let (topic, key, value) = broker.await.expect("broker task failed");
    assert_eq!(topic, "enricher-ingress");
    assert_eq!(key, "message");
    assert_eq!(value, b"{\"stream_id\":\"s1\"}");

    let snapshot = producer.snapshot();
    assert_eq!(snapshot.records_received, 1);
    assert_eq!(snapshot.records_written, 1);
    assert_eq!(snapshot.write_errors, 0);
}

#[tokio::test]
async fn test_tcp_send_rejected() {
    let (endpoint, broker) = mock_broker(0x02).await;
    let producer = TcpProducer::new(endpoint);

    let err = producer
        .send("t", "message", Bytes::from_static(b"{}"), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ForwardError::Rejected { code: 0x02, .. }));
    assert_eq!(err.kind(), "rejected");
    broker.await.expect("broker task failed");
    assert_eq!(producer.snapshot().write_errors, 1);
}

#[tokio::test]
async fn test_tcp_send_times_out_without_ack() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Accept and read but never acknowledge
    let broker = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_frame(&mut socket).await;
        let mut rest = Vec::new();
        // Returns once the producer closes its side
        let _ = socket.read_to_end(&mut rest).await;
    });

    let producer = TcpProducer::new(addr.to_string());
    let err = producer
        .send("t", "message", Bytes::from_static(b"{}"), Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, ForwardError::Timeout { .. }));

    // Connection was released, so the broker sees EOF and finishes
    tokio::time::timeout(Duration::from_secs(5), broker)
        .await
        .expect("connection not released")
        .unwrap();

    let snapshot = producer.snapshot();
    assert_eq!(snapshot.timeouts, 1);
    assert_eq!(snapshot.write_errors, 1);
}

#[tokio::test]
async fn test_tcp_send_broker_closes_without_ack() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let broker = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_frame(&mut socket).await;
        drop(socket);
    });

    let producer = TcpProducer::new(addr.to_string());
    let err = producer
        .send("t", "message", Bytes::from_static(b"{}"), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ForwardError::Send { .. }));
    broker.await.unwrap();
}

#[tokio::test]
async fn test_tcp_connect_refused() {
    // Bind then drop to get a port nobody listens on
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let producer = TcpProducer::new(addr.to_string()).with_connect_timeout(Duration::from_secs(1));
    let err = producer
        .send("t", "message", Bytes::from_static(b"{}"), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ForwardError::Connect { .. }));
    assert!(err.to_string().contains(&addr.to_string()));
}

#[tokio::test]
async fn test_tcp_one_connection_per_send() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let broker = tokio::spawn(async move {
        let mut topics = Vec::new();
        for _ in 0..2 {
            let (mut socket, _) = listener.accept().await.unwrap();
            let (topic, _, _) = read_frame(&mut socket).await;
            socket.write_all(&[ACK_OK]).await.unwrap();
            topics.push(topic);
        }
        topics
    });

    let producer = TcpProducer::new(addr.to_string());
    for topic in ["a", "b"] {
        producer
            .send(topic, "message", Bytes::from_static(b"{}"), Duration::from_secs(5))
            .await
            .unwrap();
    }

    assert_eq!(broker.await.unwrap(), vec!["a".to_string(), "b".to_string()]);
}

// =============================================================================
// MemoryProducer tests
// =============================================================================

#[tokio::test]
async fn test_memory_producer_records() {
    let producer = MemoryProducer::new();
    producer
        .send("a", "message", Bytes::from_static(b"1"), Duration::from_secs(1))
        .await
        .unwrap();
    producer
        .send("b", "message", Bytes::from_static(b"2"), Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(producer.sent().len(), 2);
    let to_b = producer.sent_to("b");
    assert_eq!(to_b.len(), 1);
    assert_eq!(to_b[0].value, Bytes::from_static(b"2"));
    assert_eq!(producer.snapshot().records_written, 2);
}

#[tokio::test]
async fn test_memory_producer_failure_injection() {
    let producer = MemoryProducer::new();
    producer.set_failing(true);

    let err = producer
        .send("a", "message", Bytes::from_static(b"1"), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ForwardError::Rejected { .. }));
    assert!(producer.sent().is_empty());
    assert_eq!(producer.snapshot().write_errors, 1);
}

// =============================================================================
// Config tests
// =============================================================================

#[test]
fn test_producer_from_config() {
    let tcp_without_endpoint = MessagingConfig::default();
    assert!(producer_from_config(&tcp_without_endpoint).is_none());

    let tcp = MessagingConfig {
        endpoint: Some("broker:9092".into()),
        ..MessagingConfig::default()
    };
    assert_eq!(producer_from_config(&tcp).unwrap().kind(), "tcp");

    let memory = MessagingConfig {
        kind: MessagingKind::Memory,
        ..MessagingConfig::default()
    };
    assert_eq!(producer_from_config(&memory).unwrap().kind(), "memory");
}

// =============================================================================
// Error tests
// =============================================================================

#[test]
fn test_error_display() {
    let err = ForwardError::MissingEndpoint;
    assert!(err.to_string().contains("no messaging endpoint"));
    assert_eq!(err.kind(), "missing_endpoint");

    let err = ForwardError::Timeout {
        topic: "enricher-ingress".into(),
        timeout: Duration::from_secs(10),
    };
    assert!(err.to_string().contains("enricher-ingress"));
    assert!(err.to_string().contains("timed out"));
}
