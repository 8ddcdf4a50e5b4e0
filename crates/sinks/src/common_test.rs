//! Tests for common sink types

use crate::SinkMetrics;

#[test]
fn test_metrics_new() {
    let snapshot = SinkMetrics::new().snapshot();

    assert_eq!(snapshot.records_received, 0);
    assert_eq!(snapshot.records_written, 0);
    assert_eq!(snapshot.bytes_written, 0);
    assert_eq!(snapshot.write_errors, 0);
    assert_eq!(snapshot.timeouts, 0);
}

#[test]
fn test_metrics_record_written() {
    let metrics = SinkMetrics::new();

    metrics.record_received();
    metrics.record_received();
    metrics.record_written(100);
    metrics.record_written(250);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.records_received, 2);
    assert_eq!(snapshot.records_written, 2);
    assert_eq!(snapshot.bytes_written, 350);
}

#[test]
fn test_metrics_timeout_counts_as_error() {
    let metrics = SinkMetrics::new();

    metrics.record_error();
    metrics.record_timeout();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.write_errors, 2);
    assert_eq!(snapshot.timeouts, 1);
}

#[test]
fn test_metrics_default_matches_new() {
    assert_eq!(SinkMetrics::default().snapshot(), SinkMetrics::new().snapshot());
}
