//! Tests for table stores and the table writer

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rtdl_config::{StorageConfig, StorageKind};
use tempfile::TempDir;

use super::*;

// =============================================================================
// Destination tests
// =============================================================================

#[test]
fn test_destination_default_sentinels() {
    let dest = Destination::default();
    assert_eq!(dest.namespace, "rtdl_default_db");
    assert_eq!(dest.table, "rtdl_default_table");
    assert_eq!(dest.to_string(), "rtdl_default_db.rtdl_default_table");
}

#[test]
fn test_destination_path() {
    let dest = Destination::new("p1", "orders");
    assert_eq!(dest.path(None), "p1/orders");
    assert_eq!(dest.path(Some("lake/raw")), "lake/raw/p1/orders");
}

#[test]
fn test_destination_path_keeps_names_in_one_segment() {
    assert_eq!(Destination::new("a/b", "c").path(None), "a_b/c");
    assert_eq!(Destination::new("a", "b/c").path(None), "a/b_c");
    assert_eq!(Destination::new("a\\b", "c").path(Some("lake")), "lake/a_b/c");
}

// =============================================================================
// Disk store tests
// =============================================================================

#[tokio::test]
async fn test_disk_append_then_read() {
    let dir = TempDir::new().unwrap();
    let store = DiskTableStore::new(dir.path());

    let v1 = store.append("p1/orders", Bytes::from_static(b"{\"a\":1}")).await.unwrap();
    let v2 = store.append("p1/orders", Bytes::from_static(b"{\"a\":2}")).await.unwrap();
    assert_eq!((v1, v2), (1, 2));

    let records = store.read("p1/orders").await.unwrap();
    assert_eq!(records, vec![Bytes::from_static(b"{\"a\":1}"), Bytes::from_static(b"{\"a\":2}")]);
    assert_eq!(store.count("p1/orders").await.unwrap(), 2);
}

#[tokio::test]
async fn test_disk_commit_file_layout() {
    let dir = TempDir::new().unwrap();
    let store = DiskTableStore::new(dir.path());

    store.append("lake/p1/orders", Bytes::from_static(b"{}")).await.unwrap();

    let commit = dir
        .path()
        .join("lake/p1/orders/_commits/00000000000000000001.json");
    assert!(commit.is_file());

    // No staging files left behind
    let leftovers: Vec<_> = std::fs::read_dir(commit.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".staging"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_disk_read_missing_table_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = DiskTableStore::new(dir.path());
    assert!(store.read("nope/none").await.unwrap().is_empty());
    assert_eq!(store.count("nope/none").await.unwrap(), 0);
}

#[tokio::test]
async fn test_disk_tables_are_independent() {
    let dir = TempDir::new().unwrap();
    let store = DiskTableStore::new(dir.path());

    store.append("p1/a", Bytes::from_static(b"1")).await.unwrap();
    store.append("p1/b", Bytes::from_static(b"2")).await.unwrap();
    store.append("p1/b", Bytes::from_static(b"3")).await.unwrap();

    assert_eq!(store.count("p1/a").await.unwrap(), 1);
    assert_eq!(store.count("p1/b").await.unwrap(), 2);
}

#[tokio::test]
async fn test_disk_concurrent_appends_never_overwrite() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(DiskTableStore::new(dir.path()).with_max_attempts(64));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .append("p1/orders", Bytes::from(format!("{{\"n\":{i}}}")))
                    .await
            })
        })
        .collect();

    let mut versions = Vec::new();
    for task in tasks {
        versions.push(task.await.unwrap().unwrap());
    }
    versions.sort_unstable();
    versions.dedup();
    assert_eq!(versions.len(), 16);
    assert_eq!(store.count("p1/orders").await.unwrap(), 16);
}

#[tokio::test]
async fn test_disk_traversal_stays_under_base() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base");
    let store = DiskTableStore::new(&base);

    store.append("../escape/t", Bytes::from_static(b"x")).await.unwrap();

    assert!(!dir.path().join("escape").exists());
    assert_eq!(store.count("../escape/t").await.unwrap(), 1);
}

// =============================================================================
// Memory store tests
// =============================================================================

#[tokio::test]
async fn test_memory_append_and_read() {
    let store = MemoryTableStore::new();
    assert_eq!(store.append("a/b", Bytes::from_static(b"1")).await.unwrap(), 1);
    assert_eq!(store.append("a/b", Bytes::from_static(b"2")).await.unwrap(), 2);

    assert_eq!(store.read("a/b").await.unwrap().len(), 2);
    assert_eq!(store.append_count(), 2);
    assert_eq!(store.paths(), vec!["a/b".to_string()]);
}

#[tokio::test]
async fn test_memory_failure_injection() {
    let store = MemoryTableStore::new();
    store.set_failing(true);

    let err = store.append("a/b", Bytes::from_static(b"1")).await.unwrap_err();
    assert!(matches!(err, WriteError::Unavailable { .. }));
    assert_eq!(store.append_count(), 1);
    assert!(store.read("a/b").await.unwrap().is_empty());

    store.set_failing(false);
    assert!(store.append("a/b", Bytes::from_static(b"1")).await.is_ok());
}

// =============================================================================
// Writer tests
// =============================================================================

#[tokio::test]
async fn test_writer_appends_under_root_prefix() {
    let store = Arc::new(MemoryTableStore::new());
    let writer = TableWriter::new(store.clone()).with_root_prefix(Some("/lake/"));

    let receipt = writer
        .append(&Destination::new("p1", "orders"), Bytes::from_static(b"{}"))
        .await
        .unwrap();

    assert_eq!(receipt.path, "lake/p1/orders");
    assert_eq!(receipt.version, 1);
    assert_eq!(receipt.bytes, 2);
    assert!(!receipt.verified);
    assert_eq!(store.read("lake/p1/orders").await.unwrap().len(), 1);

    let snapshot = writer.metrics().snapshot();
    assert_eq!(snapshot.records_written, 1);
    assert_eq!(snapshot.bytes_written, 2);
}

#[tokio::test]
async fn test_writer_separators_cannot_cross_into_another_table() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(DiskTableStore::new(dir.path()));
    let writer = TableWriter::new(store.clone());

    writer
        .append(&Destination::new("a/b", "c"), Bytes::from_static(b"one"))
        .await
        .unwrap();
    writer
        .append(&Destination::new("a", "b/c"), Bytes::from_static(b"two"))
        .await
        .unwrap();

    assert_eq!(store.read("a_b/c").await.unwrap(), vec![Bytes::from_static(b"one")]);
    assert_eq!(store.read("a/b_c").await.unwrap(), vec![Bytes::from_static(b"two")]);
    assert!(store.read("a/b/c").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_writer_blank_root_prefix_is_ignored() {
    let writer = TableWriter::new(Arc::new(MemoryTableStore::new())).with_root_prefix(Some("//"));
    assert_eq!(writer.path_for(&Destination::new("a", "b")), "a/b");
}

#[tokio::test]
async fn test_writer_read_returns_superset_after_append() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(DiskTableStore::new(dir.path()));
    let writer = TableWriter::new(store.clone());
    let dest = Destination::new("p1", "orders");

    writer.append(&dest, Bytes::from_static(b"{\"n\":1}")).await.unwrap();
    let before = store.read("p1/orders").await.unwrap();

    writer.append(&dest, Bytes::from_static(b"{\"n\":2}")).await.unwrap();
    let after = store.read("p1/orders").await.unwrap();

    assert!(before.iter().all(|r| after.contains(r)));
    assert!(after.contains(&Bytes::from_static(b"{\"n\":2}")));
}

#[tokio::test]
async fn test_writer_verifies_when_enabled() {
    let store = Arc::new(MemoryTableStore::new());
    let writer = TableWriter::new(store).with_verify(true);

    let receipt = writer
        .append(&Destination::default(), Bytes::from_static(b"{}"))
        .await
        .unwrap();
    assert!(receipt.verified);
}

/// Store that acknowledges appends but never keeps them
struct ForgetfulStore;

#[async_trait]
impl TableStore for ForgetfulStore {
    async fn append(&self, _path: &str, _payload: Bytes) -> Result<u64> {
        Ok(1)
    }

    async fn read(&self, _path: &str) -> Result<Vec<Bytes>> {
        Ok(Vec::new())
    }

    fn kind(&self) -> &'static str {
        "forgetful"
    }
}

#[tokio::test]
async fn test_writer_verify_failure() {
    let writer = TableWriter::new(Arc::new(ForgetfulStore)).with_verify(true);

    let err = writer
        .append(&Destination::default(), Bytes::from_static(b"{}"))
        .await
        .unwrap_err();
    assert!(matches!(err, WriteError::Verify { before: 0, after: 0, .. }));
    assert_eq!(err.kind(), "verify");
    assert_eq!(writer.metrics().snapshot().write_errors, 1);
}

#[tokio::test]
async fn test_writer_store_failure_is_returned() {
    let store = Arc::new(MemoryTableStore::new());
    store.set_failing(true);
    let writer = TableWriter::new(store);

    let err = writer
        .append(&Destination::default(), Bytes::from_static(b"{}"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "unavailable");
    assert_eq!(writer.metrics().snapshot().write_errors, 1);
}

#[tokio::test]
async fn test_writer_timeout() {
    let store = Arc::new(MemoryTableStore::new());
    store.set_delay(Some(Duration::from_secs(5)));
    let writer = TableWriter::new(store).with_write_timeout(Duration::from_millis(20));

    let err = writer
        .append(&Destination::default(), Bytes::from_static(b"{}"))
        .await
        .unwrap_err();
    assert!(matches!(err, WriteError::Timeout { .. }));

    let snapshot = writer.metrics().snapshot();
    assert_eq!(snapshot.timeouts, 1);
    assert_eq!(snapshot.write_errors, 1);
}

#[test]
fn test_writer_from_config() {
    let config = StorageConfig {
        kind: StorageKind::Memory,
        root_prefix: Some("lake".into()),
        write_timeout: Duration::from_secs(3),
        verify_writes: true,
        ..StorageConfig::default()
    };
    let writer = TableWriter::from_config(&config);

    assert_eq!(writer.store().kind(), "memory");
    assert_eq!(writer.path_for(&Destination::new("a", "b")), "lake/a/b");
}

// =============================================================================
// Error tests
// =============================================================================

#[test]
fn test_error_display() {
    let err = WriteError::Timeout {
        path: "p/t".into(),
        timeout: Duration::from_secs(10),
    };
    assert!(err.to_string().contains("p/t"));
    assert!(err.to_string().contains("timed out"));

    let err = WriteError::Conflict {
        path: "p/t".into(),
        attempts: 16,
    };
    assert!(err.to_string().contains("16 attempts"));

    let err = WriteError::io("p/t", std::io::Error::other("disk full"));
    assert!(err.to_string().contains("disk full"));
    assert_eq!(err.kind(), "io");
}
