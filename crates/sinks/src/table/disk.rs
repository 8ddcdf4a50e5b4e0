//! Disk table store
//!
//! Layout:
//!
//! ```text
//! <base>/<segment>/.../_commits/00000000000000000001.json
//!                               00000000000000000002.json
//! ```
//!
//! A commit is staged under a unique temporary name and then hard-linked to
//! its version name. Linking fails if the version already exists, so a
//! writer that loses a race moves on to the next version and nothing is
//! ever overwritten. Readers never see a partially written commit.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{Result, TableStore, WriteError};

const COMMITS_DIR: &str = "_commits";
const COMMIT_EXT: &str = "json";

/// Versioned commit files under a base directory
#[derive(Debug)]
pub struct DiskTableStore {
    base: PathBuf,
    max_attempts: usize,
    staging_seq: AtomicU64,
}

impl DiskTableStore {
    /// Create a store rooted at `base`
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            max_attempts: 16,
            staging_seq: AtomicU64::new(0),
        }
    }

    /// Set how many versions an append may try before giving up
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Base directory
    #[inline]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Directory holding the commits of `path`
    fn commits_dir(&self, path: &str) -> PathBuf {
        let mut dir = self.base.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            dir.push(sanitize_segment(segment));
        }
        dir.push(COMMITS_DIR);
        dir
    }

    /// Committed versions in ascending order
    async fn versions(&self, dir: &Path, path: &str) -> Result<Vec<u64>> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(WriteError::io(path, e)),
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| WriteError::io(path, e))?
        {
            if let Some(version) = parse_commit_name(&entry.file_name().to_string_lossy()) {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    async fn stage(&self, dir: &Path, path: &str, payload: &[u8]) -> Result<PathBuf> {
        let seq = self.staging_seq.fetch_add(1, Ordering::Relaxed);
        let staged = dir.join(format!(".staging-{}-{seq}", std::process::id()));

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staged)
            .await
            .map_err(|e| WriteError::io(path, e))?;
        let written = async {
            file.write_all(payload).await?;
            file.sync_all().await
        }
        .await;
        if let Err(e) = written {
            let _ = fs::remove_file(&staged).await;
            return Err(WriteError::io(path, e));
        }
        Ok(staged)
    }
}

#[async_trait]
impl TableStore for DiskTableStore {
    async fn append(&self, path: &str, payload: Bytes) -> Result<u64> {
        let dir = self.commits_dir(path);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| WriteError::io(path, e))?;

        let mut next = self.versions(&dir, path).await?.last().map_or(1, |v| v + 1);
        let staged = self.stage(&dir, path, &payload).await?;

        let mut outcome = Err(WriteError::Conflict {
            path: path.to_string(),
            attempts: self.max_attempts,
        });
        for _ in 0..self.max_attempts {
            match fs::hard_link(&staged, dir.join(commit_name(next))).await {
                Ok(()) => {
                    outcome = Ok(next);
                    break;
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(path, version = next, "version already claimed, retrying");
                    next += 1;
                }
                Err(e) => {
                    outcome = Err(WriteError::io(path, e));
                    break;
                }
            }
        }

        if let Err(e) = fs::remove_file(&staged).await {
            tracing::debug!(path, error = %e, "failed to remove staged commit");
        }
        outcome
    }

    async fn read(&self, path: &str) -> Result<Vec<Bytes>> {
        let dir = self.commits_dir(path);
        let mut records = Vec::new();
        for version in self.versions(&dir, path).await? {
            let data = fs::read(dir.join(commit_name(version)))
                .await
                .map_err(|e| WriteError::io(path, e))?;
            records.push(Bytes::from(data));
        }
        Ok(records)
    }

    async fn count(&self, path: &str) -> Result<usize> {
        Ok(self.versions(&self.commits_dir(path), path).await?.len())
    }

    fn kind(&self) -> &'static str {
        "disk"
    }
}

fn commit_name(version: u64) -> String {
    format!("{version:020}.{COMMIT_EXT}")
}

fn parse_commit_name(name: &str) -> Option<u64> {
    let stem = name.strip_suffix(COMMIT_EXT)?.strip_suffix('.')?;
    if stem.len() != 20 || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Make one path segment safe to use as a directory name
///
/// Keeps ASCII alphanumerics, `-`, `_` and `.`; anything else becomes `_`.
/// The special names `.` and `..` become `_` as well, as does the commit
/// directory name so a table can never collide with it.
fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.chars().all(|c| c == '.') || cleaned == COMMITS_DIR {
        format!("_{cleaned}").replace('.', "_")
    } else {
        cleaned
    }
}
