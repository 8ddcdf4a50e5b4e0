//! Rule sources
//!
//! A source produces the full list of rules on every call to `load()`.
//! Bad records are reported next to the good ones, never failing the load.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::ConfigLoadError;
use crate::rule::{RoutingRule, RuleRecord};

/// Outcome of reading a rule source
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Active, valid rules in load order
    pub rules: Vec<RoutingRule>,
    /// Records that could not be loaded
    pub skipped: Vec<ConfigLoadError>,
    /// Valid records excluded because `active` is false
    pub inactive: usize,
}

/// Where routing rules come from
pub trait RuleSource: Send + Sync {
    /// Read every rule record
    ///
    /// # Errors
    ///
    /// Returns an error only when the source as a whole cannot be listed;
    /// individual bad records go to [`LoadReport::skipped`].
    fn load(&self) -> Result<LoadReport, ConfigLoadError>;

    /// Human readable location, for logs
    fn describe(&self) -> String;
}

/// Directory of `*.json` rule records, one rule per file
///
/// Files are loaded in file-name order so ties between rules resolve the
/// same way on every reload. A missing directory yields an empty set.
#[derive(Debug, Clone)]
pub struct DirectoryRuleSource {
    dir: PathBuf,
}

impl DirectoryRuleSource {
    /// Create a source reading from `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory being read
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_paths(&self) -> Result<Vec<PathBuf>, ConfigLoadError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| ConfigLoadError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ConfigLoadError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(paths)
    }
}

fn load_record(path: &Path) -> Result<RoutingRule, ConfigLoadError> {
    let bytes = fs::read(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let record: RuleRecord =
        serde_json::from_slice(&bytes).map_err(|source| ConfigLoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    record
        .into_rule(name)
        .map_err(|source| ConfigLoadError::Invalid {
            path: path.to_path_buf(),
            source,
        })
}

impl RuleSource for DirectoryRuleSource {
    fn load(&self) -> Result<LoadReport, ConfigLoadError> {
        let paths = match self.record_paths() {
            Ok(paths) => paths,
            Err(ConfigLoadError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(dir = %self.dir.display(), "rule directory not found, using empty rule set");
                return Ok(LoadReport::default());
            }
            Err(e) => return Err(e),
        };

        let mut report = LoadReport::default();
        for path in paths {
            match load_record(&path) {
                Ok(rule) if rule.is_active() => report.rules.push(rule),
                Ok(_) => report.inactive += 1,
                Err(e) => report.skipped.push(e),
            }
        }
        Ok(report)
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// In-memory rule source, for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryRuleSource {
    rules: Mutex<Vec<RoutingRule>>,
}

impl MemoryRuleSource {
    /// Create a source holding `rules`
    pub fn new(rules: Vec<RoutingRule>) -> Self {
        Self {
            rules: Mutex::new(rules),
        }
    }

    /// Replace the rules returned by the next `load()`
    pub fn set(&self, rules: Vec<RoutingRule>) {
        *self.rules.lock() = rules;
    }
}

impl RuleSource for MemoryRuleSource {
    fn load(&self) -> Result<LoadReport, ConfigLoadError> {
        let rules = self.rules.lock();
        let mut report = LoadReport::default();
        for rule in rules.iter() {
            if !rule.is_active() {
                report.inactive += 1;
                continue;
            }
            match rule.validate() {
                Ok(()) => report.rules.push(rule.clone()),
                Err(source) => report.skipped.push(ConfigLoadError::Invalid {
                    path: PathBuf::from(rule.source()),
                    source,
                }),
            }
        }
        Ok(report)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdentityField;
    use crate::RoutingError;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) {
        fs::write(dir.path().join(name), body).unwrap();
    }

    #[test]
    fn test_directory_loads_in_file_name_order() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.json", r#"{"stream_id": "s1", "stages": "deltawriter,sink"}"#);
        write(&dir, "a.json", r#"{"stream_id": "s1"}"#);
        write(&dir, "c.json", r#"{"project_id": "p1"}"#);

        let report = DirectoryRuleSource::new(dir.path()).load().unwrap();
        let names: Vec<_> = report.rules.iter().map(|r| r.source()).collect();
        assert_eq!(names, vec!["a.json", "b.json", "c.json"]);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_directory_skips_bad_records() {
        let dir = TempDir::new().unwrap();
        write(&dir, "good.json", r#"{"stream_id": "s1"}"#);
        write(&dir, "broken.json", "{not json");
        write(&dir, "invalid.json", r#"{"stages": "deltawriter"}"#);
        write(&dir, "dupes.json", r#"{"stream_id": "s2", "stages": "a,a"}"#);

        let report = DirectoryRuleSource::new(dir.path()).load().unwrap();
        assert_eq!(report.rules.len(), 1);
        assert_eq!(report.skipped.len(), 3);
        assert!(
            report
                .skipped
                .iter()
                .any(|e| matches!(e, ConfigLoadError::Json { .. }))
        );
        assert!(report.skipped.iter().any(|e| matches!(
            e,
            ConfigLoadError::Invalid {
                source: RoutingError::NoIdentity,
                ..
            }
        )));
    }

    #[test]
    fn test_directory_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "rule.json", r#"{"stream_id": "s1"}"#);
        write(&dir, "README.md", "not a rule");
        write(&dir, "rule.json.bak", "{}");
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let report = DirectoryRuleSource::new(dir.path()).load().unwrap();
        assert_eq!(report.rules.len(), 1);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_directory_excludes_inactive() {
        let dir = TempDir::new().unwrap();
        write(&dir, "on.json", r#"{"stream_id": "s1", "active": true}"#);
        write(&dir, "off.json", r#"{"stream_id": "s2", "active": false}"#);

        let report = DirectoryRuleSource::new(dir.path()).load().unwrap();
        assert_eq!(report.rules.len(), 1);
        assert_eq!(report.inactive, 1);
        assert_eq!(
            report.rules[0].identity(IdentityField::StreamId),
            Some("s1")
        );
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let source = DirectoryRuleSource::new(dir.path().join("missing"));
        let report = source.load().unwrap();
        assert!(report.rules.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_memory_source_set_and_filter() {
        let source = MemoryRuleSource::default();
        assert!(source.load().unwrap().rules.is_empty());

        source.set(vec![
            RoutingRule::new("a").with_identity(IdentityField::StreamId, "s1"),
            RoutingRule::new("b")
                .with_identity(IdentityField::StreamId, "s2")
                .with_active(false),
            RoutingRule::new("c").with_stages("x".parse().unwrap()),
        ]);
        let report = source.load().unwrap();
        assert_eq!(report.rules.len(), 1);
        assert_eq!(report.inactive, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(source.describe(), "memory");
    }
}
