//! JSONL audit source
//!
//! Reads a subsystem's audit export, one source-native entry per line.
//! The file is re-read on every call so appends by the owning subsystem
//! are picked up.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{AuditError, AuditResult};
use crate::source::{AuditSource, SourceEntry, SourceFilter};

pub struct JsonlAuditSource<E> {
    name: String,
    path: PathBuf,
    _entry: PhantomData<fn() -> E>,
}

impl<E: SourceEntry> JsonlAuditSource<E> {
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            path: path.as_ref().to_path_buf(),
            _entry: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(content: &str) -> AuditResult<Vec<E>> {
        let mut entries = Vec::new();

        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(line).map_err(|e| AuditError::MalformedExport {
                line: i + 1,
                message: e.to_string(),
            })?;
            entries.push(entry);
        }

        Ok(entries)
    }
}

#[async_trait]
impl<E: SourceEntry> AuditSource for JsonlAuditSource<E> {
    type Entry = E;

    fn name(&self) -> &str {
        &self.name
    }

    /// A missing export file is an empty log
    async fn read_audit_log(&self, filter: &SourceFilter) -> AuditResult<Vec<E>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(source = %self.name, path = %self.path.display(), "No audit export");
                return Ok(Vec::new());
            }
            Err(e) => return Err(AuditError::upstream(&self.name, e.to_string())),
        };

        let entries = Self::parse(&content)
            .map_err(|e| AuditError::upstream(&self.name, e.to_string()))?;

        Ok(entries
            .into_iter()
            .filter(|entry| filter.matches(entry))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ComplianceAction, ComplianceAuditEntry};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_reads_and_filters_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"id":"C1","asset_id":42,"action_type":"Create","performed_by":"a","performed_at":"2025-01-01T00:00:00Z","success":true,"notes":"blacklist 0xbad"}}"#
        )
        .unwrap();
        writeln!(file).unwrap();
        writeln!(
            file,
            r#"{{"id":"C2","asset_id":7,"action_type":"Update","performed_by":"a","performed_at":"2025-01-02T00:00:00Z","success":true}}"#
        )
        .unwrap();

        let source: JsonlAuditSource<ComplianceAuditEntry> =
            JsonlAuditSource::new("compliance", file.path());

        let all = source.read_audit_log(&SourceFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].action_type, ComplianceAction::Create);

        let filter = SourceFilter {
            asset_id: Some(7),
            ..Default::default()
        };
        let only = source.read_audit_log(&filter).await.unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].id, "C2");
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source: JsonlAuditSource<ComplianceAuditEntry> =
            JsonlAuditSource::new("compliance", dir.path().join("absent.jsonl"));

        assert!(source
            .read_audit_log(&SourceFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_malformed_line_is_upstream_failure() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{broken").unwrap();

        let source: JsonlAuditSource<ComplianceAuditEntry> =
            JsonlAuditSource::new("compliance", file.path());

        let err = source
            .read_audit_log(&SourceFilter::default())
            .await
            .unwrap_err();
        assert!(err.is_upstream());
        assert!(err.to_string().contains("line 1"));
    }
}
