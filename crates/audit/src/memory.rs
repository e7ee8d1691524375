//! In-memory audit source

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{AuditError, AuditResult};
use crate::source::{AuditSource, SourceEntry, SourceFilter};

/// Audit log held in memory, for tests and demos
pub struct InMemoryAuditSource<E> {
    name: String,
    entries: RwLock<Vec<E>>,
    offline: AtomicBool,
}

impl<E: SourceEntry> InMemoryAuditSource<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_entries(name, Vec::new())
    }

    pub fn with_entries(name: impl Into<String>, entries: Vec<E>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(entries),
            offline: AtomicBool::new(false),
        }
    }

    pub async fn record(&self, entry: E) {
        self.entries.write().await.push(entry);
    }

    /// While offline every read fails with `AuditError::Upstream`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl<E: SourceEntry> AuditSource for InMemoryAuditSource<E> {
    type Entry = E;

    fn name(&self) -> &str {
        &self.name
    }

    async fn read_audit_log(&self, filter: &SourceFilter) -> AuditResult<Vec<E>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuditError::upstream(&self.name, "source offline"));
        }

        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|entry| filter.matches(*entry))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{TokenIssuanceAction, TokenIssuanceAuditEntry};
    use chrono::Utc;

    fn burn(id: &str, asset_id: u64) -> TokenIssuanceAuditEntry {
        TokenIssuanceAuditEntry {
            id: id.to_string(),
            asset_id: Some(asset_id),
            network: None,
            action_type: TokenIssuanceAction::Burn,
            performed_by: "issuer@acme".to_string(),
            performed_at: Utc::now(),
            success: true,
            error_message: None,
            recipient: None,
            amount: None,
            role: None,
            item_count: None,
            correlation_id: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_read_applies_filter() {
        let source = InMemoryAuditSource::new("token_issuance");
        source.record(burn("T1", 1)).await;
        source.record(burn("T2", 2)).await;

        let filter = SourceFilter {
            asset_id: Some(2),
            ..Default::default()
        };
        let entries = source.read_audit_log(&filter).await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "T2");
        assert_eq!(source.len().await, 2);
    }

    #[tokio::test]
    async fn test_offline_source_fails() {
        let source: InMemoryAuditSource<TokenIssuanceAuditEntry> =
            InMemoryAuditSource::new("token_issuance");
        source.set_offline(true);

        let err = source
            .read_audit_log(&SourceFilter::default())
            .await
            .unwrap_err();
        assert!(err.is_upstream());
    }
}
