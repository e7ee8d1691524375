//! Unified audit aggregator
//!
//! ```text
//!             ┌─► whitelist ──────┐
//! query ──────┼─► compliance ─────┼─► map + seal ─► filter ─► sort desc ─► page / summary
//!             └─► token issuance ─┘
//! ```
//!
//! The three reads run concurrently and are joined. Any failure fails the
//! whole request.

use std::sync::Arc;

use regledger_core::Page;

use crate::config::AuditConfig;
use crate::entry::EnterpriseAuditLogEntry;
use crate::error::{AuditError, AuditResult};
use crate::mapping::map_entry;
use crate::query::AuditLogQuery;
use crate::source::{
    AuditSource, ComplianceAuditEntry, SourceEntry, TokenIssuanceAuditEntry, WhitelistAuditEntry,
};
use crate::summary::AuditLogSummary;

pub type WhitelistSource = Arc<dyn AuditSource<Entry = WhitelistAuditEntry>>;
pub type ComplianceSource = Arc<dyn AuditSource<Entry = ComplianceAuditEntry>>;
pub type TokenIssuanceSource = Arc<dyn AuditSource<Entry = TokenIssuanceAuditEntry>>;

pub struct AuditAggregator {
    whitelist: WhitelistSource,
    compliance: ComplianceSource,
    token_issuance: TokenIssuanceSource,
    config: AuditConfig,
}

impl AuditAggregator {
    pub fn new(
        whitelist: WhitelistSource,
        compliance: ComplianceSource,
        token_issuance: TokenIssuanceSource,
        config: AuditConfig,
    ) -> Self {
        Self {
            whitelist,
            compliance,
            token_issuance,
            config,
        }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// One page of the merged view, newest first, with the pre-pagination total
    pub async fn get_audit_log(
        &self,
        query: &AuditLogQuery,
    ) -> AuditResult<Page<EnterpriseAuditLogEntry>> {
        // Reject bad paging before touching any source
        let request = self.config.page_request(query.page, query.page_size)?;
        let entries = self.collect(query).await?;
        Ok(Page::from_sorted(entries, request))
    }

    /// Statistics over the full filtered set
    pub async fn get_audit_log_summary(
        &self,
        query: &AuditLogQuery,
    ) -> AuditResult<AuditLogSummary> {
        let entries = self.collect(query).await?;
        Ok(AuditLogSummary::from_entries(&entries))
    }

    /// Full filtered view, newest first, ignoring `page`/`page_size`
    pub async fn collect(&self, query: &AuditLogQuery) -> AuditResult<Vec<EnterpriseAuditLogEntry>> {
        let (whitelist, compliance, token_issuance) = tokio::try_join!(
            self.read(self.whitelist.as_ref(), query),
            self.read(self.compliance.as_ref(), query),
            self.read(self.token_issuance.as_ref(), query),
        )?;

        let mut merged: Vec<EnterpriseAuditLogEntry> = whitelist
            .into_iter()
            .chain(compliance)
            .chain(token_issuance)
            .filter(|entry| query.matches_merged(entry))
            .collect();

        merged.sort_by(|a, b| {
            b.performed_at
                .cmp(&a.performed_at)
                .then_with(|| a.category.cmp(&b.category))
                .then_with(|| a.id.cmp(&b.id))
        });

        tracing::debug!(entries = merged.len(), "Audit view merged");
        Ok(merged)
    }

    async fn read<S>(
        &self,
        source: &S,
        query: &AuditLogQuery,
    ) -> AuditResult<Vec<EnterpriseAuditLogEntry>>
    where
        S: AuditSource + ?Sized,
    {
        let kind = <S::Entry as SourceEntry>::KIND;
        if !query.needs_source(kind) {
            return Ok(Vec::new());
        }

        let filter = query.source_filter();
        let read = source.read_audit_log(&filter);

        let result = match self.config.source_timeout() {
            Some(limit) => match tokio::time::timeout(limit, read).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(source = source.name(), timeout = ?limit, "Audit source timed out");
                    return Err(AuditError::Timeout {
                        source_name: source.name().to_string(),
                        timeout_ms: limit.as_millis() as u64,
                    });
                }
            },
            None => read.await,
        };

        let native = result.map_err(|e| {
            tracing::warn!(source = source.name(), error = %e, "Audit source failed");
            match e {
                upstream @ (AuditError::Upstream { .. } | AuditError::Timeout { .. }) => upstream,
                other => AuditError::upstream(source.name(), other.to_string()),
            }
        })?;

        tracing::debug!(source = source.name(), entries = native.len(), "Audit source read");
        Ok(native.iter().map(map_entry).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::AuditCategory;
    use crate::memory::InMemoryAuditSource;
    use crate::source::{ComplianceAction, TokenIssuanceAction, WhitelistAction};
    use chrono::{DateTime, Duration, Utc};
    use rust_decimal_macros::dec;

    fn whitelist(id: &str, action: WhitelistAction, at: DateTime<Utc>) -> WhitelistAuditEntry {
        WhitelistAuditEntry {
            id: id.to_string(),
            asset_id: 42,
            network: Some("polygon".to_string()),
            action_type: action,
            address: "0xholder".to_string(),
            performed_by: "ops@acme".to_string(),
            performed_at: at,
            success: true,
            error_message: None,
            old_status: None,
            new_status: None,
            notes: None,
            role: None,
            to_address: None,
            transfer_allowed: None,
            denial_reason: None,
            amount: None,
        }
    }

    fn compliance(id: &str, at: DateTime<Utc>, success: bool) -> ComplianceAuditEntry {
        ComplianceAuditEntry {
            id: id.to_string(),
            asset_id: 42,
            network: Some("polygon".to_string()),
            action_type: ComplianceAction::Update,
            performed_by: "compliance@acme".to_string(),
            performed_at: at,
            success,
            error_message: None,
            old_status: None,
            new_status: None,
            notes: None,
            item_count: None,
            correlation_id: None,
        }
    }

    fn mint(id: &str, at: DateTime<Utc>) -> TokenIssuanceAuditEntry {
        TokenIssuanceAuditEntry {
            id: id.to_string(),
            asset_id: Some(42),
            network: Some("polygon".to_string()),
            action_type: TokenIssuanceAction::Mint,
            performed_by: "issuer@acme".to_string(),
            performed_at: at,
            success: true,
            error_message: None,
            recipient: Some("0xholder".to_string()),
            amount: Some(dec!(1000)),
            role: None,
            item_count: None,
            correlation_id: None,
            notes: None,
        }
    }

    fn aggregator(t0: DateTime<Utc>, config: AuditConfig) -> AuditAggregator {
        let whitelist = Arc::new(InMemoryAuditSource::with_entries(
            "whitelist",
            vec![
                whitelist("W1", WhitelistAction::Add, t0),
                whitelist("W2", WhitelistAction::TransferValidation, t0 + Duration::minutes(3)),
            ],
        ));
        let compliance = Arc::new(InMemoryAuditSource::with_entries(
            "compliance",
            vec![
                compliance("C1", t0 + Duration::minutes(1), true),
                compliance("C2", t0 + Duration::minutes(4), false),
            ],
        ));
        let token = Arc::new(InMemoryAuditSource::with_entries(
            "token_issuance",
            vec![mint("T1", t0 + Duration::minutes(2))],
        ));
        AuditAggregator::new(whitelist, compliance, token, config)
    }

    #[tokio::test]
    async fn test_merged_view_newest_first() {
        let t0 = Utc::now();
        let agg = aggregator(t0, AuditConfig::default());

        let page = agg.get_audit_log(&AuditLogQuery::new()).await.unwrap();
        let ids: Vec<_> = page.items.iter().map(|e| e.id.as_str()).collect();

        assert_eq!(ids, vec!["C2", "W2", "T1", "C1", "W1"]);
        assert_eq!(page.total_count, 5);
        assert!(page.items.iter().all(|e| e.is_sealed()));
    }

    #[tokio::test]
    async fn test_category_filter_reads_one_source() {
        let t0 = Utc::now();
        let agg = aggregator(t0, AuditConfig::default());

        let page = agg
            .get_audit_log(&AuditLogQuery::new().with_category(AuditCategory::TransferValidation))
            .await
            .unwrap();

        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].id, "W2");
    }

    #[tokio::test]
    async fn test_success_and_action_filters() {
        let t0 = Utc::now();
        let agg = aggregator(t0, AuditConfig::default());

        let failures = agg
            .get_audit_log(&AuditLogQuery::new().with_success(false))
            .await
            .unwrap();
        assert_eq!(failures.total_count, 1);
        assert_eq!(failures.items[0].id, "C2");

        let mints = agg
            .get_audit_log(&AuditLogQuery::new().with_action_type("Mint"))
            .await
            .unwrap();
        assert_eq!(mints.total_count, 1);
    }

    #[tokio::test]
    async fn test_pagination_over_merged_set() {
        let t0 = Utc::now();
        let agg = aggregator(t0, AuditConfig::default());

        let page = agg
            .get_audit_log(&AuditLogQuery::new().with_page(2, 2))
            .await
            .unwrap();
        let ids: Vec<_> = page.items.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "C1"]);
        assert_eq!(page.total_count, 5);
    }

    #[tokio::test]
    async fn test_reject_mode_fails_before_fan_out() {
        let t0 = Utc::now();
        let config = AuditConfig {
            pagination: regledger_core::PaginationMode::Reject,
            ..Default::default()
        };
        let agg = aggregator(t0, config);

        let err = agg
            .get_audit_log(&AuditLogQuery::new().with_page(1, 1000))
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::Validation(_)));
    }

    #[tokio::test]
    async fn test_summary_matches_total() {
        let t0 = Utc::now();
        let agg = aggregator(t0, AuditConfig::default());
        let query = AuditLogQuery::new().for_asset(42);

        let page = agg.get_audit_log(&query).await.unwrap();
        let summary = agg.get_audit_log_summary(&query).await.unwrap();

        assert_eq!(summary.total_events, page.total_count);
        assert!(summary.reconciles());
        assert_eq!(summary.failed_events, 1);
        assert_eq!(summary.networks, vec!["polygon"]);
        assert_eq!(summary.asset_ids, vec![42]);
    }
}
