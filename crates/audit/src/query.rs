//! Audit log query
//!
//! Builder in the style of an audit query API: every criterion optional,
//! all criteria conjunctive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{AuditCategory, AuditSourceKind, EnterpriseAuditLogEntry};
use crate::source::SourceFilter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogQuery {
    pub asset_id: Option<u64>,
    pub network: Option<String>,
    pub category: Option<AuditCategory>,
    pub action_type: Option<String>,
    pub affected_address: Option<String>,
    pub performed_by: Option<String>,
    pub success: Option<bool>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    /// 1-based
    #[serde(default = "default_page")]
    pub page: u32,
    pub page_size: Option<u32>,
}

fn default_page() -> u32 {
    1
}

impl Default for AuditLogQuery {
    fn default() -> Self {
        Self {
            asset_id: None,
            network: None,
            category: None,
            action_type: None,
            affected_address: None,
            performed_by: None,
            success: None,
            from_date: None,
            to_date: None,
            page: default_page(),
            page_size: None,
        }
    }
}

impl AuditLogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_asset(mut self, asset_id: u64) -> Self {
        self.asset_id = Some(asset_id);
        self
    }

    pub fn on_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn with_category(mut self, category: AuditCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_action_type(mut self, action_type: impl Into<String>) -> Self {
        self.action_type = Some(action_type.into());
        self
    }

    pub fn affecting(mut self, address: impl Into<String>) -> Self {
        self.affected_address = Some(address.into());
        self
    }

    pub fn performed_by(mut self, actor: impl Into<String>) -> Self {
        self.performed_by = Some(actor.into());
        self
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    pub fn with_time_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from_date = Some(from);
        self.to_date = Some(to);
        self
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = Some(page_size);
        self
    }

    /// Whether `kind` has to be read at all
    pub fn needs_source(&self, kind: AuditSourceKind) -> bool {
        kind.covers(self.category)
    }

    /// Sub-filter handed to each source.
    ///
    /// Entries that record no address (compliance metadata) never match an
    /// address filter.
    pub fn source_filter(&self) -> SourceFilter {
        SourceFilter {
            asset_id: self.asset_id,
            network: self.network.clone(),
            performed_by: self.performed_by.clone(),
            affected_address: self.affected_address.clone(),
            success: self.success,
            from_date: self.from_date,
            to_date: self.to_date,
        }
    }

    /// Cross-source filters applied after merge
    pub fn matches_merged(&self, entry: &EnterpriseAuditLogEntry) -> bool {
        if let Some(category) = self.category {
            if entry.category != category {
                return false;
            }
        }
        if let Some(ref action_type) = self.action_type {
            if !entry.action_type.eq_ignore_ascii_case(action_type) {
                return false;
            }
        }
        if let Some(success) = self.success {
            if entry.success != success {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_for_category() {
        let all = AuditLogQuery::new();
        assert!(AuditSourceKind::ALL.iter().all(|k| all.needs_source(*k)));

        let blacklist = AuditLogQuery::new().with_category(AuditCategory::Blacklist);
        assert!(blacklist.needs_source(AuditSourceKind::Compliance));
        assert!(!blacklist.needs_source(AuditSourceKind::Whitelist));
        assert!(!blacklist.needs_source(AuditSourceKind::TokenIssuance));
    }

    #[test]
    fn test_source_filter_carries_address() {
        let query = AuditLogQuery::new().for_asset(42).affecting("0xabc");

        let filter = query.source_filter();
        assert_eq!(filter.affected_address.as_deref(), Some("0xabc"));
        assert_eq!(filter.asset_id, Some(42));
    }

    #[test]
    fn test_merged_filters() {
        let entry = EnterpriseAuditLogEntry::new(
            "C1",
            AuditCategory::Compliance,
            "Update",
            "compliance@acme",
            Utc::now(),
            false,
        );

        assert!(AuditLogQuery::new().matches_merged(&entry));
        assert!(AuditLogQuery::new().with_action_type("update").matches_merged(&entry));
        assert!(!AuditLogQuery::new().with_action_type("Create").matches_merged(&entry));
        assert!(!AuditLogQuery::new().with_success(true).matches_merged(&entry));
        assert!(!AuditLogQuery::new()
            .with_category(AuditCategory::Blacklist)
            .matches_merged(&entry));
    }
}
