//! Summary statistics over a filtered audit set

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{AuditCategory, EnterpriseAuditLogEntry};

/// Inclusive timestamp range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Counts over the full filtered set, not a page.
///
/// `whitelist_events` includes transfer validations, which are also
/// reported on their own, so that
/// `whitelist + blacklist + compliance + token_issuance == total_events`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogSummary {
    pub total_events: usize,
    pub whitelist_events: usize,
    pub transfer_validation_events: usize,
    pub blacklist_events: usize,
    pub compliance_events: usize,
    pub token_issuance_events: usize,
    pub successful_events: usize,
    pub failed_events: usize,
    /// Distinct, sorted
    pub networks: Vec<String>,
    /// Distinct, ascending
    pub asset_ids: Vec<u64>,
    /// `None` when there are no events
    pub date_range: Option<DateRange>,
}

impl AuditLogSummary {
    pub fn from_entries(entries: &[EnterpriseAuditLogEntry]) -> Self {
        let mut summary = Self {
            total_events: entries.len(),
            ..Default::default()
        };
        let mut networks = BTreeSet::new();
        let mut asset_ids = BTreeSet::new();

        for entry in entries {
            // Transfer validations count toward whitelist activity too
            if entry.is_whitelist_activity() {
                summary.whitelist_events += 1;
            }
            match entry.category {
                AuditCategory::Whitelist => {}
                AuditCategory::TransferValidation => summary.transfer_validation_events += 1,
                AuditCategory::Blacklist => summary.blacklist_events += 1,
                AuditCategory::Compliance => summary.compliance_events += 1,
                AuditCategory::TokenIssuance => summary.token_issuance_events += 1,
            }

            if entry.success {
                summary.successful_events += 1;
            } else {
                summary.failed_events += 1;
            }

            if let Some(ref network) = entry.network {
                networks.insert(network.clone());
            }
            if let Some(asset_id) = entry.asset_id {
                asset_ids.insert(asset_id);
            }

            summary.date_range = Some(match summary.date_range {
                None => DateRange {
                    from: entry.performed_at,
                    to: entry.performed_at,
                },
                Some(range) => DateRange {
                    from: range.from.min(entry.performed_at),
                    to: range.to.max(entry.performed_at),
                },
            });
        }

        summary.networks = networks.into_iter().collect();
        summary.asset_ids = asset_ids.into_iter().collect();
        summary
    }

    /// Category counts partition the total
    pub fn reconciles(&self) -> bool {
        self.whitelist_events
            + self.blacklist_events
            + self.compliance_events
            + self.token_issuance_events
            == self.total_events
            && self.successful_events + self.failed_events == self.total_events
    }
}
