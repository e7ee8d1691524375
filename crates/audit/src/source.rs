//! Audit source adapters
//!
//! Three independently owned subsystems keep their own audit logs:
//!
//! | Source          | Native entry                 | Canonical categories            |
//! |-----------------|------------------------------|---------------------------------|
//! | whitelist       | [`WhitelistAuditEntry`]      | Whitelist, TransferValidation   |
//! | compliance      | [`ComplianceAuditEntry`]     | Compliance, Blacklist           |
//! | token issuance  | [`TokenIssuanceAuditEntry`]  | TokenIssuance                   |
//!
//! Each is read through [`AuditSource::read_audit_log`] with a
//! [`SourceFilter`] and returns every matching entry (no paging).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::entry::{AuditSourceKind, EnterpriseAuditLogEntry};
use crate::error::AuditResult;

// === Whitelist ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum WhitelistAction {
    Add,
    Update,
    Remove,
    Approve,
    Revoke,
    Suspend,
    Expire,
    TransferValidation,
}

impl WhitelistAction {
    pub fn is_transfer_validation(&self) -> bool {
        matches!(self, WhitelistAction::TransferValidation)
    }
}

/// Whitelist status change or transfer validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistAuditEntry {
    pub id: String,
    pub asset_id: u64,
    #[serde(default)]
    pub network: Option<String>,
    pub action_type: WhitelistAction,
    /// Whitelisted address (sender for transfer validations)
    pub address: String,
    pub performed_by: String,
    pub performed_at: DateTime<Utc>,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub old_status: Option<String>,
    #[serde(default)]
    pub new_status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    // Transfer validation only
    #[serde(default)]
    pub to_address: Option<String>,
    #[serde(default)]
    pub transfer_allowed: Option<bool>,
    #[serde(default)]
    pub denial_reason: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

// === Compliance metadata ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum ComplianceAction {
    Create,
    Update,
    Delete,
    /// Explicit blacklist marker for writers that record one
    Blacklist,
}

/// Change to an asset's compliance metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceAuditEntry {
    pub id: String,
    pub asset_id: u64,
    #[serde(default)]
    pub network: Option<String>,
    pub action_type: ComplianceAction,
    pub performed_by: String,
    pub performed_at: DateTime<Utc>,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub old_status: Option<String>,
    #[serde(default)]
    pub new_status: Option<String>,
    /// Free text; also where blacklist operations are recognised
    #[serde(default)]
    pub notes: Option<String>,
    /// Number of metadata items touched
    #[serde(default)]
    pub item_count: Option<u32>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

// === Token issuance ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum TokenIssuanceAction {
    Deploy,
    Mint,
    BatchMint,
    Burn,
    Pause,
    Unpause,
    GrantRole,
    RevokeRole,
}

/// Token deployment, supply or role operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenIssuanceAuditEntry {
    pub id: String,
    /// Unknown until deployment succeeds
    #[serde(default)]
    pub asset_id: Option<u64>,
    #[serde(default)]
    pub network: Option<String>,
    pub action_type: TokenIssuanceAction,
    pub performed_by: String,
    pub performed_at: DateTime<Utc>,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Recipient of minted tokens or role grantee
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub role: Option<String>,
    /// Recipients in a batch mint
    #[serde(default)]
    pub item_count: Option<u32>,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Common view over source-native entries
///
/// Implemented by each native type; the canonical mapping lives in
/// [`crate::mapping`].
pub trait SourceEntry: Clone + Send + Sync + DeserializeOwned + 'static {
    const KIND: AuditSourceKind;

    fn asset_id(&self) -> Option<u64>;
    fn network(&self) -> Option<&str>;
    fn performed_by(&self) -> &str;
    fn performed_at(&self) -> DateTime<Utc>;
    fn success(&self) -> bool;
    /// Address the action was about, if the source records one
    fn affected_address(&self) -> Option<&str>;

    /// Canonical shape, not yet sealed
    fn to_canonical(&self) -> EnterpriseAuditLogEntry;
}

impl SourceEntry for WhitelistAuditEntry {
    const KIND: AuditSourceKind = AuditSourceKind::Whitelist;

    fn asset_id(&self) -> Option<u64> {
        Some(self.asset_id)
    }

    fn network(&self) -> Option<&str> {
        self.network.as_deref()
    }

    fn performed_by(&self) -> &str {
        &self.performed_by
    }

    fn performed_at(&self) -> DateTime<Utc> {
        self.performed_at
    }

    fn success(&self) -> bool {
        self.success
    }

    fn affected_address(&self) -> Option<&str> {
        Some(self.address.as_str())
    }

    fn to_canonical(&self) -> EnterpriseAuditLogEntry {
        crate::mapping::map_whitelist(self)
    }
}

impl SourceEntry for ComplianceAuditEntry {
    const KIND: AuditSourceKind = AuditSourceKind::Compliance;

    fn asset_id(&self) -> Option<u64> {
        Some(self.asset_id)
    }

    fn network(&self) -> Option<&str> {
        self.network.as_deref()
    }

    fn performed_by(&self) -> &str {
        &self.performed_by
    }

    fn performed_at(&self) -> DateTime<Utc> {
        self.performed_at
    }

    fn success(&self) -> bool {
        self.success
    }

    fn affected_address(&self) -> Option<&str> {
        None
    }

    fn to_canonical(&self) -> EnterpriseAuditLogEntry {
        crate::mapping::map_compliance(self)
    }
}

impl SourceEntry for TokenIssuanceAuditEntry {
    const KIND: AuditSourceKind = AuditSourceKind::TokenIssuance;

    fn asset_id(&self) -> Option<u64> {
        self.asset_id
    }

    fn network(&self) -> Option<&str> {
        self.network.as_deref()
    }

    fn performed_by(&self) -> &str {
        &self.performed_by
    }

    fn performed_at(&self) -> DateTime<Utc> {
        self.performed_at
    }

    fn success(&self) -> bool {
        self.success
    }

    fn affected_address(&self) -> Option<&str> {
        self.recipient.as_deref()
    }

    fn to_canonical(&self) -> EnterpriseAuditLogEntry {
        crate::mapping::map_token_issuance(self)
    }
}

/// Filter a source applies to its own log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFilter {
    pub asset_id: Option<u64>,
    pub network: Option<String>,
    pub performed_by: Option<String>,
    pub affected_address: Option<String>,
    pub success: Option<bool>,
    /// Inclusive
    pub from_date: Option<DateTime<Utc>>,
    /// Inclusive
    pub to_date: Option<DateTime<Utc>>,
}

impl SourceFilter {
    pub fn matches<E: SourceEntry>(&self, entry: &E) -> bool {
        if let Some(asset_id) = self.asset_id {
            if entry.asset_id() != Some(asset_id) {
                return false;
            }
        }
        if let Some(ref network) = self.network {
            if entry.network() != Some(network.as_str()) {
                return false;
            }
        }
        if let Some(ref performed_by) = self.performed_by {
            if entry.performed_by() != performed_by {
                return false;
            }
        }
        if let Some(ref address) = self.affected_address {
            // Hex addresses differ only in checksum casing
            if !entry
                .affected_address()
                .is_some_and(|a| a.eq_ignore_ascii_case(address))
            {
                return false;
            }
        }
        if let Some(success) = self.success {
            if entry.success() != success {
                return false;
            }
        }
        if let Some(from) = self.from_date {
            if entry.performed_at() < from {
                return false;
            }
        }
        if let Some(to) = self.to_date {
            if entry.performed_at() > to {
                return false;
            }
        }
        true
    }
}

/// One subsystem's audit log
#[async_trait]
pub trait AuditSource: Send + Sync {
    type Entry: SourceEntry;

    /// Source name for logging and error attribution
    fn name(&self) -> &str;

    /// Every entry matching `filter`, in any order
    async fn read_audit_log(&self, filter: &SourceFilter) -> AuditResult<Vec<Self::Entry>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn whitelist(id: &str, at: DateTime<Utc>) -> WhitelistAuditEntry {
        WhitelistAuditEntry {
            id: id.to_string(),
            asset_id: 42,
            network: Some("polygon".to_string()),
            action_type: WhitelistAction::Add,
            address: "0xAbC".to_string(),
            performed_by: "ops@acme".to_string(),
            performed_at: at,
            success: true,
            error_message: None,
            old_status: None,
            new_status: Some("Active".to_string()),
            notes: None,
            role: None,
            to_address: None,
            transfer_allowed: None,
            denial_reason: None,
            amount: None,
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(SourceFilter::default().matches(&whitelist("W1", Utc::now())));
    }

    #[test]
    fn test_filter_fields() {
        let now = Utc::now();
        let entry = whitelist("W1", now);

        let by_asset = SourceFilter {
            asset_id: Some(7),
            ..Default::default()
        };
        assert!(!by_asset.matches(&entry));

        let by_address = SourceFilter {
            affected_address: Some("0xabc".to_string()),
            ..Default::default()
        };
        assert!(by_address.matches(&entry));

        let by_network = SourceFilter {
            network: Some("ethereum".to_string()),
            ..Default::default()
        };
        assert!(!by_network.matches(&entry));

        let failures_only = SourceFilter {
            success: Some(false),
            ..Default::default()
        };
        assert!(!failures_only.matches(&entry));
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let now = Utc::now();
        let entry = whitelist("W1", now);

        let exact = SourceFilter {
            from_date: Some(now),
            to_date: Some(now),
            ..Default::default()
        };
        assert!(exact.matches(&entry));

        let later = SourceFilter {
            from_date: Some(now + Duration::seconds(1)),
            ..Default::default()
        };
        assert!(!later.matches(&entry));
    }

    #[test]
    fn test_address_filter_skips_sources_without_address() {
        let entry = ComplianceAuditEntry {
            id: "C1".to_string(),
            asset_id: 42,
            network: None,
            action_type: ComplianceAction::Update,
            performed_by: "compliance@acme".to_string(),
            performed_at: Utc::now(),
            success: true,
            error_message: None,
            old_status: None,
            new_status: None,
            notes: None,
            item_count: None,
            correlation_id: None,
        };
        let filter = SourceFilter {
            affected_address: Some("0xabc".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&entry));
    }

    #[test]
    fn test_action_names() {
        assert_eq!(WhitelistAction::TransferValidation.to_string(), "TransferValidation");
        assert_eq!(ComplianceAction::Create.to_string(), "Create");
        assert!(WhitelistAction::TransferValidation.is_transfer_validation());
        assert!(!WhitelistAction::Add.is_transfer_validation());
    }
}
