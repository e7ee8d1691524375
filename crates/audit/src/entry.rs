//! Canonical audit entry
//!
//! Every source-native entry is mapped into one [`EnterpriseAuditLogEntry`]
//! shape. The payload hash is computed once, right after mapping, and
//! stored with the entry.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::hash::calculate_payload_hash;

/// Classification of a unified audit entry
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Whitelist,
    TransferValidation,
    Compliance,
    Blacklist,
    TokenIssuance,
}

/// Subsystem that owns an audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditSourceKind {
    Whitelist,
    Compliance,
    TokenIssuance,
}

impl AuditCategory {
    /// The only source that can produce this category
    pub fn source_kind(&self) -> AuditSourceKind {
        match self {
            AuditCategory::Whitelist | AuditCategory::TransferValidation => {
                AuditSourceKind::Whitelist
            }
            AuditCategory::Compliance | AuditCategory::Blacklist => AuditSourceKind::Compliance,
            AuditCategory::TokenIssuance => AuditSourceKind::TokenIssuance,
        }
    }
}

impl AuditSourceKind {
    pub const ALL: [AuditSourceKind; 3] = [
        AuditSourceKind::Whitelist,
        AuditSourceKind::Compliance,
        AuditSourceKind::TokenIssuance,
    ];

    /// Whether a read of this source is needed for `category` (`None` = all)
    pub fn covers(&self, category: Option<AuditCategory>) -> bool {
        category.map_or(true, |c| c.source_kind() == *self)
    }
}

/// Source-agnostic audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterpriseAuditLogEntry {
    /// Carried through from the source system
    pub id: String,
    pub category: AuditCategory,
    pub action_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    pub performed_by: String,
    pub performed_at: DateTime<Utc>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    // === Sparse payload ===
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_allowed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denial_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// SHA-256 over the canonical fields, hex encoded
    #[serde(default)]
    pub payload_hash: String,
}

impl EnterpriseAuditLogEntry {
    /// Entry with the mandatory fields and an empty payload; call [`Self::seal`] last
    pub fn new(
        id: impl Into<String>,
        category: AuditCategory,
        action_type: impl Into<String>,
        performed_by: impl Into<String>,
        performed_at: DateTime<Utc>,
        success: bool,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            action_type: action_type.into(),
            asset_id: None,
            network: None,
            performed_by: performed_by.into(),
            performed_at,
            success,
            error_message: None,
            affected_address: None,
            to_address: None,
            old_status: None,
            new_status: None,
            notes: None,
            transfer_allowed: None,
            denial_reason: None,
            amount: None,
            role: None,
            item_count: None,
            correlation_id: None,
            payload_hash: String::new(),
        }
    }

    /// Compute and store the payload hash
    pub fn seal(mut self) -> Self {
        self.payload_hash = calculate_payload_hash(&self);
        self
    }

    pub fn is_sealed(&self) -> bool {
        !self.payload_hash.is_empty()
    }

    /// Counted as whitelist activity in summaries
    pub fn is_whitelist_activity(&self) -> bool {
        matches!(
            self.category,
            AuditCategory::Whitelist | AuditCategory::TransferValidation
        )
    }
}
