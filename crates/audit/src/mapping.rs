//! Canonical mapping of source-native entries
//!
//! Fixed per source. Categories:
//! - whitelist: `TransferValidation` for transfer validations, else `Whitelist`
//! - compliance: `Blacklist` for blacklist operations, else `Compliance`
//! - token issuance: always `TokenIssuance`

use crate::entry::{AuditCategory, EnterpriseAuditLogEntry};
use crate::source::{
    ComplianceAction, ComplianceAuditEntry, SourceEntry, TokenIssuanceAuditEntry,
    WhitelistAuditEntry,
};

/// Map and seal: the payload hash is fixed here and never recomputed
pub fn map_entry<E: SourceEntry>(entry: &E) -> EnterpriseAuditLogEntry {
    entry.to_canonical().seal()
}

pub fn map_whitelist(entry: &WhitelistAuditEntry) -> EnterpriseAuditLogEntry {
    let category = if entry.action_type.is_transfer_validation() {
        AuditCategory::TransferValidation
    } else {
        AuditCategory::Whitelist
    };

    let mut mapped = EnterpriseAuditLogEntry::new(
        entry.id.clone(),
        category,
        entry.action_type.to_string(),
        entry.performed_by.clone(),
        entry.performed_at,
        entry.success,
    );
    mapped.asset_id = Some(entry.asset_id);
    mapped.network = entry.network.clone();
    mapped.error_message = entry.error_message.clone();
    mapped.affected_address = Some(entry.address.clone());
    mapped.to_address = entry.to_address.clone();
    mapped.old_status = entry.old_status.clone();
    mapped.new_status = entry.new_status.clone();
    mapped.notes = entry.notes.clone();
    mapped.transfer_allowed = entry.transfer_allowed;
    mapped.denial_reason = entry.denial_reason.clone();
    mapped.amount = entry.amount;
    mapped.role = entry.role.clone();
    mapped
}

/// Blacklist classification of a compliance entry.
///
/// The compliance subsystem historically had no blacklist action, so a
/// `Create` whose notes mention "blacklist" (any case) counts as one. An
/// explicit `Blacklist` action is recognised as well.
pub fn is_blacklist_operation(action: ComplianceAction, notes: Option<&str>) -> bool {
    match action {
        ComplianceAction::Blacklist => true,
        ComplianceAction::Create => {
            notes.is_some_and(|n| n.to_ascii_lowercase().contains("blacklist"))
        }
        _ => false,
    }
}

pub fn map_compliance(entry: &ComplianceAuditEntry) -> EnterpriseAuditLogEntry {
    let category = if is_blacklist_operation(entry.action_type, entry.notes.as_deref()) {
        AuditCategory::Blacklist
    } else {
        AuditCategory::Compliance
    };

    let mut mapped = EnterpriseAuditLogEntry::new(
        entry.id.clone(),
        category,
        entry.action_type.to_string(),
        entry.performed_by.clone(),
        entry.performed_at,
        entry.success,
    );
    mapped.asset_id = Some(entry.asset_id);
    mapped.network = entry.network.clone();
    mapped.error_message = entry.error_message.clone();
    mapped.old_status = entry.old_status.clone();
    mapped.new_status = entry.new_status.clone();
    mapped.notes = entry.notes.clone();
    mapped.item_count = entry.item_count;
    mapped.correlation_id = entry.correlation_id.clone();
    mapped
}

pub fn map_token_issuance(entry: &TokenIssuanceAuditEntry) -> EnterpriseAuditLogEntry {
    let mut mapped = EnterpriseAuditLogEntry::new(
        entry.id.clone(),
        AuditCategory::TokenIssuance,
        entry.action_type.to_string(),
        entry.performed_by.clone(),
        entry.performed_at,
        entry.success,
    );
    mapped.asset_id = entry.asset_id;
    mapped.network = entry.network.clone();
    mapped.error_message = entry.error_message.clone();
    mapped.affected_address = entry.recipient.clone();
    mapped.amount = entry.amount;
    mapped.role = entry.role.clone();
    mapped.item_count = entry.item_count;
    mapped.correlation_id = entry.correlation_id.clone();
    mapped.notes = entry.notes.clone();
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::verify_payload_hash;
    use crate::source::{TokenIssuanceAction, WhitelistAction};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn compliance(action: ComplianceAction, notes: Option<&str>) -> ComplianceAuditEntry {
        ComplianceAuditEntry {
            id: "C1".to_string(),
            asset_id: 42,
            network: Some("polygon".to_string()),
            action_type: action,
            performed_by: "compliance@acme".to_string(),
            performed_at: Utc::now(),
            success: true,
            error_message: None,
            old_status: None,
            new_status: None,
            notes: notes.map(str::to_string),
            item_count: Some(3),
            correlation_id: None,
        }
    }

    #[test]
    fn test_blacklist_heuristic() {
        let cases = [
            (ComplianceAction::Create, Some("Added to BlackList after review"), true),
            (ComplianceAction::Create, Some("routine metadata"), false),
            (ComplianceAction::Create, None, false),
            (ComplianceAction::Update, Some("blacklist removed"), false),
            (ComplianceAction::Blacklist, None, true),
        ];

        for (action, notes, expected) in cases {
            let mapped = map_entry(&compliance(action, notes));
            let category = if expected {
                AuditCategory::Blacklist
            } else {
                AuditCategory::Compliance
            };
            assert_eq!(mapped.category, category, "{:?} / {:?}", action, notes);
        }
    }

    #[test]
    fn test_whitelist_mapping() {
        let entry = WhitelistAuditEntry {
            id: "W1".to_string(),
            asset_id: 42,
            network: Some("polygon".to_string()),
            action_type: WhitelistAction::TransferValidation,
            address: "0xfrom".to_string(),
            performed_by: "transfer-agent".to_string(),
            performed_at: Utc::now(),
            success: true,
            error_message: None,
            old_status: None,
            new_status: None,
            notes: None,
            role: None,
            to_address: Some("0xto".to_string()),
            transfer_allowed: Some(false),
            denial_reason: Some("recipient not whitelisted".to_string()),
            amount: Some(dec!(250)),
        };

        let mapped = map_entry(&entry);
        assert_eq!(mapped.category, AuditCategory::TransferValidation);
        assert_eq!(mapped.action_type, "TransferValidation");
        assert_eq!(mapped.affected_address.as_deref(), Some("0xfrom"));
        assert_eq!(mapped.to_address.as_deref(), Some("0xto"));
        assert_eq!(mapped.transfer_allowed, Some(false));
        assert!(verify_payload_hash(&mapped));

        let status_change = WhitelistAuditEntry {
            action_type: WhitelistAction::Approve,
            ..entry
        };
        assert_eq!(map_entry(&status_change).category, AuditCategory::Whitelist);
    }

    #[test]
    fn test_token_issuance_mapping() {
        let entry = TokenIssuanceAuditEntry {
            id: "T1".to_string(),
            asset_id: None,
            network: Some("polygon".to_string()),
            action_type: TokenIssuanceAction::Deploy,
            performed_by: "issuer@acme".to_string(),
            performed_at: Utc::now(),
            success: false,
            error_message: Some("out of gas".to_string()),
            recipient: None,
            amount: None,
            role: None,
            item_count: None,
            correlation_id: Some("corr-1".to_string()),
            notes: None,
        };

        let mapped = map_entry(&entry);
        assert_eq!(mapped.category, AuditCategory::TokenIssuance);
        assert_eq!(mapped.asset_id, None);
        assert_eq!(mapped.error_message.as_deref(), Some("out of gas"));
        assert!(mapped.is_sealed());
    }
}
