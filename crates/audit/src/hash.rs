//! Payload hashing for tamper evidence

use sha2::{Digest, Sha256};

use crate::entry::EnterpriseAuditLogEntry;

/// Calculate the SHA-256 payload hash of an audit entry.
///
/// Covers id, asset id, network, category, action type, performer,
/// timestamp, success flag, affected address and amount. Every field is
/// length-prefixed so adjacent values cannot run together.
pub fn calculate_payload_hash(entry: &EnterpriseAuditLogEntry) -> String {
    let mut hasher = Sha256::new();

    let asset_id = entry.asset_id.map(|id| id.to_string());
    let performed_at = entry.performed_at.to_rfc3339();
    let category = entry.category.to_string();
    // Normalized so 100 and 100.00 hash alike
    let amount = entry.amount.map(|a| a.normalize().to_string());

    let fields: [Option<&str>; 10] = [
        Some(entry.id.as_str()),
        asset_id.as_deref(),
        entry.network.as_deref(),
        Some(category.as_str()),
        Some(entry.action_type.as_str()),
        Some(entry.performed_by.as_str()),
        Some(performed_at.as_str()),
        Some(if entry.success { "true" } else { "false" }),
        entry.affected_address.as_deref(),
        amount.as_deref(),
    ];

    for field in fields {
        match field {
            Some(value) => {
                hasher.update([1u8]);
                hasher.update((value.len() as u64).to_le_bytes());
                hasher.update(value.as_bytes());
            }
            None => hasher.update([0u8]),
        }
    }

    hex::encode(hasher.finalize())
}

/// Whether the stored hash matches the entry's current content
pub fn verify_payload_hash(entry: &EnterpriseAuditLogEntry) -> bool {
    entry.payload_hash == calculate_payload_hash(entry)
}

/// An exported entry whose content no longer matches its hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TamperedEntry {
    pub id: String,
    pub expected: String,
    pub actual: String,
}

/// Recompute hashes and report every mismatch
pub fn find_tampered(entries: &[EnterpriseAuditLogEntry]) -> Vec<TamperedEntry> {
    entries
        .iter()
        .filter_map(|entry| {
            let expected = calculate_payload_hash(entry);
            (entry.payload_hash != expected).then(|| TamperedEntry {
                id: entry.id.clone(),
                expected,
                actual: entry.payload_hash.clone(),
            })
        })
        .collect()
}
