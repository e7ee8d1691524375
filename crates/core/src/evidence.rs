//! Evidence references
//!
//! An evidence reference points at supporting material (a document, a
//! screening report, a custody attestation) held by an external store.
//! The ledger never holds the material itself, only this descriptor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum_macros::{Display, EnumString};

/// Verification state of a piece of evidence
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
    Expired,
}

/// Immutable descriptor of one piece of supporting evidence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceReference {
    /// Evidence kind, e.g. `ID_DOCUMENT`, `SANCTIONS_SCREENING`
    pub evidence_type: String,

    /// Identifier in the external evidence store
    pub reference_id: String,

    pub submitted_at: DateTime<Utc>,

    #[serde(default)]
    pub verification_status: VerificationStatus,

    /// Hex SHA-256 of the evidence content, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl EvidenceReference {
    pub fn new(
        evidence_type: impl Into<String>,
        reference_id: impl Into<String>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            evidence_type: evidence_type.into(),
            reference_id: reference_id.into(),
            submitted_at,
            verification_status: VerificationStatus::Pending,
            content_hash: None,
        }
    }

    pub fn with_status(mut self, status: VerificationStatus) -> Self {
        self.verification_status = status;
        self
    }

    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }

    /// Hex SHA-256 of raw evidence bytes
    pub fn hash_content(content: &[u8]) -> String {
        hex::encode(Sha256::digest(content))
    }

    /// Check raw bytes against the recorded content hash.
    ///
    /// Returns `false` when no hash was recorded.
    pub fn matches_content(&self, content: &[u8]) -> bool {
        self.content_hash
            .as_deref()
            .is_some_and(|expected| expected.eq_ignore_ascii_case(&Self::hash_content(content)))
    }

    pub fn is_verified(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }
}
