//! RegLedger unified audit view
//!
//! Fans out to the whitelist, compliance and token-issuance audit logs,
//! maps every entry into [`EnterpriseAuditLogEntry`], seals it with a
//! payload hash, and serves one merged, paginated, summarised view.

pub mod aggregator;
pub mod config;
pub mod entry;
pub mod error;
pub mod hash;
pub mod jsonl;
pub mod mapping;
pub mod memory;
pub mod query;
pub mod source;
pub mod summary;

pub use aggregator::{AuditAggregator, ComplianceSource, TokenIssuanceSource, WhitelistSource};
pub use config::AuditConfig;
pub use entry::{AuditCategory, AuditSourceKind, EnterpriseAuditLogEntry};
pub use error::{AuditError, AuditResult};
pub use hash::{calculate_payload_hash, find_tampered, verify_payload_hash, TamperedEntry};
pub use jsonl::JsonlAuditSource;
pub use mapping::{is_blacklist_operation, map_entry};
pub use memory::InMemoryAuditSource;
pub use query::AuditLogQuery;
pub use source::{
    AuditSource, ComplianceAction, ComplianceAuditEntry, SourceEntry, SourceFilter,
    TokenIssuanceAction, TokenIssuanceAuditEntry, WhitelistAction, WhitelistAuditEntry,
};
pub use summary::{AuditLogSummary, DateRange};
