//! Audit aggregation errors

use regledger_core::CoreError;
use thiserror::Error;

/// Errors from audit sources and the aggregator
#[derive(Debug, Error)]
pub enum AuditError {
    /// A source read failed; the whole aggregation fails with it
    #[error("Audit source '{source_name}' failed: {message}")]
    Upstream {
        source_name: String,
        message: String,
    },

    #[error("Audit source '{source_name}' timed out after {timeout_ms}ms")]
    Timeout {
        source_name: String,
        timeout_ms: u64,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] CoreError),

    #[error("Malformed audit export at line {line}: {message}")]
    MalformedExport { line: usize, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Result type for audit operations
pub type AuditResult<T> = Result<T, AuditError>;

impl AuditError {
    pub fn upstream(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        AuditError::Upstream {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Failure attributable to a source rather than to the request
    pub fn is_upstream(&self) -> bool {
        matches!(self, AuditError::Upstream { .. } | AuditError::Timeout { .. })
    }
}
