//! Decision ledger errors

use regledger_core::CoreError;
use thiserror::Error;

/// Errors from the decision store, duplicate detector and ledger
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("Decision already exists: {0}")]
    AlreadyExists(String),

    #[error("Decision not found: {0}")]
    NotFound(String),

    #[error("Decision already superseded: {0}")]
    AlreadySuperseded(String),

    #[error("Validation error: {0}")]
    Validation(#[from] CoreError),

    #[error("Policy engine error: {0}")]
    PolicyEngine(String),

    #[error("Corrupt decision journal at line {line}: {message}")]
    JournalCorrupt { line: usize, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Result type for decision operations
pub type DecisionResult<T> = Result<T, DecisionError>;

impl DecisionError {
    /// Conflict on create (caller-assigned id already used)
    pub fn is_conflict(&self) -> bool {
        matches!(self, DecisionError::AlreadyExists(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DecisionError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_error() {
        let err = DecisionError::AlreadyExists("D1".to_string());
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("D1"));
    }

    #[test]
    fn test_validation_from_core() {
        let err: DecisionError = CoreError::invalid_decision("D1", "bad expiry").into();
        assert!(matches!(err, DecisionError::Validation(_)));
        assert!(err.to_string().contains("bad expiry"));
    }
}
