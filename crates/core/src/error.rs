//! Core errors

use thiserror::Error;

/// Errors raised while validating core domain values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Invalid decision {id}: {reason}")]
    InvalidDecision { id: String, reason: String },

    #[error("Invalid pagination: page={page}, page_size={page_size} (max {max_page_size})")]
    InvalidPagination {
        page: u32,
        page_size: u32,
        max_page_size: u32,
    },
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn invalid_decision(id: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidDecision {
            id: id.into(),
            reason: reason.into(),
        }
    }
}
