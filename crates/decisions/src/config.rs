//! Decision ledger configuration
//!
//! Every threshold has a serde default so partial config files work.

use regledger_core::{CoreResult, PageRequest, PaginationMode};
use serde::{Deserialize, Serialize};

use crate::error::{DecisionError, DecisionResult};

/// Configuration for the decision store and ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Recency window for duplicate detection (in minutes)
    #[serde(default = "default_duplicate_window_minutes")]
    pub duplicate_window_minutes: i64,

    /// Page size used when a query does not name one
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Upper bound on page size
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Clamp or reject out-of-range page parameters
    #[serde(default)]
    pub pagination: PaginationMode,

    /// Validity applied to approvals when the policy engine sets no expiry
    #[serde(default = "default_approval_validity_days")]
    pub approval_validity_days: Option<u32>,

    /// Review interval for conditional approvals without an explicit review date
    #[serde(default = "default_conditional_review_days")]
    pub conditional_review_days: Option<u32>,
}

fn default_duplicate_window_minutes() -> i64 {
    60
}

fn default_page_size() -> u32 {
    50
}

fn default_max_page_size() -> u32 {
    100
}

fn default_approval_validity_days() -> Option<u32> {
    Some(365)
}

fn default_conditional_review_days() -> Option<u32> {
    Some(90)
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            duplicate_window_minutes: default_duplicate_window_minutes(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            pagination: PaginationMode::default(),
            approval_validity_days: default_approval_validity_days(),
            conditional_review_days: default_conditional_review_days(),
        }
    }
}

impl DecisionConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &std::path::Path) -> DecisionResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DecisionResult<()> {
        if self.duplicate_window_minutes <= 0 {
            return Err(DecisionError::ConfigError(
                "duplicate_window_minutes must be positive".to_string(),
            ));
        }
        if self.max_page_size == 0 {
            return Err(DecisionError::ConfigError(
                "max_page_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Duplicate detection window as chrono Duration
    pub fn duplicate_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.duplicate_window_minutes)
    }

    pub fn approval_validity(&self) -> Option<chrono::Duration> {
        self.approval_validity_days
            .map(|days| chrono::Duration::days(i64::from(days)))
    }

    pub fn conditional_review_interval(&self) -> Option<chrono::Duration> {
        self.conditional_review_days
            .map(|days| chrono::Duration::days(i64::from(days)))
    }

    /// Normalize a page request under this config
    pub fn page_request(&self, page: u32, page_size: Option<u32>) -> CoreResult<PageRequest> {
        PageRequest::new(page, page_size.unwrap_or(self.default_page_size))
            .normalize(self.max_page_size, self.pagination)
    }
}
