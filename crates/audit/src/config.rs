//! Audit aggregator configuration

use regledger_core::{CoreResult, PageRequest, PaginationMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AuditError, AuditResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Page size used when a query does not name one
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Upper bound on page size
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Clamp or reject out-of-range page parameters
    #[serde(default)]
    pub pagination: PaginationMode,

    /// Per-source read timeout (in milliseconds); unbounded when absent
    #[serde(default)]
    pub source_timeout_ms: Option<u64>,
}

fn default_page_size() -> u32 {
    50
}

fn default_max_page_size() -> u32 {
    100
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            pagination: PaginationMode::default(),
            source_timeout_ms: None,
        }
    }
}

impl AuditConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &std::path::Path) -> AuditResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AuditResult<()> {
        if self.max_page_size == 0 {
            return Err(AuditError::ConfigError(
                "max_page_size must be positive".to_string(),
            ));
        }
        if self.source_timeout_ms == Some(0) {
            return Err(AuditError::ConfigError(
                "source_timeout_ms must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn source_timeout(&self) -> Option<Duration> {
        self.source_timeout_ms.map(Duration::from_millis)
    }

    /// Normalize a page request under this config
    pub fn page_request(&self, page: u32, page_size: Option<u32>) -> CoreResult<PageRequest> {
        PageRequest::new(page, page_size.unwrap_or(self.default_page_size))
            .normalize(self.max_page_size, self.pagination)
    }
}
