//! Combined configuration file

use std::path::Path;

use regledger_audit::AuditConfig;
use regledger_decisions::DecisionConfig;
use serde::{Deserialize, Serialize};

/// `--config` file contents; both sections optional
///
/// ```json
/// {
///   "decisions": { "duplicate_window_minutes": 30, "pagination": "reject" },
///   "audit": { "source_timeout_ms": 5000, "pagination": "reject" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegLedgerConfig {
    #[serde(default)]
    pub decisions: DecisionConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

impl RegLedgerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.decisions.validate()?;
        config.audit.validate()?;

        if config.decisions.pagination != config.audit.pagination {
            tracing::warn!(
                decisions = ?config.decisions.pagination,
                audit = ?config.audit.pagination,
                "Decision and audit pagination modes differ"
            );
        }

        Ok(config)
    }

    /// Load `path` if given, defaults otherwise
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regledger_core::PaginationMode;
    use std::io::Write;

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "audit": {{ "source_timeout_ms": 1500 }} }}"#).unwrap();

        let config = RegLedgerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.audit.source_timeout_ms, Some(1500));
        assert_eq!(config.decisions, DecisionConfig::default());
    }

    #[test]
    fn test_invalid_section_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "decisions": {{ "duplicate_window_minutes": 0 }} }}"#).unwrap();

        assert!(RegLedgerConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_defaults_without_file() {
        let config = RegLedgerConfig::load(None).unwrap();
        assert_eq!(config.decisions.pagination, PaginationMode::Clamp);
        assert_eq!(config.audit.pagination, PaginationMode::Clamp);
    }
}
