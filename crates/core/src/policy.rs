//! Policy rules and their evaluation results
//!
//! Rules are versioned configuration owned by the external policy engine.
//! The ledger only carries them: which rules drove a decision, and what
//! each rule concluded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum_macros::{Display, EnumString};

/// Rule severity - ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RuleSeverity {
    Info = 0,
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl PartialOrd for RuleSeverity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RuleSeverity {
    fn cmp(&self, other: &Self) -> Ordering {
        (*self as u8).cmp(&(*other as u8))
    }
}

/// A policy rule as configured in the policy engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub id: String,
    pub name: String,
    /// Free-form grouping, e.g. `kyc`, `aml`, `jurisdiction`
    pub category: String,
    pub severity: RuleSeverity,
    /// Evidence types the rule needs before it can pass
    #[serde(default)]
    pub required_evidence_types: Vec<String>,
    pub is_active: bool,
    pub effective_from: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_until: Option<DateTime<Utc>>,
    pub version: String,
}

impl PolicyRule {
    /// Active and inside `[effective_from, effective_until)` at `at`
    pub fn is_effective_at(&self, at: DateTime<Utc>) -> bool {
        if !self.is_active || at < self.effective_from {
            return false;
        }
        match self.effective_until {
            Some(until) => at < until,
            None => true,
        }
    }

    /// Required evidence types not present in `provided`
    pub fn missing_evidence<'a>(&'a self, provided: &[&str]) -> Vec<&'a str> {
        self.required_evidence_types
            .iter()
            .map(String::as_str)
            .filter(|required| !provided.contains(required))
            .collect()
    }
}

/// Outcome of evaluating one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRuleEvaluation {
    pub rule_id: String,
    pub passed: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<RuleSeverity>,
}

impl PolicyRuleEvaluation {
    pub fn passed(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            passed: true,
            message: message.into(),
            severity: None,
        }
    }

    pub fn failed(
        rule_id: impl Into<String>,
        message: impl Into<String>,
        severity: RuleSeverity,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            passed: false,
            message: message.into(),
            severity: Some(severity),
        }
    }
}
