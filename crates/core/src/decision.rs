//! Compliance decisions
//!
//! A [`ComplianceDecision`] is written once and never edited. The single
//! exception is the supersession link, which is applied through a
//! [`SupersessionPatch`] and nothing else.
//!
//! ```text
//! d1 ──superseded_by──► d2 ──superseded_by──► d3 (active)
//! ```
//!
//! Links always point forward in time, so a chain can never loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum_macros::{Display, EnumString};

use crate::error::{CoreError, CoreResult};
use crate::evidence::EvidenceReference;
use crate::policy::PolicyRuleEvaluation;

/// Compliance checkpoint in an enterprise onboarding flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    IdentityVerification,
    KycKybVerification,
    AmlScreening,
    JurisdictionalCheck,
    TokenIssuanceAuthorization,
    CustodyVerification,
    TermsAcceptance,
    FinalApproval,
}

/// Judgment recorded for a step evaluation
///
/// Assigned once by the policy engine. The ledger never transitions it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Pending,
    Approved,
    Rejected,
    RequiresManualReview,
    ConditionalApproval,
    Expired,
}

impl DecisionOutcome {
    /// Outcomes that grant the step (fully or under conditions)
    pub fn is_favorable(&self) -> bool {
        matches!(
            self,
            DecisionOutcome::Approved | DecisionOutcome::ConditionalApproval
        )
    }
}

/// Supersession link recorded on a replaced decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supersession {
    pub superseded_by_id: String,
    pub superseded_at: DateTime<Utc>,
}

/// The only post-creation change a stored decision accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersessionPatch {
    /// Decision being replaced
    pub decision_id: String,
    /// Replacing decision (created strictly later)
    pub superseded_by_id: String,
    pub superseded_at: DateTime<Utc>,
}

impl SupersessionPatch {
    pub fn new(
        decision_id: impl Into<String>,
        superseded_by_id: impl Into<String>,
        superseded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            decision_id: decision_id.into(),
            superseded_by_id: superseded_by_id.into(),
            superseded_at,
        }
    }
}

/// Ledger entry for one policy evaluation of an (organization, step) slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceDecision {
    pub id: String,

    // === Subject ===
    pub organization_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_session_id: Option<String>,
    pub step: OnboardingStep,

    pub outcome: DecisionOutcome,

    // === Provenance ===
    #[serde(default)]
    pub policy_rule_ids: Vec<String>,
    #[serde(default)]
    pub rule_evaluations: Vec<PolicyRuleEvaluation>,
    pub decision_maker: String,
    pub decision_timestamp: DateTime<Utc>,
    pub policy_version: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub evidence_references: Vec<EvidenceReference>,

    // === Lifecycle ===
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub requires_review: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_review_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_decision_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// Set only through [`ComplianceDecision::apply_supersession`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    supersession: Option<Supersession>,
}

impl ComplianceDecision {
    /// Create a decision with the mandatory fields; optional ones via `with_*`
    pub fn new(
        id: impl Into<String>,
        organization_id: impl Into<String>,
        step: OnboardingStep,
        outcome: DecisionOutcome,
        decision_maker: impl Into<String>,
        policy_version: impl Into<String>,
        decision_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            organization_id: organization_id.into(),
            onboarding_session_id: None,
            step,
            outcome,
            policy_rule_ids: Vec::new(),
            rule_evaluations: Vec::new(),
            decision_maker: decision_maker.into(),
            decision_timestamp,
            policy_version: policy_version.into(),
            reason: String::new(),
            evidence_references: Vec::new(),
            expires_at: None,
            requires_review: false,
            next_review_date: None,
            previous_decision_id: None,
            correlation_id: None,
            supersession: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.onboarding_session_id = Some(session_id.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_evidence(mut self, evidence: Vec<EvidenceReference>) -> Self {
        self.evidence_references = evidence;
        self
    }

    pub fn with_policy_rules(mut self, rule_ids: Vec<String>) -> Self {
        self.policy_rule_ids = rule_ids;
        self
    }

    pub fn with_rule_evaluations(mut self, evaluations: Vec<PolicyRuleEvaluation>) -> Self {
        self.rule_evaluations = evaluations;
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Mark for periodic review on `next_review_date`
    pub fn with_review(mut self, next_review_date: DateTime<Utc>) -> Self {
        self.requires_review = true;
        self.next_review_date = Some(next_review_date);
        self
    }

    pub fn with_previous_decision(mut self, previous_id: impl Into<String>) -> Self {
        self.previous_decision_id = Some(previous_id.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Check write-time invariants
    pub fn validate(&self) -> CoreResult<()> {
        let required = [
            ("id", &self.id),
            ("organization_id", &self.organization_id),
            ("decision_maker", &self.decision_maker),
            ("policy_version", &self.policy_version),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CoreError::invalid_decision(
                    &self.id,
                    format!("{} must not be empty", field),
                ));
            }
        }

        if let Some(expires_at) = self.expires_at {
            if expires_at < self.decision_timestamp {
                return Err(CoreError::invalid_decision(
                    &self.id,
                    "expires_at precedes decision_timestamp",
                ));
            }
        }

        if self.previous_decision_id.as_deref() == Some(self.id.as_str()) {
            return Err(CoreError::invalid_decision(
                &self.id,
                "previous_decision_id points at itself",
            ));
        }

        if self.supersession.is_some() {
            return Err(CoreError::invalid_decision(
                &self.id,
                "new decisions cannot carry a supersession link",
            ));
        }

        Ok(())
    }

    pub fn is_superseded(&self) -> bool {
        self.supersession.is_some()
    }

    pub fn supersession(&self) -> Option<&Supersession> {
        self.supersession.as_ref()
    }

    pub fn superseded_by_id(&self) -> Option<&str> {
        self.supersession
            .as_ref()
            .map(|s| s.superseded_by_id.as_str())
    }

    pub fn superseded_at(&self) -> Option<DateTime<Utc>> {
        self.supersession.as_ref().map(|s| s.superseded_at)
    }

    /// Expired once `expires_at <= now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Candidate for the active decision of its slot
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_superseded() && !self.is_expired_at(now)
    }

    /// Review is due on or before `before`
    pub fn is_review_due(&self, before: DateTime<Utc>) -> bool {
        self.requires_review && self.next_review_date.is_some_and(|due| due <= before)
    }

    pub fn belongs_to(&self, organization_id: &str, step: OnboardingStep) -> bool {
        self.step == step && self.organization_id == organization_id
    }

    /// Evidence reference ids as an order-independent set
    pub fn evidence_id_set(&self) -> BTreeSet<&str> {
        self.evidence_references
            .iter()
            .map(|e| e.reference_id.as_str())
            .collect()
    }

    /// Record that `patch.superseded_by_id` replaced this decision.
    ///
    /// Re-applying the same link is a no-op. Any other change to an already
    /// superseded decision is refused.
    pub fn apply_supersession(&mut self, patch: &SupersessionPatch) -> CoreResult<()> {
        if patch.decision_id != self.id {
            return Err(CoreError::invalid_decision(
                &self.id,
                format!("patch addresses decision {}", patch.decision_id),
            ));
        }
        if patch.superseded_by_id == self.id {
            return Err(CoreError::invalid_decision(
                &self.id,
                "a decision cannot supersede itself",
            ));
        }

        match &self.supersession {
            Some(existing) if existing.superseded_by_id == patch.superseded_by_id => Ok(()),
            Some(existing) => Err(CoreError::invalid_decision(
                &self.id,
                format!("already superseded by {}", existing.superseded_by_id),
            )),
            None => {
                self.supersession = Some(Supersession {
                    superseded_by_id: patch.superseded_by_id.clone(),
                    superseded_at: patch.superseded_at,
                });
                Ok(())
            }
        }
    }
}
