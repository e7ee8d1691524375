//! Policy engine seam
//!
//! The ledger never evaluates rules itself. It hands the evidence to a
//! [`PolicyEngine`] and records whatever outcome comes back.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regledger_core::{DecisionOutcome, EvidenceReference, OnboardingStep, PolicyRuleEvaluation};
use serde::{Deserialize, Serialize};

use crate::error::{DecisionError, DecisionResult};

/// Input to one policy evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub organization_id: String,
    pub step: OnboardingStep,
    pub evidence_references: Vec<EvidenceReference>,
    /// Free-form context (jurisdiction, risk tier, ...)
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

/// What the policy engine decided
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEvaluation {
    pub outcome: DecisionOutcome,
    pub policy_version: String,
    #[serde(default)]
    pub policy_rule_ids: Vec<String>,
    #[serde(default)]
    pub rule_evaluations: Vec<PolicyRuleEvaluation>,
    #[serde(default)]
    pub reason: String,
    /// Overrides the configured approval validity
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Overrides the configured review interval
    #[serde(default)]
    pub next_review_date: Option<DateTime<Utc>>,
}

impl PolicyEvaluation {
    pub fn new(outcome: DecisionOutcome, policy_version: impl Into<String>) -> Self {
        Self {
            outcome,
            policy_version: policy_version.into(),
            policy_rule_ids: Vec::new(),
            rule_evaluations: Vec::new(),
            reason: String::new(),
            expires_at: None,
            next_review_date: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Attach rule results; rule ids are taken from the evaluations
    pub fn with_rule_evaluations(mut self, evaluations: Vec<PolicyRuleEvaluation>) -> Self {
        self.policy_rule_ids = evaluations.iter().map(|e| e.rule_id.clone()).collect();
        self.rule_evaluations = evaluations;
        self
    }

    pub fn failed_rules(&self) -> impl Iterator<Item = &PolicyRuleEvaluation> {
        self.rule_evaluations.iter().filter(|e| !e.passed)
    }
}

/// External policy engine
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    /// Engine name for logging
    fn name(&self) -> &str;

    /// Policy version that an evaluation of `step` would run under now.
    ///
    /// Used for the duplicate check before any evaluation happens.
    async fn current_policy_version(&self, step: OnboardingStep) -> DecisionResult<String>;

    async fn evaluate(&self, request: &EvaluationRequest) -> DecisionResult<PolicyEvaluation>;
}

/// Policy engine that returns a preset evaluation
///
/// Stands in for a human reviewer (the CLI) or a real engine (tests).
pub struct ManualPolicyEngine {
    policy_version: String,
    evaluation: RwLock<PolicyEvaluation>,
    calls: AtomicUsize,
    fail_with: RwLock<Option<String>>,
}

impl ManualPolicyEngine {
    pub fn new(policy_version: impl Into<String>, outcome: DecisionOutcome) -> Self {
        let policy_version = policy_version.into();
        Self {
            evaluation: RwLock::new(PolicyEvaluation::new(outcome, policy_version.clone())),
            policy_version,
            calls: AtomicUsize::new(0),
            fail_with: RwLock::new(None),
        }
    }

    pub fn with_evaluation(policy_version: impl Into<String>, evaluation: PolicyEvaluation) -> Self {
        let engine = Self::new(policy_version, evaluation.outcome);
        engine.set_evaluation(evaluation);
        engine
    }

    /// Replace the evaluation returned by subsequent calls
    pub fn set_evaluation(&self, mut evaluation: PolicyEvaluation) {
        evaluation.policy_version = self.policy_version.clone();
        match self.evaluation.write() {
            Ok(mut guard) => *guard = evaluation,
            Err(poisoned) => *poisoned.into_inner() = evaluation,
        }
    }

    pub fn set_outcome(&self, outcome: DecisionOutcome) {
        let mut evaluation = self.snapshot();
        evaluation.outcome = outcome;
        self.set_evaluation(evaluation);
    }

    /// Make subsequent evaluations fail with `message`
    pub fn fail_with(&self, message: impl Into<String>) {
        let message = Some(message.into());
        match self.fail_with.write() {
            Ok(mut guard) => *guard = message,
            Err(poisoned) => *poisoned.into_inner() = message,
        }
    }

    /// Number of `evaluate` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> PolicyEvaluation {
        match self.evaluation.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn failure(&self) -> Option<String> {
        match self.fail_with.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl PolicyEngine for ManualPolicyEngine {
    fn name(&self) -> &str {
        "manual"
    }

    async fn current_policy_version(&self, _step: OnboardingStep) -> DecisionResult<String> {
        Ok(self.policy_version.clone())
    }

    async fn evaluate(&self, request: &EvaluationRequest) -> DecisionResult<PolicyEvaluation> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.failure() {
            return Err(DecisionError::PolicyEngine(message));
        }

        let evaluation = self.snapshot();
        tracing::debug!(
            engine = self.name(),
            organization_id = %request.organization_id,
            step = %request.step,
            outcome = %evaluation.outcome,
            "Policy evaluated"
        );
        Ok(evaluation)
    }
}
