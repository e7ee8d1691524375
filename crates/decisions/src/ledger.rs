//! Decision ledger
//!
//! Orchestrates one submission end to end:
//!
//! ```text
//! submit ─► duplicate? ──yes──► existing decision (no write)
//!              │no
//!              ▼
//!        policy engine ─► new decision ─► create ─► supersede prior active
//! ```
//!
//! Submissions are serialised so two concurrent submissions for the same
//! slot cannot both pass the duplicate check or both supersede the same
//! prior decision.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use regledger_core::{
    Clock, ComplianceDecision, DecisionOutcome, EvidenceReference, OnboardingStep, SystemClock,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::DecisionConfig;
use crate::duplicate::DuplicateDetector;
use crate::engine::{EvaluationRequest, PolicyEngine, PolicyEvaluation};
use crate::error::{DecisionError, DecisionResult};
use crate::store::DecisionStore;

/// Evidence submitted for one (organization, step) slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    /// Caller-assigned id; a UUID is generated when absent
    #[serde(default)]
    pub decision_id: Option<String>,
    pub organization_id: String,
    #[serde(default)]
    pub onboarding_session_id: Option<String>,
    pub step: OnboardingStep,
    #[serde(default)]
    pub evidence_references: Vec<EvidenceReference>,
    /// Recorded as `decision_maker` on the new decision
    pub decision_maker: String,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl SubmissionRequest {
    pub fn new(
        organization_id: impl Into<String>,
        step: OnboardingStep,
        decision_maker: impl Into<String>,
    ) -> Self {
        Self {
            decision_id: None,
            organization_id: organization_id.into(),
            onboarding_session_id: None,
            step,
            evidence_references: Vec::new(),
            decision_maker: decision_maker.into(),
            context: BTreeMap::new(),
            correlation_id: None,
        }
    }

    pub fn with_decision_id(mut self, id: impl Into<String>) -> Self {
        self.decision_id = Some(id.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.onboarding_session_id = Some(session_id.into());
        self
    }

    pub fn with_evidence(mut self, evidence: Vec<EvidenceReference>) -> Self {
        self.evidence_references = evidence;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    fn evidence_ids(&self) -> Vec<&str> {
        self.evidence_references
            .iter()
            .map(|e| e.reference_id.as_str())
            .collect()
    }
}

/// Result of [`DecisionLedger::submit`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub decision: ComplianceDecision,
    /// `false` when the submission resolved to an existing decision
    pub created: bool,
    /// Prior active decision replaced by this one
    pub superseded_decision_id: Option<String>,
}

/// Decision lifecycle entry point
pub struct DecisionLedger {
    store: Arc<dyn DecisionStore>,
    engine: Arc<dyn PolicyEngine>,
    detector: DuplicateDetector,
    clock: Arc<dyn Clock>,
    config: DecisionConfig,
    submit_lock: Mutex<()>,
}

impl DecisionLedger {
    pub fn new(
        store: Arc<dyn DecisionStore>,
        engine: Arc<dyn PolicyEngine>,
        config: DecisionConfig,
    ) -> Self {
        Self::with_clock(store, engine, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn DecisionStore>,
        engine: Arc<dyn PolicyEngine>,
        config: DecisionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let detector =
            DuplicateDetector::new(store.clone(), clock.clone(), config.duplicate_window());
        Self {
            store,
            engine,
            detector,
            clock,
            config,
            submit_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn DecisionStore> {
        &self.store
    }

    /// Evaluate and record a submission, or return the decision it duplicates
    pub async fn submit(&self, request: SubmissionRequest) -> DecisionResult<Submission> {
        let _guard = self.submit_lock.lock().await;

        let policy_version = self.engine.current_policy_version(request.step).await?;
        let now = self.clock.now();

        // A duplicate only short-circuits while it still stands
        if let Some(existing) = self
            .detector
            .find_duplicate_decision(
                &request.organization_id,
                request.step,
                &policy_version,
                &request.evidence_ids(),
            )
            .await?
            .filter(|d| d.is_active_at(now) && d.outcome != DecisionOutcome::Expired)
        {
            return Ok(Submission {
                decision: existing,
                created: false,
                superseded_decision_id: None,
            });
        }

        let evaluation = self
            .engine
            .evaluate(&EvaluationRequest {
                organization_id: request.organization_id.clone(),
                step: request.step,
                evidence_references: request.evidence_references.clone(),
                context: request.context.clone(),
            })
            .await?;

        let prior = self
            .store
            .get_active_decision(&request.organization_id, request.step)
            .await?;
        let decision_timestamp = next_timestamp(now, prior.as_ref());

        let decision = self.build_decision(request, evaluation, decision_timestamp, prior.as_ref());
        self.record(decision, prior).await
    }

    /// Replace `decision_id` with an `Expired` successor
    pub async fn record_expiry(
        &self,
        decision_id: &str,
        decision_maker: &str,
    ) -> DecisionResult<Submission> {
        let _guard = self.submit_lock.lock().await;

        let current = self
            .store
            .get_decision_by_id(decision_id)
            .await?
            .ok_or_else(|| DecisionError::NotFound(decision_id.to_string()))?;
        if current.is_superseded() {
            return Err(DecisionError::AlreadySuperseded(decision_id.to_string()));
        }

        let decision_timestamp = next_timestamp(self.clock.now(), Some(&current));
        let reason = match current.expires_at {
            Some(expires_at) => format!("Decision {} expired at {}", current.id, expires_at),
            None => format!("Decision {} withdrawn as expired", current.id),
        };

        let mut successor = ComplianceDecision::new(
            uuid::Uuid::new_v4().to_string(),
            current.organization_id.clone(),
            current.step,
            DecisionOutcome::Expired,
            decision_maker,
            current.policy_version.clone(),
            decision_timestamp,
        )
        .with_reason(reason)
        .with_evidence(current.evidence_references.clone())
        .with_policy_rules(current.policy_rule_ids.clone())
        .with_previous_decision(current.id.clone());
        successor.onboarding_session_id = current.onboarding_session_id.clone();
        successor.correlation_id = current.correlation_id.clone();

        self.record(successor, Some(current)).await
    }

    /// Decisions from `decision_id` forward along `superseded_by_id`
    pub async fn supersession_chain(
        &self,
        decision_id: &str,
    ) -> DecisionResult<Vec<ComplianceDecision>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(decision_id.to_string());

        while let Some(id) = next.take() {
            if !seen.insert(id.clone()) {
                tracing::warn!(decision_id = %id, "Supersession chain revisits a decision");
                break;
            }
            let Some(decision) = self.store.get_decision_by_id(&id).await? else {
                if chain.is_empty() {
                    return Err(DecisionError::NotFound(id));
                }
                tracing::warn!(decision_id = %id, "Supersession chain points at a missing decision");
                break;
            };
            next = decision.superseded_by_id().map(str::to_string);
            chain.push(decision);
        }

        Ok(chain)
    }

    fn build_decision(
        &self,
        request: SubmissionRequest,
        evaluation: PolicyEvaluation,
        decision_timestamp: DateTime<Utc>,
        prior: Option<&ComplianceDecision>,
    ) -> ComplianceDecision {
        let id = request
            .decision_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut decision = ComplianceDecision::new(
            id,
            request.organization_id,
            request.step,
            evaluation.outcome,
            request.decision_maker,
            evaluation.policy_version,
            decision_timestamp,
        )
        .with_reason(evaluation.reason)
        .with_evidence(request.evidence_references)
        .with_policy_rules(evaluation.policy_rule_ids)
        .with_rule_evaluations(evaluation.rule_evaluations);
        decision.onboarding_session_id = request.onboarding_session_id;
        decision.correlation_id = request.correlation_id;

        let default_validity = if evaluation.outcome.is_favorable() {
            self.config.approval_validity()
        } else {
            None
        };
        let expires_at = evaluation
            .expires_at
            .or_else(|| default_validity.map(|validity| decision_timestamp + validity));
        if let Some(expires_at) = expires_at {
            decision = decision.with_expiry(expires_at);
        }

        let review_at = evaluation.next_review_date.or(match evaluation.outcome {
            DecisionOutcome::RequiresManualReview => Some(decision_timestamp),
            DecisionOutcome::ConditionalApproval => self
                .config
                .conditional_review_interval()
                .map(|interval| decision_timestamp + interval),
            _ => None,
        });
        if let Some(review_at) = review_at {
            decision = decision.with_review(review_at);
        }

        if let Some(prior) = prior {
            decision = decision.with_previous_decision(prior.id.clone());
        }

        decision
    }

    async fn record(
        &self,
        decision: ComplianceDecision,
        prior: Option<ComplianceDecision>,
    ) -> DecisionResult<Submission> {
        let decision_id = decision.id.clone();
        self.store.create_decision(decision.clone()).await?;

        let mut superseded_decision_id = None;
        if let Some(prior) = prior {
            if self.store.supersede_decision(&prior.id, &decision_id).await? {
                superseded_decision_id = Some(prior.id);
            } else {
                tracing::warn!(
                    decision_id = %decision_id,
                    prior_id = %prior.id,
                    "Prior decision left active"
                );
            }
        }

        tracing::info!(
            decision_id = %decision_id,
            organization_id = %decision.organization_id,
            step = %decision.step,
            outcome = %decision.outcome,
            superseded = ?superseded_decision_id,
            "Decision recorded"
        );

        Ok(Submission {
            decision,
            created: true,
            superseded_decision_id,
        })
    }
}

/// `now`, moved past `prior` so supersession links always point forward
fn next_timestamp(now: DateTime<Utc>, prior: Option<&ComplianceDecision>) -> DateTime<Utc> {
    match prior {
        Some(prior) if prior.decision_timestamp >= now => {
            prior.decision_timestamp + Duration::microseconds(1)
        }
        _ => now,
    }
}
