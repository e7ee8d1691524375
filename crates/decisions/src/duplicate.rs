//! Duplicate detection
//!
//! Retries (network retry, double submit, at-least-once queues) must not
//! produce a second ledger row. A submission is a duplicate of a recent
//! decision when organization, step and policy version match and the
//! evidence reference ids form the same set, in any order.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Duration;
use regledger_core::{Clock, ComplianceDecision, OnboardingStep};

use crate::error::DecisionResult;
use crate::store::DecisionStore;

/// Idempotency check over a [`DecisionStore`]
pub struct DuplicateDetector {
    store: Arc<dyn DecisionStore>,
    clock: Arc<dyn Clock>,
    window: Duration,
}

impl DuplicateDetector {
    pub fn new(store: Arc<dyn DecisionStore>, clock: Arc<dyn Clock>, window: Duration) -> Self {
        Self {
            store,
            clock,
            window,
        }
    }

    /// Most recent non-superseded decision inside the window with the same
    /// policy version and the same evidence-id set
    pub async fn find_duplicate_decision<S: AsRef<str>>(
        &self,
        organization_id: &str,
        step: OnboardingStep,
        policy_version: &str,
        evidence_reference_ids: &[S],
    ) -> DecisionResult<Option<ComplianceDecision>> {
        let since = self.clock.now() - self.window;
        let wanted: BTreeSet<&str> = evidence_reference_ids.iter().map(AsRef::as_ref).collect();

        let duplicate = self
            .store
            .recent_slot_decisions(organization_id, step, since)
            .await?
            .into_iter()
            .filter(|d| d.policy_version == policy_version && d.evidence_id_set() == wanted)
            .max_by_key(|d| d.decision_timestamp);

        if let Some(ref d) = duplicate {
            tracing::info!(
                decision_id = %d.id,
                organization_id = %organization_id,
                step = %step,
                "Duplicate submission resolved to existing decision"
            );
        }

        Ok(duplicate)
    }
}
