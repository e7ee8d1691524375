//! Unsynchronised decision collection
//!
//! Holds the rows and all read/write logic. Stores wrap it in a lock and
//! decide what else (a journal, say) must happen under that lock.

use chrono::{DateTime, Utc};
use regledger_core::{ComplianceDecision, OnboardingStep, Page, PageRequest, SupersessionPatch};
use std::collections::HashMap;

use crate::error::{DecisionError, DecisionResult};
use crate::query::DecisionQuery;

/// Result of checking a supersession request against the book
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SupersessionCheck {
    /// Link can be recorded with this patch
    Apply(SupersessionPatch),
    /// The exact link is already recorded
    AlreadyApplied,
    /// Link refused; the reason is logged by the caller
    Refused(String),
}

/// Decisions in insertion order plus an id index
#[derive(Debug, Default)]
pub(crate) struct DecisionBook {
    rows: Vec<ComplianceDecision>,
    index: HashMap<String, usize>,
}

impl DecisionBook {
    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn get(&self, id: &str) -> Option<&ComplianceDecision> {
        self.index.get(id).map(|&pos| &self.rows[pos])
    }

    /// Validate a decision for insertion without inserting it
    pub(crate) fn check_insert(&self, decision: &ComplianceDecision) -> DecisionResult<()> {
        decision.validate()?;
        if self.index.contains_key(&decision.id) {
            return Err(DecisionError::AlreadyExists(decision.id.clone()));
        }
        Ok(())
    }

    pub(crate) fn insert(&mut self, decision: ComplianceDecision) -> DecisionResult<()> {
        self.check_insert(&decision)?;
        self.index.insert(decision.id.clone(), self.rows.len());
        self.rows.push(decision);
        Ok(())
    }

    /// Decide whether `decision_id` may be marked as replaced by `superseded_by_id`
    pub(crate) fn check_supersession(
        &self,
        decision_id: &str,
        superseded_by_id: &str,
        now: DateTime<Utc>,
    ) -> SupersessionCheck {
        let Some(target) = self.get(decision_id) else {
            return SupersessionCheck::Refused(format!("decision {} not found", decision_id));
        };
        let Some(replacement) = self.get(superseded_by_id) else {
            return SupersessionCheck::Refused(format!(
                "replacement {} not found",
                superseded_by_id
            ));
        };

        if decision_id == superseded_by_id {
            return SupersessionCheck::Refused("a decision cannot supersede itself".to_string());
        }
        if replacement.decision_timestamp <= target.decision_timestamp {
            return SupersessionCheck::Refused(format!(
                "replacement {} is not newer than {}",
                superseded_by_id, decision_id
            ));
        }

        match target.superseded_by_id() {
            Some(existing) if existing == superseded_by_id => SupersessionCheck::AlreadyApplied,
            Some(existing) => {
                SupersessionCheck::Refused(format!("already superseded by {}", existing))
            }
            None => SupersessionCheck::Apply(SupersessionPatch::new(
                decision_id,
                superseded_by_id,
                now,
            )),
        }
    }

    pub(crate) fn apply(&mut self, patch: &SupersessionPatch) -> DecisionResult<()> {
        let pos = *self
            .index
            .get(&patch.decision_id)
            .ok_or_else(|| DecisionError::NotFound(patch.decision_id.clone()))?;
        self.rows[pos].apply_supersession(patch)?;
        Ok(())
    }

    /// Filter, order by `decision_timestamp` descending, paginate
    pub(crate) fn query(
        &self,
        query: &DecisionQuery,
        request: PageRequest,
        now: DateTime<Utc>,
    ) -> Page<ComplianceDecision> {
        let mut matching: Vec<&ComplianceDecision> =
            self.rows.iter().filter(|d| query.matches(d, now)).collect();
        // Stable sort: ties keep insertion order
        matching.sort_by(|a, b| b.decision_timestamp.cmp(&a.decision_timestamp));

        Page::from_sorted(matching.into_iter().cloned().collect(), request)
    }

    /// Most recent non-superseded, non-expired decision of the slot
    pub(crate) fn active(
        &self,
        organization_id: &str,
        step: OnboardingStep,
        now: DateTime<Utc>,
    ) -> Option<&ComplianceDecision> {
        self.rows
            .iter()
            .filter(|d| d.belongs_to(organization_id, step) && d.is_active_at(now))
            .max_by_key(|d| d.decision_timestamp)
    }

    /// Non-superseded decisions of the slot made at or after `since`
    pub(crate) fn slot_since(
        &self,
        organization_id: &str,
        step: OnboardingStep,
        since: DateTime<Utc>,
    ) -> Vec<ComplianceDecision> {
        self.rows
            .iter()
            .filter(|d| {
                d.belongs_to(organization_id, step)
                    && !d.is_superseded()
                    && d.decision_timestamp >= since
            })
            .cloned()
            .collect()
    }

    pub(crate) fn review_due(&self, before: DateTime<Utc>) -> Vec<ComplianceDecision> {
        self.rows
            .iter()
            .filter(|d| !d.is_superseded() && d.is_review_due(before))
            .cloned()
            .collect()
    }

    pub(crate) fn expired(&self, now: DateTime<Utc>) -> Vec<ComplianceDecision> {
        self.rows
            .iter()
            .filter(|d| !d.is_superseded() && d.is_expired_at(now))
            .cloned()
            .collect()
    }
}
