//! Decision query filter

use chrono::{DateTime, Utc};
use regledger_core::{ComplianceDecision, DecisionOutcome, OnboardingStep};
use serde::{Deserialize, Serialize};

/// Filter for [`crate::DecisionStore::query_decisions`]
///
/// All criteria are conjunctive. Superseded and expired decisions are
/// excluded unless explicitly included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionQuery {
    pub organization_id: Option<String>,
    pub onboarding_session_id: Option<String>,
    pub step: Option<OnboardingStep>,
    pub outcome: Option<DecisionOutcome>,
    pub decision_maker: Option<String>,
    /// Inclusive lower bound on `decision_timestamp`
    pub from_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `decision_timestamp`
    pub to_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub include_superseded: bool,
    #[serde(default)]
    pub include_expired: bool,
    /// 1-based
    #[serde(default = "default_page")]
    pub page: u32,
    /// `None` uses the store's configured default
    pub page_size: Option<u32>,
}

fn default_page() -> u32 {
    1
}

impl Default for DecisionQuery {
    fn default() -> Self {
        Self {
            organization_id: None,
            onboarding_session_id: None,
            step: None,
            outcome: None,
            decision_maker: None,
            from_date: None,
            to_date: None,
            include_superseded: false,
            include_expired: false,
            page: default_page(),
            page_size: None,
        }
    }
}

impl DecisionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.onboarding_session_id = Some(session_id.into());
        self
    }

    pub fn with_step(mut self, step: OnboardingStep) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_outcome(mut self, outcome: DecisionOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_decision_maker(mut self, decision_maker: impl Into<String>) -> Self {
        self.decision_maker = Some(decision_maker.into());
        self
    }

    pub fn with_time_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from_date = Some(from);
        self.to_date = Some(to);
        self
    }

    pub fn including_superseded(mut self) -> Self {
        self.include_superseded = true;
        self
    }

    pub fn including_expired(mut self) -> Self {
        self.include_expired = true;
        self
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = Some(page_size);
        self
    }

    /// Whether `decision` passes every criterion at time `now`
    pub fn matches(&self, decision: &ComplianceDecision, now: DateTime<Utc>) -> bool {
        if !self.include_superseded && decision.is_superseded() {
            return false;
        }
        if !self.include_expired && decision.is_expired_at(now) {
            return false;
        }
        if let Some(ref org) = self.organization_id {
            if &decision.organization_id != org {
                return false;
            }
        }
        if let Some(ref session) = self.onboarding_session_id {
            if decision.onboarding_session_id.as_ref() != Some(session) {
                return false;
            }
        }
        if let Some(step) = self.step {
            if decision.step != step {
                return false;
            }
        }
        if let Some(outcome) = self.outcome {
            if decision.outcome != outcome {
                return false;
            }
        }
        if let Some(ref maker) = self.decision_maker {
            if &decision.decision_maker != maker {
                return false;
            }
        }
        if let Some(from) = self.from_date {
            if decision.decision_timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to_date {
            if decision.decision_timestamp > to {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn decision() -> ComplianceDecision {
        ComplianceDecision::new(
            "D1",
            "ACME",
            OnboardingStep::AmlScreening,
            DecisionOutcome::Approved,
            "screening-bot",
            "v1",
            Utc::now(),
        )
        .with_session("S1")
    }

    #[test]
    fn test_empty_query_matches_live_decision() {
        assert!(DecisionQuery::new().matches(&decision(), Utc::now()));
    }

    #[test]
    fn test_query_combined_filters() {
        let d = decision();
        let now = Utc::now();

        let q = DecisionQuery::new()
            .for_organization("ACME")
            .with_session("S1")
            .with_step(OnboardingStep::AmlScreening)
            .with_outcome(DecisionOutcome::Approved)
            .with_decision_maker("screening-bot");
        assert!(q.matches(&d, now));

        assert!(!q.clone().for_organization("GLOBEX").matches(&d, now));
        assert!(!q.clone().with_session("S2").matches(&d, now));
        assert!(!q.with_outcome(DecisionOutcome::Rejected).matches(&d, now));
    }

    #[test]
    fn test_time_range_is_inclusive() {
        let d = decision();
        let ts = d.decision_timestamp;

        assert!(DecisionQuery::new().with_time_range(ts, ts).matches(&d, ts));
        assert!(!DecisionQuery::new()
            .with_time_range(ts + Duration::seconds(1), ts + Duration::hours(1))
            .matches(&d, ts));
    }

    #[test]
    fn test_expired_excluded_unless_included() {
        let now = Utc::now();
        let d = decision();
        let ts = d.decision_timestamp;
        let d = d.with_expiry(ts);

        assert!(!DecisionQuery::new().matches(&d, now + Duration::seconds(1)));
        assert!(DecisionQuery::new()
            .including_expired()
            .matches(&d, now + Duration::seconds(1)));
    }
}
