//! Lifecycle scans
//!
//! Read-only queries run by an external periodic job. Acting on the
//! results (an `Expired` successor, a fresh evaluation) happens elsewhere
//! and always goes through a new decision plus supersession.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use regledger_core::{Clock, ComplianceDecision};
use serde::{Deserialize, Serialize};

use crate::error::DecisionResult;
use crate::store::DecisionStore;

/// Result of one combined scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleReport {
    pub scanned_at: DateTime<Utc>,
    pub review_due: Vec<ComplianceDecision>,
    pub expired: Vec<ComplianceDecision>,
}

impl LifecycleReport {
    pub fn is_clean(&self) -> bool {
        self.review_due.is_empty() && self.expired.is_empty()
    }
}

pub struct LifecycleScanner {
    store: Arc<dyn DecisionStore>,
    clock: Arc<dyn Clock>,
}

impl LifecycleScanner {
    pub fn new(store: Arc<dyn DecisionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Non-superseded decisions with a review due on or before `before`
    /// (default now), most overdue first
    pub async fn decisions_requiring_review(
        &self,
        before: Option<DateTime<Utc>>,
    ) -> DecisionResult<Vec<ComplianceDecision>> {
        let before = before.unwrap_or_else(|| self.clock.now());
        let mut due = self.store.review_candidates(before).await?;
        due.sort_by_key(|d| d.next_review_date);
        Ok(due)
    }

    /// Non-superseded decisions with `expires_at <= now`, earliest first
    pub async fn expired_decisions(&self) -> DecisionResult<Vec<ComplianceDecision>> {
        let mut expired = self.store.expiry_candidates(self.clock.now()).await?;
        expired.sort_by_key(|d| d.expires_at);
        Ok(expired)
    }

    /// Both scans against the same instant
    pub async fn scan(&self) -> DecisionResult<LifecycleReport> {
        let scanned_at = self.clock.now();

        let mut review_due = self.store.review_candidates(scanned_at).await?;
        review_due.sort_by_key(|d| d.next_review_date);
        let mut expired = self.store.expiry_candidates(scanned_at).await?;
        expired.sort_by_key(|d| d.expires_at);

        tracing::info!(
            review_due = review_due.len(),
            expired = expired.len(),
            "Lifecycle scan completed"
        );

        Ok(LifecycleReport {
            scanned_at,
            review_due,
            expired,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use regledger_core::{DecisionOutcome, ManualClock, OnboardingStep};

    use crate::config::DecisionConfig;
    use crate::store::InMemoryDecisionStore;

    fn decision(id: &str, at: DateTime<Utc>) -> ComplianceDecision {
        ComplianceDecision::new(
            id,
            "ACME",
            OnboardingStep::CustodyVerification,
            DecisionOutcome::ConditionalApproval,
            "custody-desk",
            "v1",
            at,
        )
    }

    fn setup(now: DateTime<Utc>) -> (LifecycleScanner, Arc<InMemoryDecisionStore>) {
        let clock = Arc::new(ManualClock::new(now));
        let store = Arc::new(InMemoryDecisionStore::with_clock(
            DecisionConfig::default(),
            clock.clone(),
        ));
        (LifecycleScanner::new(store.clone(), clock), store)
    }

    #[tokio::test]
    async fn test_review_due_most_overdue_first() {
        let now = Utc::now();
        let (scanner, store) = setup(now);
        let t0 = now - Duration::days(30);

        store
            .create_decision(decision("D1", t0).with_review(now - Duration::days(1)))
            .await
            .unwrap();
        store
            .create_decision(decision("D2", t0).with_review(now - Duration::days(5)))
            .await
            .unwrap();
        store
            .create_decision(decision("D3", t0).with_review(now + Duration::days(5)))
            .await
            .unwrap();

        let due = scanner.decisions_requiring_review(None).await.unwrap();
        let ids: Vec<_> = due.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["D2", "D1"]);

        let later = scanner
            .decisions_requiring_review(Some(now + Duration::days(10)))
            .await
            .unwrap();
        assert_eq!(later.len(), 3);
    }

    #[tokio::test]
    async fn test_review_date_without_flag_is_ignored() {
        let now = Utc::now();
        let (scanner, store) = setup(now);
        let mut d = decision("D1", now - Duration::days(2));
        d.next_review_date = Some(now - Duration::days(1));
        store.create_decision(d).await.unwrap();

        assert!(scanner.decisions_requiring_review(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_sorted_and_excludes_superseded() {
        let now = Utc::now();
        let (scanner, store) = setup(now);
        let t0 = now - Duration::days(30);

        store
            .create_decision(decision("D1", t0).with_expiry(now - Duration::days(1)))
            .await
            .unwrap();
        store
            .create_decision(decision("D2", t0).with_expiry(now - Duration::days(3)))
            .await
            .unwrap();
        store
            .create_decision(decision("D3", t0).with_expiry(now + Duration::days(3)))
            .await
            .unwrap();
        store
            .create_decision(
                decision("D4", t0 - Duration::days(1)).with_expiry(now - Duration::days(10)),
            )
            .await
            .unwrap();
        store.supersede_decision("D4", "D1").await.unwrap();

        let expired = scanner.expired_decisions().await.unwrap();
        let ids: Vec<_> = expired.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["D2", "D1"]);
    }

    #[tokio::test]
    async fn test_scan_report() {
        let now = Utc::now();
        let (scanner, store) = setup(now);

        let report = scanner.scan().await.unwrap();
        assert!(report.is_clean());

        store
            .create_decision(
                decision("D1", now - Duration::days(1)).with_expiry(now - Duration::hours(1)),
            )
            .await
            .unwrap();
        let report = scanner.scan().await.unwrap();
        assert_eq!(report.expired.len(), 1);
        assert!(report.review_due.is_empty());
        assert_eq!(report.scanned_at, now);
    }
}
