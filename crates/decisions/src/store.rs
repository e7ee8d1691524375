//! Decision store interface and in-memory implementation

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regledger_core::{Clock, ComplianceDecision, OnboardingStep, Page, SystemClock};
use tokio::sync::RwLock;

use crate::book::{DecisionBook, SupersessionCheck};
use crate::config::DecisionConfig;
use crate::error::DecisionResult;
use crate::query::DecisionQuery;

/// Storage for compliance decisions
///
/// Decisions are write-once. The only post-creation change is the
/// supersession link recorded by [`DecisionStore::supersede_decision`].
#[async_trait]
pub trait DecisionStore: Send + Sync {
    /// Append a new decision.
    ///
    /// Fails with `DecisionError::AlreadyExists` when the id is taken and
    /// `DecisionError::Validation` when the decision breaks a write-time
    /// invariant.
    async fn create_decision(&self, decision: ComplianceDecision) -> DecisionResult<()>;

    /// Point lookup; `None` for an unknown id
    async fn get_decision_by_id(&self, id: &str) -> DecisionResult<Option<ComplianceDecision>>;

    /// Filtered page ordered by `decision_timestamp` descending
    async fn query_decisions(&self, query: &DecisionQuery)
        -> DecisionResult<Page<ComplianceDecision>>;

    /// Most recent non-superseded, non-expired decision of the slot
    async fn get_active_decision(
        &self,
        organization_id: &str,
        step: OnboardingStep,
    ) -> DecisionResult<Option<ComplianceDecision>>;

    /// Mark `decision_id` as replaced by `superseded_by_id`.
    ///
    /// Returns `false` when the link cannot be recorded (unknown target or
    /// replacement, replacement not strictly newer, or already replaced by a
    /// different decision).
    async fn supersede_decision(
        &self,
        decision_id: &str,
        superseded_by_id: &str,
    ) -> DecisionResult<bool>;

    /// Non-superseded decisions of the slot made at or after `since`
    async fn recent_slot_decisions(
        &self,
        organization_id: &str,
        step: OnboardingStep,
        since: DateTime<Utc>,
    ) -> DecisionResult<Vec<ComplianceDecision>>;

    /// Non-superseded decisions whose review is due on or before `before`
    async fn review_candidates(&self, before: DateTime<Utc>)
        -> DecisionResult<Vec<ComplianceDecision>>;

    /// Non-superseded decisions with `expires_at <= now`
    async fn expiry_candidates(&self, now: DateTime<Utc>)
        -> DecisionResult<Vec<ComplianceDecision>>;

    /// Number of stored decisions, superseded ones included
    async fn len(&self) -> DecisionResult<usize>;
}

/// Volatile decision store guarded by a single reader/writer lock
pub struct InMemoryDecisionStore {
    book: RwLock<DecisionBook>,
    config: DecisionConfig,
    clock: Arc<dyn Clock>,
}

impl InMemoryDecisionStore {
    pub fn new(config: DecisionConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: DecisionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            book: RwLock::new(DecisionBook::default()),
            config,
            clock,
        }
    }
}

impl Default for InMemoryDecisionStore {
    fn default() -> Self {
        Self::new(DecisionConfig::default())
    }
}

#[async_trait]
impl DecisionStore for InMemoryDecisionStore {
    async fn create_decision(&self, decision: ComplianceDecision) -> DecisionResult<()> {
        let id = decision.id.clone();
        let mut book = self.book.write().await;

        match book.insert(decision) {
            Ok(()) => {
                tracing::debug!(decision_id = %id, "Decision created");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(decision_id = %id, error = %e, "Decision rejected");
                Err(e)
            }
        }
    }

    async fn get_decision_by_id(&self, id: &str) -> DecisionResult<Option<ComplianceDecision>> {
        Ok(self.book.read().await.get(id).cloned())
    }

    async fn query_decisions(
        &self,
        query: &DecisionQuery,
    ) -> DecisionResult<Page<ComplianceDecision>> {
        let request = self.config.page_request(query.page, query.page_size)?;
        let now = self.clock.now();
        Ok(self.book.read().await.query(query, request, now))
    }

    async fn get_active_decision(
        &self,
        organization_id: &str,
        step: OnboardingStep,
    ) -> DecisionResult<Option<ComplianceDecision>> {
        let now = self.clock.now();
        Ok(self
            .book
            .read()
            .await
            .active(organization_id, step, now)
            .cloned())
    }

    async fn supersede_decision(
        &self,
        decision_id: &str,
        superseded_by_id: &str,
    ) -> DecisionResult<bool> {
        let now = self.clock.now();
        let mut book = self.book.write().await;

        match book.check_supersession(decision_id, superseded_by_id, now) {
            SupersessionCheck::Apply(patch) => {
                book.apply(&patch)?;
                tracing::info!(
                    decision_id = %decision_id,
                    superseded_by = %superseded_by_id,
                    "Decision superseded"
                );
                Ok(true)
            }
            SupersessionCheck::AlreadyApplied => Ok(true),
            SupersessionCheck::Refused(reason) => {
                tracing::warn!(
                    decision_id = %decision_id,
                    superseded_by = %superseded_by_id,
                    reason = %reason,
                    "Supersession refused"
                );
                Ok(false)
            }
        }
    }

    async fn recent_slot_decisions(
        &self,
        organization_id: &str,
        step: OnboardingStep,
        since: DateTime<Utc>,
    ) -> DecisionResult<Vec<ComplianceDecision>> {
        Ok(self.book.read().await.slot_since(organization_id, step, since))
    }

    async fn review_candidates(
        &self,
        before: DateTime<Utc>,
    ) -> DecisionResult<Vec<ComplianceDecision>> {
        Ok(self.book.read().await.review_due(before))
    }

    async fn expiry_candidates(
        &self,
        now: DateTime<Utc>,
    ) -> DecisionResult<Vec<ComplianceDecision>> {
        Ok(self.book.read().await.expired(now))
    }

    async fn len(&self) -> DecisionResult<usize> {
        Ok(self.book.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use regledger_core::{CoreError, DecisionOutcome, ManualClock, PaginationMode};

    use crate::error::DecisionError;

    fn decision(id: &str, org: &str, at: DateTime<Utc>) -> ComplianceDecision {
        ComplianceDecision::new(
            id,
            org,
            OnboardingStep::KycKybVerification,
            DecisionOutcome::Approved,
            "policy-engine",
            "v1",
            at,
        )
    }

    fn store_at(now: DateTime<Utc>) -> (InMemoryDecisionStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(now));
        let store = InMemoryDecisionStore::with_clock(DecisionConfig::default(), clock.clone());
        (store, clock)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let now = Utc::now();
        let (store, _) = store_at(now);

        store.create_decision(decision("D1", "ACME", now)).await.unwrap();

        let found = store.get_decision_by_id("D1").await.unwrap().unwrap();
        assert_eq!(found.organization_id, "ACME");
        assert!(store.get_decision_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_id_conflicts_without_touching_existing() {
        let now = Utc::now();
        let (store, _) = store_at(now);

        store.create_decision(decision("D1", "ACME", now)).await.unwrap();
        let err = store
            .create_decision(decision("D1", "GLOBEX", now))
            .await
            .unwrap_err();

        assert!(matches!(err, DecisionError::AlreadyExists(ref id) if id == "D1"));
        let kept = store.get_decision_by_id("D1").await.unwrap().unwrap();
        assert_eq!(kept.organization_id, "ACME");
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_expiry() {
        let now = Utc::now();
        let (store, _) = store_at(now);
        let bad = decision("D1", "ACME", now).with_expiry(now - Duration::hours(1));

        let err = store.create_decision(bad).await.unwrap_err();
        assert!(matches!(err, DecisionError::Validation(_)));
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_supersede_unknown_target_returns_false() {
        let now = Utc::now();
        let (store, _) = store_at(now);
        store.create_decision(decision("D2", "ACME", now)).await.unwrap();

        assert!(!store.supersede_decision("missing", "D2").await.unwrap());
    }

    #[tokio::test]
    async fn test_supersede_requires_newer_replacement() {
        let now = Utc::now();
        let (store, _) = store_at(now);
        store.create_decision(decision("D1", "ACME", now)).await.unwrap();
        store
            .create_decision(decision("D0", "ACME", now - Duration::minutes(1)))
            .await
            .unwrap();

        assert!(!store.supersede_decision("D1", "D0").await.unwrap());
        let d1 = store.get_decision_by_id("D1").await.unwrap().unwrap();
        assert!(!d1.is_superseded());
    }

    #[tokio::test]
    async fn test_supersede_sets_triple_and_is_idempotent() {
        let now = Utc::now();
        let (store, clock) = store_at(now);
        store.create_decision(decision("D1", "ACME", now)).await.unwrap();
        store
            .create_decision(decision("D2", "ACME", now + Duration::seconds(1)))
            .await
            .unwrap();

        clock.advance(Duration::minutes(5));
        assert!(store.supersede_decision("D1", "D2").await.unwrap());
        assert!(store.supersede_decision("D1", "D2").await.unwrap());

        let d1 = store.get_decision_by_id("D1").await.unwrap().unwrap();
        assert!(d1.is_superseded());
        assert_eq!(d1.superseded_by_id(), Some("D2"));
        assert_eq!(d1.superseded_at(), Some(now + Duration::minutes(5)));
    }

    #[tokio::test]
    async fn test_active_decision_skips_superseded_and_expired() {
        let now = Utc::now();
        let (store, clock) = store_at(now);

        store
            .create_decision(decision("D1", "ACME", now - Duration::hours(2)))
            .await
            .unwrap();
        store
            .create_decision(
                decision("D2", "ACME", now - Duration::hours(1)).with_expiry(now + Duration::hours(1)),
            )
            .await
            .unwrap();

        let active = store
            .get_active_decision("ACME", OnboardingStep::KycKybVerification)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.id, "D2");

        // D2 expires, D1 becomes active again
        clock.advance(Duration::hours(2));
        let active = store
            .get_active_decision("ACME", OnboardingStep::KycKybVerification)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.id, "D1");

        assert!(store
            .get_active_decision("ACME", OnboardingStep::AmlScreening)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_query_page_size_clamped() {
        let now = Utc::now();
        let (store, _) = store_at(now);
        for i in 0..120 {
            store
                .create_decision(decision(&format!("D{:03}", i), "ACME", now - Duration::seconds(i)))
                .await
                .unwrap();
        }

        let page = store
            .query_decisions(&DecisionQuery::new().with_page(1, 500))
            .await
            .unwrap();

        assert_eq!(page.page_size, 100);
        assert_eq!(page.items.len(), 100);
        assert_eq!(page.total_count, 120);
        assert_eq!(page.items[0].id, "D000");
    }

    #[tokio::test]
    async fn test_query_reject_mode() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let config = DecisionConfig {
            pagination: PaginationMode::Reject,
            ..Default::default()
        };
        let store = InMemoryDecisionStore::with_clock(config, clock);

        let err = store
            .query_decisions(&DecisionQuery::new().with_page(0, 10))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DecisionError::Validation(CoreError::InvalidPagination { .. })
        ));
    }

    #[tokio::test]
    async fn test_query_excludes_superseded_unless_included() {
        let now = Utc::now();
        let (store, _) = store_at(now);
        store.create_decision(decision("D1", "ACME", now)).await.unwrap();
        store
            .create_decision(decision("D2", "ACME", now + Duration::seconds(1)))
            .await
            .unwrap();
        store.supersede_decision("D1", "D2").await.unwrap();

        let live = store.query_decisions(&DecisionQuery::new()).await.unwrap();
        assert_eq!(live.total_count, 1);
        assert_eq!(live.items[0].id, "D2");

        let all = store
            .query_decisions(&DecisionQuery::new().including_superseded())
            .await
            .unwrap();
        assert_eq!(all.total_count, 2);
    }
}
