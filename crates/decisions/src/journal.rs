//! Decision journal - append-only JSONL persistence
//!
//! Every accepted write becomes one line:
//!
//! ```text
//! {"event_type":"created","decision":{...}}
//! {"event_type":"superseded","patch":{"decision_id":"D1","superseded_by_id":"D2",...}}
//! ```
//!
//! Lines are never rewritten. Opening a journal replays it into memory.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regledger_core::{
    Clock, ComplianceDecision, OnboardingStep, Page, SupersessionPatch, SystemClock,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::book::{DecisionBook, SupersessionCheck};
use crate::config::DecisionConfig;
use crate::error::{DecisionError, DecisionResult};
use crate::query::DecisionQuery;
use crate::store::DecisionStore;

/// One journal line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum DecisionEvent {
    Created { decision: ComplianceDecision },
    Superseded { patch: SupersessionPatch },
}

/// Append-only JSONL file of [`DecisionEvent`]s
pub struct DecisionJournal {
    path: PathBuf,
    file: File,
}

impl DecisionJournal {
    /// Open (creating if needed) the journal at `path`
    pub fn open(path: impl AsRef<Path>) -> DecisionResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self { path, file })
    }

    pub fn append(&mut self, event: &DecisionEvent) -> DecisionResult<()> {
        let json = serde_json::to_string(event)?;
        writeln!(self.file, "{}", json)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn read_all(&self) -> DecisionResult<Vec<DecisionEvent>> {
        Ok(self
            .read_numbered()?
            .into_iter()
            .map(|(_, event)| event)
            .collect())
    }

    /// Events paired with their 1-based file line; blank lines are skipped
    pub fn read_numbered(&self) -> DecisionResult<Vec<(usize, DecisionEvent)>> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut events = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event = serde_json::from_str(&line).map_err(|e| DecisionError::JournalCorrupt {
                line: i + 1,
                message: e.to_string(),
            })?;
            events.push((i + 1, event));
        }

        Ok(events)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

struct JournaledState {
    book: DecisionBook,
    journal: DecisionJournal,
}

/// Decision store that journals every write before applying it in memory
pub struct JournaledDecisionStore {
    state: RwLock<JournaledState>,
    config: DecisionConfig,
    clock: Arc<dyn Clock>,
}

impl JournaledDecisionStore {
    /// Open the journal at `path` and replay it
    pub fn open(path: impl AsRef<Path>, config: DecisionConfig) -> DecisionResult<Self> {
        Self::open_with_clock(path, config, Arc::new(SystemClock))
    }

    pub fn open_with_clock(
        path: impl AsRef<Path>,
        config: DecisionConfig,
        clock: Arc<dyn Clock>,
    ) -> DecisionResult<Self> {
        let journal = DecisionJournal::open(path)?;
        let book = Self::replay(&journal)?;

        tracing::info!(
            path = %journal.path().display(),
            decisions = book.len(),
            "Decision journal replayed"
        );

        Ok(Self {
            state: RwLock::new(JournaledState { book, journal }),
            config,
            clock,
        })
    }

    fn replay(journal: &DecisionJournal) -> DecisionResult<DecisionBook> {
        let mut book = DecisionBook::default();

        for (line, event) in journal.read_numbered()? {
            let applied = match event {
                DecisionEvent::Created { decision } => book.insert(decision),
                DecisionEvent::Superseded { patch } => book.apply(&patch),
            };
            applied.map_err(|e| DecisionError::JournalCorrupt {
                line,
                message: e.to_string(),
            })?;
        }

        Ok(book)
    }
}

#[async_trait]
impl DecisionStore for JournaledDecisionStore {
    async fn create_decision(&self, decision: ComplianceDecision) -> DecisionResult<()> {
        let mut state = self.state.write().await;

        if let Err(e) = state.book.check_insert(&decision) {
            tracing::warn!(decision_id = %decision.id, error = %e, "Decision rejected");
            return Err(e);
        }

        state.journal.append(&DecisionEvent::Created {
            decision: decision.clone(),
        })?;

        tracing::debug!(decision_id = %decision.id, "Decision journaled");
        state.book.insert(decision)
    }

    async fn get_decision_by_id(&self, id: &str) -> DecisionResult<Option<ComplianceDecision>> {
        Ok(self.state.read().await.book.get(id).cloned())
    }

    async fn query_decisions(
        &self,
        query: &DecisionQuery,
    ) -> DecisionResult<Page<ComplianceDecision>> {
        let request = self.config.page_request(query.page, query.page_size)?;
        let now = self.clock.now();
        Ok(self.state.read().await.book.query(query, request, now))
    }

    async fn get_active_decision(
        &self,
        organization_id: &str,
        step: OnboardingStep,
    ) -> DecisionResult<Option<ComplianceDecision>> {
        let now = self.clock.now();
        Ok(self
            .state
            .read()
            .await
            .book
            .active(organization_id, step, now)
            .cloned())
    }

    async fn supersede_decision(
        &self,
        decision_id: &str,
        superseded_by_id: &str,
    ) -> DecisionResult<bool> {
        let now = self.clock.now();
        let mut state = self.state.write().await;

        match state.book.check_supersession(decision_id, superseded_by_id, now) {
            SupersessionCheck::Apply(patch) => {
                state
                    .journal
                    .append(&DecisionEvent::Superseded { patch: patch.clone() })?;
                state.book.apply(&patch)?;
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
        Ok(self
            .state
            .read()
            .await
            .book
            .slot_since(organization_id, step, since))
    }

    async fn review_candidates(
        &self,
        before: DateTime<Utc>,
    ) -> DecisionResult<Vec<ComplianceDecision>> {
        Ok(self.state.read().await.book.review_due(before))
    }

    async fn expiry_candidates(
        &self,
        now: DateTime<Utc>,
    ) -> DecisionResult<Vec<ComplianceDecision>> {
        Ok(self.state.read().await.book.expired(now))
    }

    async fn len(&self) -> DecisionResult<usize> {
        Ok(self.state.read().await.book.len())
    }
}
