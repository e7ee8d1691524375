//! Application context - wires everything together
//!
//! Data directory layout:
//!
//! ```text
//! <data>/decisions.jsonl          decision journal
//! <data>/audit/whitelist.jsonl    whitelist/transfer-validation export
//! <data>/audit/compliance.jsonl   compliance-metadata export
//! <data>/audit/token_issuance.jsonl
//! ```

use std::path::Path;
use std::sync::Arc;

use regledger_audit::{
    AuditAggregator, ComplianceAuditEntry, JsonlAuditSource, TokenIssuanceAuditEntry,
    WhitelistAuditEntry,
};
use regledger_core::{Clock, SystemClock};
use regledger_decisions::{
    DecisionLedger, DecisionStore, JournaledDecisionStore, LifecycleScanner, ManualPolicyEngine,
    PolicyEvaluation,
};

use crate::config::RegLedgerConfig;

pub struct AppContext {
    pub config: RegLedgerConfig,
    pub store: Arc<JournaledDecisionStore>,
    pub aggregator: AuditAggregator,
    clock: Arc<dyn Clock>,
}

impl AppContext {
    pub fn new(data_path: impl AsRef<Path>, config: RegLedgerConfig) -> anyhow::Result<Self> {
        Self::with_clock(data_path, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        data_path: impl AsRef<Path>,
        config: RegLedgerConfig,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let data_path = data_path.as_ref().to_path_buf();
        let audit_path = data_path.join("audit");
        std::fs::create_dir_all(&audit_path)?;

        // Replays the journal
        let store = Arc::new(JournaledDecisionStore::open_with_clock(
            data_path.join("decisions.jsonl"),
            config.decisions.clone(),
            clock.clone(),
        )?);

        let aggregator = AuditAggregator::new(
            Arc::new(JsonlAuditSource::<WhitelistAuditEntry>::new(
                "whitelist",
                audit_path.join("whitelist.jsonl"),
            )),
            Arc::new(JsonlAuditSource::<ComplianceAuditEntry>::new(
                "compliance",
                audit_path.join("compliance.jsonl"),
            )),
            Arc::new(JsonlAuditSource::<TokenIssuanceAuditEntry>::new(
                "token_issuance",
                audit_path.join("token_issuance.jsonl"),
            )),
            config.audit.clone(),
        );

        Ok(Self {
            config,
            store,
            aggregator,
            clock,
        })
    }

    /// Ledger whose policy engine records the operator's judgment
    pub fn ledger(&self, evaluation: PolicyEvaluation) -> DecisionLedger {
        let engine = Arc::new(ManualPolicyEngine::with_evaluation(
            evaluation.policy_version.clone(),
            evaluation,
        ));
        DecisionLedger::with_clock(
            self.store.clone() as Arc<dyn DecisionStore>,
            engine,
            self.config.decisions.clone(),
            self.clock.clone(),
        )
    }

    pub fn scanner(&self) -> LifecycleScanner {
        LifecycleScanner::new(self.store.clone(), self.clock.clone())
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
