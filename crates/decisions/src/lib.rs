//! RegLedger decision lifecycle
//!
//! Records policy-driven decisions for enterprise onboarding steps and keeps
//! them traceable through time:
//! - [`DecisionStore`]: write-once storage with supersession links
//! - [`DuplicateDetector`]: idempotent resubmission
//! - [`LifecycleScanner`]: review and expiry candidates
//! - [`DecisionLedger`]: submit → evaluate → record → supersede

mod book;
pub mod config;
pub mod duplicate;
pub mod engine;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod query;
pub mod scanner;
pub mod store;

pub use config::DecisionConfig;
pub use duplicate::DuplicateDetector;
pub use engine::{EvaluationRequest, ManualPolicyEngine, PolicyEngine, PolicyEvaluation};
pub use error::{DecisionError, DecisionResult};
pub use journal::{DecisionEvent, DecisionJournal, JournaledDecisionStore};
pub use ledger::{DecisionLedger, Submission, SubmissionRequest};
pub use query::DecisionQuery;
pub use scanner::{LifecycleReport, LifecycleScanner};
pub use store::{DecisionStore, InMemoryDecisionStore};
