//! RegLedger core domain types
//!
//! Shared by the decision ledger and the audit aggregator:
//!
//! - [`decision::ComplianceDecision`] - write-once ledger entry for an onboarding step
//! - [`decision::SupersessionPatch`] - the only mutation a stored decision accepts
//! - [`evidence::EvidenceReference`] - pointer to supporting evidence
//! - [`policy::PolicyRule`] / [`policy::PolicyRuleEvaluation`] - carried, never executed
//! - [`page::PageRequest`] / [`page::Page`] - shared pagination semantics
//! - [`clock::Clock`] - time source seam

pub mod clock;
pub mod decision;
pub mod error;
pub mod evidence;
pub mod page;
pub mod policy;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::{
    ComplianceDecision, DecisionOutcome, OnboardingStep, Supersession, SupersessionPatch,
};
pub use error::{CoreError, CoreResult};
pub use evidence::{EvidenceReference, VerificationStatus};
pub use page::{Page, PageRequest, PaginationMode};
pub use policy::{PolicyRule, PolicyRuleEvaluation, RuleSeverity};
