//! CLI commands
//!
//! Each command prints its result and returns it, so the same functions
//! back the binary and the tests.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use regledger_audit::{
    find_tampered, AuditLogQuery, AuditLogSummary, EnterpriseAuditLogEntry, TamperedEntry,
};
use regledger_core::{
    ComplianceDecision, DecisionOutcome, EvidenceReference, OnboardingStep, Page,
};
use regledger_decisions::{
    DecisionQuery, DecisionStore, PolicyEvaluation, Submission, SubmissionRequest,
};

use crate::context::AppContext;

/// Operator-recorded evaluation of one slot
#[derive(Debug, Clone)]
pub struct RecordArgs {
    pub organization_id: String,
    pub step: OnboardingStep,
    pub outcome: DecisionOutcome,
    pub policy_version: String,
    pub evidence: Vec<EvidenceReference>,
    pub reason: Option<String>,
    pub session_id: Option<String>,
    pub decision_maker: String,
    pub decision_id: Option<String>,
    pub correlation_id: Option<String>,
    pub context: BTreeMap<String, String>,
}

/// Parse `TYPE:REFERENCE` into an evidence reference submitted at `now`
pub fn parse_evidence(raw: &str, now: DateTime<Utc>) -> anyhow::Result<EvidenceReference> {
    let Some((evidence_type, reference_id)) = raw.split_once(':') else {
        anyhow::bail!("Evidence must be TYPE:REFERENCE, got '{}'", raw);
    };
    if evidence_type.is_empty() || reference_id.is_empty() {
        anyhow::bail!("Evidence must be TYPE:REFERENCE, got '{}'", raw);
    }
    Ok(EvidenceReference::new(evidence_type, reference_id, now))
}

/// Parse `KEY=VALUE` policy context
pub fn parse_context(pairs: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => anyhow::bail!("Context must be KEY=VALUE, got '{}'", pair),
        })
        .collect()
}

/// Record a decision (or resolve to the one it duplicates)
pub async fn record(ctx: &AppContext, args: RecordArgs) -> anyhow::Result<Submission> {
    let mut evaluation = PolicyEvaluation::new(args.outcome, args.policy_version);
    if let Some(reason) = args.reason {
        evaluation = evaluation.with_reason(reason);
    }
    let ledger = ctx.ledger(evaluation);

    let mut request = SubmissionRequest::new(args.organization_id, args.step, args.decision_maker)
        .with_evidence(args.evidence);
    request.decision_id = args.decision_id;
    request.onboarding_session_id = args.session_id;
    request.correlation_id = args.correlation_id;
    request.context = args.context;

    let submission = ledger.submit(request).await?;
    let d = &submission.decision;

    if submission.created {
        println!("✅ Recorded {} ({} / {} → {})", d.id, d.organization_id, d.step, d.outcome);
        if let Some(ref prior) = submission.superseded_decision_id {
            println!("   Superseded {}", prior);
        }
        if let Some(expires_at) = d.expires_at {
            println!("   Expires {}", expires_at);
        }
        if let Some(review) = d.next_review_date {
            println!("   Review due {}", review);
        }
    } else {
        println!("↩️  Duplicate submission, existing decision {} ({})", d.id, d.outcome);
    }

    Ok(submission)
}

/// Print one decision in full
pub async fn show(ctx: &AppContext, decision_id: &str) -> anyhow::Result<Option<ComplianceDecision>> {
    let decision = ctx.store.get_decision_by_id(decision_id).await?;
    match decision {
        Some(ref d) => println!("{}", serde_json::to_string_pretty(d)?),
        None => println!("Decision {} not found", decision_id),
    }
    Ok(decision)
}

pub async fn query(
    ctx: &AppContext,
    query: &DecisionQuery,
) -> anyhow::Result<Page<ComplianceDecision>> {
    let page = ctx.store.query_decisions(query).await?;

    println!(
        "Decisions: page {} of {} ({} total)",
        page.page,
        page.total_pages().max(1),
        page.total_count
    );
    print_decisions(&page.items);
    Ok(page)
}

pub async fn active(
    ctx: &AppContext,
    organization_id: &str,
    step: OnboardingStep,
) -> anyhow::Result<Option<ComplianceDecision>> {
    let decision = ctx.store.get_active_decision(organization_id, step).await?;
    match decision {
        Some(ref d) => print_decisions(std::slice::from_ref(d)),
        None => println!("No active decision for {} / {}", organization_id, step),
    }
    Ok(decision)
}

pub async fn supersede(
    ctx: &AppContext,
    decision_id: &str,
    superseded_by_id: &str,
) -> anyhow::Result<bool> {
    let applied = ctx
        .store
        .supersede_decision(decision_id, superseded_by_id)
        .await?;

    if applied {
        println!("✅ {} superseded by {}", decision_id, superseded_by_id);
    } else {
        println!("❌ {} cannot be superseded by {}", decision_id, superseded_by_id);
    }
    Ok(applied)
}

/// Replace a decision with an `Expired` successor
pub async fn expire(
    ctx: &AppContext,
    decision_id: &str,
    decision_maker: &str,
) -> anyhow::Result<Submission> {
    // The policy engine is not consulted for expiry
    let ledger = ctx.ledger(PolicyEvaluation::new(DecisionOutcome::Expired, "n/a"));
    let submission = ledger.record_expiry(decision_id, decision_maker).await?;

    println!(
        "✅ {} expired; successor {}",
        decision_id, submission.decision.id
    );
    Ok(submission)
}

pub async fn chain(ctx: &AppContext, decision_id: &str) -> anyhow::Result<Vec<ComplianceDecision>> {
    let ledger = ctx.ledger(PolicyEvaluation::new(DecisionOutcome::Pending, "n/a"));
    let chain = ledger.supersession_chain(decision_id).await?;

    println!("Supersession chain ({} decisions):", chain.len());
    print_decisions(&chain);
    Ok(chain)
}

pub async fn review_due(
    ctx: &AppContext,
    before: Option<DateTime<Utc>>,
) -> anyhow::Result<Vec<ComplianceDecision>> {
    let due = ctx.scanner().decisions_requiring_review(before).await?;

    if due.is_empty() {
        println!("No decisions due for review");
    } else {
        println!("Due for review ({}):", due.len());
        print_decisions(&due);
    }
    Ok(due)
}

pub async fn expired(ctx: &AppContext) -> anyhow::Result<Vec<ComplianceDecision>> {
    let expired = ctx.scanner().expired_decisions().await?;

    if expired.is_empty() {
        println!("No expired decisions");
    } else {
        println!("Expired ({}):", expired.len());
        print_decisions(&expired);
    }
    Ok(expired)
}

/// One page of the unified audit view; optionally export the full set
pub async fn audit(
    ctx: &AppContext,
    query: &AuditLogQuery,
    export: Option<&Path>,
) -> anyhow::Result<Page<EnterpriseAuditLogEntry>> {
    let page = ctx.aggregator.get_audit_log(query).await?;

    println!(
        "Audit log: page {} of {} ({} total)",
        page.page,
        page.total_pages().max(1),
        page.total_count
    );
    println!("{:-<100}", "");
    println!(
        "{:<20} | {:<18} | {:<18} | {:>8} | {:<16} | {:<7}",
        "Performed at", "Category", "Action", "Asset", "Performed by", "Success"
    );
    println!("{:-<100}", "");
    for entry in &page.items {
        println!(
            "{:<20} | {:<18} | {:<18} | {:>8} | {:<16} | {:<7}",
            entry.performed_at.format("%Y-%m-%d %H:%M:%S"),
            entry.category,
            entry.action_type,
            entry.asset_id.map(|id| id.to_string()).unwrap_or_default(),
            entry.performed_by,
            entry.success,
        );
    }

    if let Some(path) = export {
        let entries = ctx.aggregator.collect(query).await?;
        let mut file = std::fs::File::create(path)?;
        for entry in &entries {
            writeln!(file, "{}", serde_json::to_string(entry)?)?;
        }
        println!("✅ Exported {} entries to {}", entries.len(), path.display());
    }

    Ok(page)
}

pub async fn audit_summary(
    ctx: &AppContext,
    query: &AuditLogQuery,
) -> anyhow::Result<AuditLogSummary> {
    let summary = ctx.aggregator.get_audit_log_summary(query).await?;

    println!("Audit summary ({} events)", summary.total_events);
    println!("  Whitelist:           {}", summary.whitelist_events);
    println!("    Transfer checks:   {}", summary.transfer_validation_events);
    println!("  Blacklist:           {}", summary.blacklist_events);
    println!("  Compliance:          {}", summary.compliance_events);
    println!("  Token issuance:      {}", summary.token_issuance_events);
    println!("  Successful / failed: {} / {}", summary.successful_events, summary.failed_events);
    println!("  Networks:            {}", summary.networks.join(", "));
    println!(
        "  Assets:              {}",
        summary
            .asset_ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    match summary.date_range {
        Some(range) => println!("  Range:               {} .. {}", range.from, range.to),
        None => println!("  Range:               -"),
    }

    Ok(summary)
}

/// Recompute payload hashes of an exported JSONL file
pub fn audit_verify(path: &Path) -> anyhow::Result<Vec<TamperedEntry>> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    let mut entries = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: EnterpriseAuditLogEntry = serde_json::from_str(&line)
            .map_err(|e| anyhow::anyhow!("Line {}: {}", i + 1, e))?;
        entries.push(entry);
    }

    let tampered = find_tampered(&entries);
    if tampered.is_empty() {
        println!("✅ Payload hashes verified ({} entries)", entries.len());
    } else {
        for t in &tampered {
            println!("❌ {}: stored {} but content hashes to {}", t.id, t.actual, t.expected);
        }
    }
    Ok(tampered)
}

fn print_decisions(decisions: &[ComplianceDecision]) {
    if decisions.is_empty() {
        return;
    }

    println!("{:-<110}", "");
    println!(
        "{:<36} | {:<12} | {:<28} | {:<22} | {:<20}",
        "ID", "Organization", "Step", "Outcome", "Decided at"
    );
    println!("{:-<110}", "");
    for d in decisions {
        let marker = if d.is_superseded() { " (superseded)" } else { "" };
        println!(
            "{:<36} | {:<12} | {:<28} | {:<22} | {:<20}{}",
            d.id,
            d.organization_id,
            d.step,
            d.outcome,
            d.decision_timestamp.format("%Y-%m-%d %H:%M:%S"),
            marker
        );
    }
}
