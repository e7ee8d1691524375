//! RegLedger CLI - Main entry point

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use regledger_audit::{AuditCategory, AuditLogQuery};
use regledger_cli::commands::{self, RecordArgs};
use regledger_cli::{AppContext, RegLedgerConfig};
use regledger_core::{Clock, DecisionOutcome, OnboardingStep};
use regledger_decisions::DecisionQuery;

#[derive(Parser)]
#[command(name = "regledger")]
#[command(about = "RegLedger - compliance decision ledger and unified audit view", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a decision for an organization's onboarding step
    Record {
        /// Organization ID
        organization: String,
        /// Onboarding step (e.g. kyc_kyb_verification)
        step: OnboardingStep,
        /// Outcome (e.g. approved, rejected, conditional_approval)
        outcome: DecisionOutcome,
        /// Evidence as TYPE:REFERENCE (repeatable)
        #[arg(short, long = "evidence")]
        evidence: Vec<String>,
        /// Policy version the outcome was reached under
        #[arg(long, default_value = "v1")]
        policy_version: String,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        session: Option<String>,
        #[arg(long, default_value = "cli-operator")]
        decision_maker: String,
        /// Decision ID (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        correlation_id: Option<String>,
        /// Policy context as KEY=VALUE (repeatable)
        #[arg(long = "context")]
        context: Vec<String>,
    },

    /// Show one decision
    Show { id: String },

    /// Query decisions
    Query {
        #[arg(long)]
        organization: Option<String>,
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        step: Option<OnboardingStep>,
        #[arg(long)]
        outcome: Option<DecisionOutcome>,
        #[arg(long)]
        decision_maker: Option<String>,
        /// RFC 3339 lower bound on decision time
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        /// RFC 3339 upper bound on decision time
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        #[arg(long)]
        include_superseded: bool,
        #[arg(long)]
        include_expired: bool,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Show the active decision of a slot
    Active {
        organization: String,
        step: OnboardingStep,
    },

    /// Mark a decision as superseded by a newer one
    Supersede {
        /// Decision being replaced
        id: String,
        /// Replacement decision
        by: String,
    },

    /// Replace a decision with an Expired successor
    Expire {
        id: String,
        #[arg(long, default_value = "cli-operator")]
        decision_maker: String,
    },

    /// Follow a decision's supersession chain forward
    Chain { id: String },

    /// Decisions due for periodic review
    ReviewDue {
        /// RFC 3339 cutoff (default: now)
        #[arg(long)]
        before: Option<DateTime<Utc>>,
    },

    /// Decisions past their expiry
    Expired,

    /// Unified audit log
    Audit {
        #[command(flatten)]
        filter: AuditFilterArgs,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
        /// Write the full filtered set as JSONL
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Summary statistics over the unified audit log
    AuditSummary {
        #[command(flatten)]
        filter: AuditFilterArgs,
    },

    /// Verify payload hashes of an exported audit file
    AuditVerify { file: PathBuf },
}

#[derive(Args)]
struct AuditFilterArgs {
    #[arg(long)]
    asset_id: Option<u64>,
    #[arg(long)]
    network: Option<String>,
    /// whitelist, transfer_validation, compliance, blacklist, token_issuance
    #[arg(long)]
    category: Option<AuditCategory>,
    #[arg(long)]
    action_type: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    performed_by: Option<String>,
    #[arg(long)]
    success: Option<bool>,
    #[arg(long)]
    from: Option<DateTime<Utc>>,
    #[arg(long)]
    to: Option<DateTime<Utc>>,
}

impl AuditFilterArgs {
    fn into_query(self) -> AuditLogQuery {
        AuditLogQuery {
            asset_id: self.asset_id,
            network: self.network,
            category: self.category,
            action_type: self.action_type,
            affected_address: self.address,
            performed_by: self.performed_by,
            success: self.success,
            from_date: self.from,
            to_date: self.to,
            ..AuditLogQuery::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = RegLedgerConfig::load(cli.config.as_deref())?;
    let ctx = AppContext::new(&cli.data, config)?;

    match cli.command {
        Commands::Record {
            organization,
            step,
            outcome,
            evidence,
            policy_version,
            reason,
            session,
            decision_maker,
            id,
            correlation_id,
            context,
        } => {
            let now = ctx.clock().now();
            let evidence = evidence
                .iter()
                .map(|raw| commands::parse_evidence(raw, now))
                .collect::<anyhow::Result<Vec<_>>>()?;

            commands::record(
                &ctx,
                RecordArgs {
                    organization_id: organization,
                    step,
                    outcome,
                    policy_version,
                    evidence,
                    reason,
                    session_id: session,
                    decision_maker,
                    decision_id: id,
                    correlation_id,
                    context: commands::parse_context(&context)?,
                },
            )
            .await?;
        }

        Commands::Show { id } => {
            commands::show(&ctx, &id).await?;
        }

        Commands::Query {
            organization,
            session,
            step,
            outcome,
            decision_maker,
            from,
            to,
            include_superseded,
            include_expired,
            page,
            page_size,
        } => {
            let query = DecisionQuery {
                organization_id: organization,
                onboarding_session_id: session,
                step,
                outcome,
                decision_maker,
                from_date: from,
                to_date: to,
                include_superseded,
                include_expired,
                page,
                page_size,
            };
            commands::query(&ctx, &query).await?;
        }

        Commands::Active { organization, step } => {
            commands::active(&ctx, &organization, step).await?;
        }

        Commands::Supersede { id, by } => {
            commands::supersede(&ctx, &id, &by).await?;
        }

        Commands::Expire { id, decision_maker } => {
            commands::expire(&ctx, &id, &decision_maker).await?;
        }

        Commands::Chain { id } => {
            commands::chain(&ctx, &id).await?;
        }

        Commands::ReviewDue { before } => {
            commands::review_due(&ctx, before).await?;
        }

        Commands::Expired => {
            commands::expired(&ctx).await?;
        }

        Commands::Audit {
            filter,
            page,
            page_size,
            export,
        } => {
            let query = AuditLogQuery {
                page,
                page_size,
                ..filter.into_query()
            };
            commands::audit(&ctx, &query, export.as_deref()).await?;
        }

        Commands::AuditSummary { filter } => {
            commands::audit_summary(&ctx, &filter.into_query()).await?;
        }

        Commands::AuditVerify { file } => {
            let tampered = commands::audit_verify(&file)?;
            if !tampered.is_empty() {
                anyhow::bail!("{} tampered entries", tampered.len());
            }
        }
    }

    Ok(())
}
