//! Subcommand handlers

use anyhow::{bail, Context, Result};
use leadroute_engine::maintenance::{business_today, spawn_daily_reset, spawn_lease_sweeper};
use leadroute_engine::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::output::{self, print_json, render, AgentRow, LeaseRow, OutputFormat, RecordRow};
use crate::Commands;

/// Load configuration, apply the command-line database override and open the store
pub async fn open_engine(config: Option<&Path>, database: Option<&str>) -> Result<Arc<AssignmentEngine>> {
    let mut config = match config {
        Some(path) => LeadEngineConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            let mut config = LeadEngineConfig::default();
            config.apply_env_overrides();
            config
        }
    };
    if let Some(url) = database {
        config.database.url = url.to_string();
    }

    info!(database = %config.database.url, "Opening lead engine");
    let engine = leadroute_engine::init(config).await?;
    Ok(Arc::new(engine))
}

pub async fn handle(command: Commands, engine: Arc<AssignmentEngine>, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Seed { roster } => {
            let roster = Roster::load(&roster)?;
            let summary = roster.seed(engine.store().as_ref()).await?;
            if format.is_json() {
                print_json(&summary)?;
            } else {
                println!("Seeded {} new and {} existing agents", summary.created, summary.updated);
            }
        }
        Commands::Assign {
            amount,
            purpose,
            region,
            language,
            round_robin,
        } => {
            let outcome = if round_robin {
                engine.assign_round_robin().await?
            } else {
                let lead = Lead {
                    amount,
                    purpose,
                    region,
                    language,
                    ..Lead::new()
                };
                engine.assign_best_agent(&lead).await?
            };
            print_outcome(&outcome, format)?;
        }
        Commands::Complete { target, success } => {
            let outcome = match CompletionTarget::parse(&target) {
                CompletionTarget::Lease(lease_id) => engine.complete(lease_id, success).await?,
                CompletionTarget::Agent(agent_id) => engine.complete_lead(&agent_id, success).await?,
            };
            if format.is_json() {
                print_json(&outcome)?;
            } else if outcome.floored {
                println!("{} had no open leads; nothing released", target);
            } else {
                println!(
                    "Released {}: {} open leads left ({} closed deals, {:.1}% conversion)",
                    target, outcome.current_leads, outcome.closed_deals, outcome.conversion_rate
                );
            }
        }
        Commands::ResetDaily { date } => {
            let day = match date {
                Some(day) => day,
                None => business_today(&engine)?,
            };
            let outcome = engine.reset_daily(day).await?;
            print_reset("Daily", day, &outcome, format)?;
        }
        Commands::ResetMonthly { date } => {
            let day = match date {
                Some(day) => day,
                None => business_today(&engine)?,
            };
            let outcome = engine.reset_monthly(day).await?;
            print_reset("Monthly", day, &outcome, format)?;
        }
        Commands::Report => {
            let report = engine.distribution_report().await?;
            if format.is_json() {
                print_json(&report)?;
            } else {
                print!("{}", output::report_text(&report));
            }
        }
        Commands::Agents => {
            let agents = engine.store().list_agents().await?;
            if format.is_json() {
                print_json(&agents)?;
            } else if agents.is_empty() {
                println!("No agents. Seed some with `leadroute seed <roster.toml>`.");
            } else {
                println!("{}", render(agents.iter().map(AgentRow::from).collect()));
            }
        }
        Commands::SetStatus { agent_id, status } => {
            let status: AgentStatus = status.parse()?;
            let id = AgentId::from(agent_id);
            engine.store().set_agent_status(&id, status).await?;
            println!("{} is now {}", id, status);
        }
        Commands::Leases => {
            let leases = engine.open_leases().await?;
            if format.is_json() {
                print_json(&leases)?;
            } else if leases.is_empty() {
                println!("No open leases");
            } else {
                println!("{}", render(leases.iter().map(LeaseRow::from).collect()));
            }
        }
        Commands::History { limit } => {
            let records = engine.recent_assignments(limit).await?;
            if format.is_json() {
                print_json(&records)?;
            } else {
                println!("{}", render(records.iter().map(RecordRow::from).collect()));
            }
        }
        Commands::Run { check_interval } => {
            if check_interval == 0 {
                bail!("--check-interval must be at least 1 second");
            }
            let resets = spawn_daily_reset(engine.clone(), Duration::from_secs(check_interval));
            let sweeper = spawn_lease_sweeper(engine.clone());
            println!("Scheduler running; press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
            resets.abort();
            sweeper.abort();
            info!(metrics = ?engine.metrics(), "Scheduler stopped");
        }
    }
    Ok(())
}

/// What `complete` was pointed at
#[derive(Debug, PartialEq)]
enum CompletionTarget {
    Lease(Uuid),
    Agent(AgentId),
}

impl CompletionTarget {
    fn parse(target: &str) -> Self {
        match Uuid::parse_str(target) {
            Ok(lease_id) => CompletionTarget::Lease(lease_id),
            Err(_) => CompletionTarget::Agent(AgentId::from(target)),
        }
    }
}

fn outcome_text(outcome: &AssignmentOutcome) -> String {
    match outcome {
        AssignmentOutcome::Assigned(assignment) => {
            let score = assignment
                .score
                .map(|s| format!(" (score {:.1})", s))
                .unwrap_or_default();
            format!(
                "Assigned to {} {} <{}>{} via {}\nLease {}",
                assignment.agent_id,
                assignment.agent_name,
                assignment.contact,
                score,
                assignment.strategy,
                assignment.lease_id
            )
        }
        AssignmentOutcome::NoAgentAvailable(reason) => format!("No agent available: {}", reason),
    }
}

fn print_outcome(outcome: &AssignmentOutcome, format: OutputFormat) -> Result<()> {
    if format.is_json() {
        return print_json(outcome);
    }
    println!("{}", outcome_text(outcome));
    Ok(())
}

fn print_reset(
    kind: &str,
    day: chrono::NaiveDate,
    outcome: &ResetOutcome,
    format: OutputFormat,
) -> Result<()> {
    if format.is_json() {
        return print_json(outcome);
    }
    match outcome {
        ResetOutcome::Applied {
            agents,
            cleared_current_leads,
        } => {
            let cleared = if *cleared_current_leads {
                ", open leads cleared"
            } else {
                ""
            };
            println!("{} reset for {} applied to {} agents{}", kind, day, agents, cleared);
        }
        ResetOutcome::AlreadyApplied { period } => {
            println!("{} reset already applied for {}", kind, period);
        }
    }
    Ok(())
}
