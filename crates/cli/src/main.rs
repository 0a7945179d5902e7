//! LeadRoute CLI
//!
//! Operator entry point for the lead assignment engine.
//!
//! # Usage
//!
//! ```bash
//! leadroute seed agents.toml
//! leadroute assign --amount 20000 --purpose business
//! leadroute complete 6f1c2a4e-0d7b-4c55-9a63-2b8e1f0c9d41 --success
//! leadroute complete agent-001     # oldest open lead of an agent
//! leadroute reset-daily            # run once a day from cron
//! leadroute report
//! leadroute run                    # in-process daily reset scheduler
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

use logging::{parse_log_level, setup_logging, LoggingConfig};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "leadroute")]
#[command(version)]
#[command(about = "Route loan leads to sales agents", long_about = None)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, short, global = true, env = "LEADROUTE_CONFIG")]
    config: Option<PathBuf>,

    /// Database URL, overriding the configuration file
    #[arg(long, global = true, env = "LEADROUTE_DATABASE_URL")]
    database: Option<String>,

    /// Log level applied on top of RUST_LOG
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Include source file and line in log events
    #[arg(long, global = true)]
    log_source: bool,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update agents from a roster file
    Seed { roster: PathBuf },
    /// Assign one lead
    Assign {
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        purpose: Option<String>,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        language: Option<String>,
        /// Skip scoring and pick the agent with the fewest leads today
        #[arg(long)]
        round_robin: bool,
    },
    /// Record that a lead was finished
    Complete {
        /// Lease id printed by `assign`, or an agent id to finish that
        /// agent's oldest open lead
        target: String,
        /// The lead turned into a closed deal
        #[arg(long)]
        success: bool,
    },
    /// Zero the daily counters (once per business day)
    ResetDaily {
        /// Business day to reset for, defaults to today
        #[arg(long)]
        date: Option<chrono::NaiveDate>,
    },
    /// Zero the monthly counters (once per month)
    ResetMonthly {
        #[arg(long)]
        date: Option<chrono::NaiveDate>,
    },
    /// Workload distribution across agents
    Report,
    /// List agents
    Agents,
    /// Change an agent's status
    SetStatus { agent_id: String, status: String },
    /// Leads assigned but not yet completed or expired
    Leases,
    /// Most recent assignment decisions
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Run the daily reset scheduler until interrupted
    Run {
        /// Seconds between day-rollover checks
        #[arg(long, default_value_t = 60)]
        check_interval: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::new(parse_log_level(&cli.log_level)?, "leadroute")
        .with_json(cli.json_logs);
    if cli.log_source {
        logging = logging.with_file_info();
    }
    setup_logging(&logging)?;

    let engine = commands::open_engine(cli.config.as_deref(), cli.database.as_deref()).await?;
    commands::handle(cli.command, engine, cli.format).await
}
