//! # LeadRoute Engine
//!
//! Routes inbound loan leads to sales agents.
//!
//! This crate provides:
//! - A five-part weighted match score (workload, amount, performance,
//!   specialty, priority) and a round-robin fallback
//! - A workload ledger whose claims can never push an agent past capacity,
//!   however many requests race for the last slot
//! - Lease handles, stored next to the counters they guard, and an expiry
//!   sweep so forgotten completions do not leak capacity
//! - In-memory (DashMap) and SQLite (sqlx) storage
//! - Daily/monthly counter resets, distribution reports and roster seeding
//!
//! ## Architecture
//!
//! The [`routing::AssignmentEngine`] is stateless per request. It reads a
//! snapshot from the [`directory::AgentDirectory`], ranks candidates, then
//! walks the ranking calling [`ledger::WorkloadLedger::try_claim`] until one
//! claim succeeds. Only the claim mutates shared state.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use leadroute_engine::prelude::*;
//!
//! # async fn example() -> leadroute_engine::Result<()> {
//! let store = Arc::new(MemoryAgentStore::new());
//! store
//!     .upsert_agent(&Agent::new("agent-001", "Cheng", "+60123456789").with_capacity(10))
//!     .await?;
//!
//! let engine = AssignmentEngine::new(store, LeadEngineConfig::default())?;
//! let outcome = engine
//!     .assign_best_agent(&Lead::new().with_amount(20000.0).with_purpose("business"))
//!     .await?;
//! if let Some(assignment) = outcome.assignment() {
//!     engine.complete(assignment.lease_id, false).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod audit;
pub mod config;
pub mod database;
pub mod directory;
pub mod error;
pub mod lead;
pub mod lease;
pub mod ledger;
pub mod maintenance;
pub mod monitoring;
pub mod report;
pub mod roster;
pub mod routing;
pub mod store;

pub use error::{LeadEngineError, Result};

use std::sync::Arc;

/// Open the configured SQLite database and build an engine over it
pub async fn init(config: config::LeadEngineConfig) -> Result<routing::AssignmentEngine> {
    config.validate()?;
    let store = database::SqliteAgentStore::new(&config.database).await?;
    routing::AssignmentEngine::new(Arc::new(store), config)
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::agent::{
        Agent, AgentId, AgentStatus, AmountRange, DaySchedule, LoadState, Performance,
        Specialties, WorkingHours, Workload,
    };
    pub use crate::audit::{AssignmentLog, AssignmentRecord};
    pub use crate::config::{AssignmentStrategy, LeadEngineConfig};
    pub use crate::database::SqliteAgentStore;
    pub use crate::directory::AgentDirectory;
    pub use crate::error::{LeadEngineError, Result};
    pub use crate::lead::Lead;
    pub use crate::lease::{Lease, LeaseLedger};
    pub use crate::ledger::{CompletionOutcome, ResetOutcome, WorkloadLedger};
    pub use crate::report::DistributionReport;
    pub use crate::roster::Roster;
    pub use crate::routing::{
        Assignment, AssignmentEngine, AssignmentOutcome, NoAgentReason, ScoreBreakdown, Scorer,
    };
    pub use crate::store::{AgentStore, MemoryAgentStore};
}
