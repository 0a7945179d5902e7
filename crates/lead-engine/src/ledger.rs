//! # Workload Ledger
//!
//! Owns the per-agent capacity counters and is the only place they change.
//!
//! The central guarantee is `0 <= current_leads <= max_leads` for every agent
//! after any committed claim. [`WorkloadLedger::try_claim`] therefore performs
//! the capacity check and the increment as one indivisible step: a
//! conditional `UPDATE ... WHERE current_leads < max_leads` in SQLite, or a
//! read-modify-write under the entry's write lock in memory. Two concurrent
//! claims for the last free slot can never both succeed.
//!
//! ```text
//!            try_claim (reaches ceiling)
//!  Accepting ───────────────────────────▶ Full
//!      ▲                                    │
//!      └──── complete_lead / reset_daily ◀──┘
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::agent::AgentId;
use crate::config::ResetConfig;
use crate::error::Result;

/// State of an agent right after a completion was recorded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub current_leads: u32,
    pub closed_deals: u32,
    pub conversion_rate: f64,
    /// The counter was already 0; nothing was decremented
    pub floored: bool,
}

/// Result of a scheduled counter reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ResetOutcome {
    Applied {
        agents: u64,
        cleared_current_leads: bool,
    },
    /// The guard saw an earlier reset for the same period
    AlreadyApplied { period: NaiveDate },
}

impl ResetOutcome {
    pub fn was_applied(&self) -> bool {
        matches!(self, ResetOutcome::Applied { .. })
    }
}

/// First day of the month containing `day`; keys the monthly reset guard
pub fn month_start(day: NaiveDate) -> NaiveDate {
    use chrono::Datelike;
    day.with_day(1).unwrap_or(day)
}

#[async_trait]
pub trait WorkloadLedger: Send + Sync {
    /// Reserve one unit of capacity
    ///
    /// Increments `current_leads`, `assigned_today`, `assigned_this_month`
    /// and `assigned_total` by one only if `current_leads < max_leads` at that
    /// instant. `Ok(false)` means "try the next candidate", including for an
    /// agent that no longer exists.
    async fn try_claim(&self, agent_id: &AgentId) -> Result<bool>;

    /// Release one unit of capacity
    ///
    /// Decrements `current_leads` (floored at 0). On success also bumps
    /// `closed_deals` and recomputes `conversion_rate = closed / total × 100`.
    async fn complete_lead(&self, agent_id: &AgentId, success: bool) -> Result<CompletionOutcome>;

    /// Zero `assigned_today` for everyone, and `current_leads` too when the
    /// policy says so
    async fn reset_daily(&self, today: NaiveDate, policy: ResetConfig) -> Result<ResetOutcome>;

    /// Zero `assigned_this_month`, at most once per calendar month
    async fn reset_monthly(&self, today: NaiveDate) -> Result<ResetOutcome>;
}
