//! Background maintenance loops
//!
//! Both loops run until their `JoinHandle` is aborted. Errors are logged and
//! the loop keeps going; the next tick retries.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::ledger::month_start;
use crate::routing::AssignmentEngine;

/// Periodically release leases older than the configured TTL
pub fn spawn_lease_sweeper(engine: Arc<AssignmentEngine>) -> JoinHandle<()> {
    let period = engine.config().leases.sweep_interval();
    tokio::spawn(async move {
        info!("🧹 Starting lease sweeper (every {:?})", period);
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match engine.expire_stale_leases(Utc::now()).await {
                Ok(0) => debug!("No stale leases"),
                Ok(released) => info!(released, "Released capacity held by stale leases"),
                Err(e) => error!("Lease sweep failed: {}", e),
            }
        }
    })
}

/// Calendar day in the business offset
pub fn business_today(engine: &AssignmentEngine) -> Result<NaiveDate> {
    let offset = engine.config().assignment.business_offset()?;
    Ok(Utc::now().with_timezone(&offset).date_naive())
}

/// Day-rollover bookkeeping of the reset scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResetSchedule {
    /// Last business day whose daily reset went through
    last_seen: NaiveDate,
    /// Monthly reset owed since a month rollover, until one succeeds
    monthly_due: Option<NaiveDate>,
}

impl ResetSchedule {
    fn starting(today: NaiveDate) -> Self {
        Self {
            last_seen: today,
            monthly_due: None,
        }
    }

    /// Apply whatever resets `today` calls for; failures are retried on the
    /// next tick
    async fn tick(&mut self, engine: &AssignmentEngine, today: NaiveDate) {
        if today != self.last_seen {
            if month_start(today) != month_start(self.last_seen) {
                self.monthly_due = Some(today);
            }
            match engine.reset_daily(today).await {
                Ok(_) => self.last_seen = today,
                Err(e) => error!("Daily reset for {} failed, will retry: {}", today, e),
            }
        }

        if let Some(day) = self.monthly_due {
            match engine.reset_monthly(day).await {
                Ok(_) => self.monthly_due = None,
                Err(e) => error!("Monthly reset for {} failed, will retry: {}", day, e),
            }
        }
    }
}

/// Run the daily reset whenever the business day rolls over
///
/// The day the task starts on is taken as already handled; the first reset
/// fires at the next midnight. Monthly counters are reset once the month
/// rolls over. Idempotence comes from the ledger guard, so several processes
/// may run this loop against one database.
pub fn spawn_daily_reset(engine: Arc<AssignmentEngine>, check_interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("🌙 Starting daily reset scheduler (checking every {:?})", check_interval);
        let mut schedule = match business_today(&engine) {
            Ok(day) => ResetSchedule::starting(day),
            Err(e) => {
                error!("Daily reset scheduler cannot start: {}", e);
                return;
            }
        };

        let mut interval = tokio::time::interval(check_interval);
        loop {
            interval.tick().await;
            match business_today(&engine) {
                Ok(today) => schedule.tick(&engine, today).await,
                Err(e) => error!("Cannot determine business day: {}", e),
            }
        }
    })
}
