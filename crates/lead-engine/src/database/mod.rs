//! # SQLite Agent Store (sqlx)
//!
//! Durable backend for the agent roster, the workload ledger and the
//! assignment log. Every operation is async and the store is `Clone +
//! Send + Sync`, so it can be shared across `tokio::spawn` boundaries and
//! between processes pointing at the same database file.
//!
//! ## Atomic claims
//!
//! Capacity is reserved with a single conditional statement:
//!
//! ```sql
//! UPDATE agents
//!    SET current_leads = current_leads + 1, ...
//!  WHERE agent_id = ? AND current_leads < max_leads
//! ```
//!
//! SQLite serializes writers, so the check and the increment can never be
//! interleaved with another claim. `rows_affected() == 0` means the agent
//! was full (or gone) and the caller moves on to the next candidate.
//!
//! ## Leases
//!
//! Open leases live in the `leases` table. A claim and its lease row are
//! written in one transaction; a release deletes the lease row and
//! decrements the counter in one transaction, starting with the delete so
//! the transaction holds the write lock from its first statement. A daily
//! reset that clears `current_leads` deletes every lease with it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use leadroute_engine::database::SqliteAgentStore;
//! use leadroute_engine::directory::AgentDirectory;
//!
//! # async fn example() -> leadroute_engine::Result<()> {
//! let store = SqliteAgentStore::connect("sqlite://leadroute.db?mode=rwc").await?;
//! let agents = store.list_active_agents().await?;
//! println!("{} active agents", agents.len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agent::{Agent, AgentId, AgentStatus, Performance, Specialties, WorkingHours, Workload};
use crate::audit::{AssignmentLog, AssignmentRecord};
use crate::config::{AssignmentStrategy, DatabaseConfig, ResetConfig};
use crate::directory::AgentDirectory;
use crate::error::{LeadEngineError, Result};
use crate::lease::{Lease, LeaseLedger, Released};
use crate::ledger::{month_start, CompletionOutcome, ResetOutcome, WorkloadLedger};

const AGENT_COLUMNS: &str = "agent_id, name, contact, email, status, specialties, priority, \
     max_leads, current_leads, assigned_today, assigned_this_month, assigned_total, \
     conversion_rate, closed_deals, total_loan_amount, avg_response_time, working_hours, \
     notes, last_assigned_at, created_at, updated_at";

const INSERT_AGENT: &str = "INSERT INTO agents (agent_id, name, contact, email, status,
        specialties, priority, max_leads, current_leads, assigned_today, assigned_this_month,
        assigned_total, conversion_rate, closed_deals, total_loan_amount, avg_response_time,
        working_hours, notes, last_assigned_at, created_at, updated_at)
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

const CLAIM_SLOT: &str = "UPDATE agents
     SET current_leads = current_leads + 1,
         assigned_today = assigned_today + 1,
         assigned_this_month = assigned_this_month + 1,
         assigned_total = assigned_total + 1,
         last_assigned_at = ?,
         updated_at = ?
     WHERE agent_id = ? AND current_leads < max_leads";

const LEASE_COLUMNS: &str = "lease_id, agent_id, issued_at_us";

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Agent store on SQLite
#[derive(Clone)]
pub struct SqliteAgentStore {
    pool: SqlitePool,
}

impl SqliteAgentStore {
    /// Open (creating if missing) the database described by `config` and
    /// run pending migrations
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("🗄️ Opening lead database: {}", config.url);

        let in_memory = config.url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| LeadEngineError::configuration(format!("invalid database url: {}", e)))?
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
            .create_if_missing(true);
        if !in_memory {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        // Every connection to `:memory:` is its own database
        let max_connections = if in_memory { 1 } else { config.max_connections };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| LeadEngineError::database(format!("failed to connect: {}", e)))?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("✅ Lead database ready");
        Ok(Self { pool })
    }

    /// Open `url` with default pool settings
    pub async fn connect(url: &str) -> Result<Self> {
        let config = DatabaseConfig {
            url: url.to_string(),
            ..DatabaseConfig::default()
        };
        Self::new(&config).await
    }

    /// Private in-memory database for tests and dry runs
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Claim the reset period for `kind`
    ///
    /// Returns `false` when the guard is on and `period` was already
    /// recorded. The upsert takes SQLite's write lock, so concurrent
    /// resets from several processes still apply once.
    async fn claim_reset_period(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        kind: &str,
        period: NaiveDate,
        guarded: bool,
    ) -> Result<bool> {
        let sql = if guarded {
            "INSERT INTO ledger_resets (kind, period, applied_at) VALUES (?, ?, ?)
             ON CONFLICT(kind) DO UPDATE SET period = excluded.period, applied_at = excluded.applied_at
             WHERE ledger_resets.period <> excluded.period"
        } else {
            "INSERT INTO ledger_resets (kind, period, applied_at) VALUES (?, ?, ?)
             ON CONFLICT(kind) DO UPDATE SET period = excluded.period, applied_at = excluded.applied_at"
        };
        let result = sqlx::query(sql)
            .bind(kind)
            .bind(period)
            .bind(Utc::now())
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Give one slot of `agent_id` back inside `tx`
    ///
    /// Decrements `current_leads` unless it is already 0 and, on success,
    /// credits a closed deal. Errors leave `tx` to be rolled back on drop.
    async fn release_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        agent_id: &AgentId,
        success: bool,
    ) -> Result<CompletionOutcome> {
        let now = Utc::now();
        let released = sqlx::query(
            "UPDATE agents SET current_leads = current_leads - 1, updated_at = ?
             WHERE agent_id = ? AND current_leads > 0",
        )
        .bind(now)
        .bind(agent_id.as_str())
        .execute(&mut **tx)
        .await?
        .rows_affected()
            > 0;

        if success {
            let result = sqlx::query(
                "UPDATE agents
                 SET closed_deals = closed_deals + 1,
                     conversion_rate = CASE
                         WHEN assigned_total > 0
                         THEN MIN(100.0, (closed_deals + 1) * 100.0 / assigned_total)
                         ELSE conversion_rate
                     END,
                     updated_at = ?
                 WHERE agent_id = ?",
            )
            .bind(now)
            .bind(agent_id.as_str())
            .execute(&mut **tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(LeadEngineError::not_found(format!("agent {}", agent_id)));
            }
        }

        let row = sqlx::query(
            "SELECT current_leads, closed_deals, conversion_rate FROM agents WHERE agent_id = ?",
        )
        .bind(agent_id.as_str())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| LeadEngineError::not_found(format!("agent {}", agent_id)))?;

        let outcome = CompletionOutcome {
            current_leads: counter(&row, "current_leads", agent_id.as_str())?,
            closed_deals: counter(&row, "closed_deals", agent_id.as_str())?,
            conversion_rate: row.try_get("conversion_rate")?,
            floored: !released,
        };
        if outcome.floored {
            warn!(agent_id = %agent_id, "Lead completed for agent with no open leads; counter stays at 0");
        }
        Ok(outcome)
    }
}

/// Bind every column of [`INSERT_AGENT`] in order
fn bind_agent<'q>(
    query: SqliteQuery<'q>,
    agent: &'q Agent,
    updated_at: DateTime<Utc>,
) -> Result<SqliteQuery<'q>> {
    let specialties = serde_json::to_string(&agent.specialties)?;
    let working_hours = serde_json::to_string(&agent.working_hours)?;
    Ok(query
        .bind(agent.id.as_str())
        .bind(&agent.name)
        .bind(&agent.contact)
        .bind(&agent.email)
        .bind(agent.status.as_str())
        .bind(specialties)
        .bind(i64::from(agent.priority))
        .bind(i64::from(agent.workload.max_leads))
        .bind(i64::from(agent.workload.current_leads))
        .bind(i64::from(agent.workload.assigned_today))
        .bind(i64::from(agent.workload.assigned_this_month))
        .bind(i64::from(agent.workload.assigned_total))
        .bind(agent.performance.conversion_rate)
        .bind(i64::from(agent.performance.closed_deals))
        .bind(agent.performance.total_loan_amount)
        .bind(agent.performance.avg_response_time)
        .bind(working_hours)
        .bind(&agent.notes)
        .bind(agent.last_assigned_at)
        .bind(agent.created_at)
        .bind(updated_at))
}

fn lease_from_row(row: &SqliteRow) -> Result<Lease> {
    let id: String = row.try_get("lease_id")?;
    let id = Uuid::parse_str(&id)
        .map_err(|e| LeadEngineError::Serialization(format!("lease id {}: {}", id, e)))?;
    let agent_id: String = row.try_get("agent_id")?;
    let micros: i64 = row.try_get("issued_at_us")?;
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    let issued_at = DateTime::<Utc>::from_timestamp(micros.div_euclid(1_000_000), nanos)
        .ok_or_else(|| {
            LeadEngineError::Serialization(format!("lease {} issued at {}us", id, micros))
        })?;
    Ok(Lease {
        id,
        agent_id: AgentId::from(agent_id),
        issued_at,
    })
}

fn counter(row: &SqliteRow, column: &str, agent_id: &str) -> Result<u32> {
    let value: i64 = row.try_get(column)?;
    u32::try_from(value).map_err(|_| {
        LeadEngineError::malformed_agent(agent_id, format!("{} holds {}", column, value))
    })
}

fn agent_from_row(row: &SqliteRow) -> Result<Agent> {
    let id: String = row.try_get("agent_id")?;
    let malformed = |reason: String| LeadEngineError::malformed_agent(id.as_str(), reason);

    let status: String = row.try_get("status")?;
    let status = AgentStatus::from_str(&status).map_err(|e| malformed(e.to_string()))?;

    let specialties: String = row.try_get("specialties")?;
    let specialties: Specialties = serde_json::from_str(&specialties)
        .map_err(|e| malformed(format!("specialties: {}", e)))?;

    let working_hours: String = row.try_get("working_hours")?;
    let working_hours: WorkingHours = serde_json::from_str(&working_hours)
        .map_err(|e| malformed(format!("working_hours: {}", e)))?;

    let priority: i64 = row.try_get("priority")?;
    let priority = u8::try_from(priority).map_err(|_| malformed(format!("priority {}", priority)))?;

    let agent = Agent {
        id: AgentId::from(id.clone()),
        name: row.try_get("name")?,
        contact: row.try_get("contact")?,
        email: row.try_get("email")?,
        status,
        specialties,
        priority,
        workload: Workload {
            current_leads: counter(row, "current_leads", &id)?,
            max_leads: counter(row, "max_leads", &id)?,
            assigned_today: counter(row, "assigned_today", &id)?,
            assigned_this_month: counter(row, "assigned_this_month", &id)?,
            assigned_total: counter(row, "assigned_total", &id)?,
        },
        performance: Performance {
            conversion_rate: row.try_get("conversion_rate")?,
            closed_deals: counter(row, "closed_deals", &id)?,
            total_loan_amount: row.try_get("total_loan_amount")?,
            avg_response_time: row.try_get("avg_response_time")?,
        },
        working_hours,
        notes: row.try_get("notes")?,
        last_assigned_at: row.try_get("last_assigned_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    };
    agent.validate()?;
    Ok(agent)
}

/// Decode rows, skipping (and logging) the ones that are not valid agents
fn decode_agents(rows: &[SqliteRow]) -> Vec<Agent> {
    rows.iter()
        .filter_map(|row| match agent_from_row(row) {
            Ok(agent) => Some(agent),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable agent row");
                None
            }
        })
        .collect()
}

#[async_trait]
impl AgentDirectory for SqliteAgentStore {
    async fn list_agents(&self) -> Result<Vec<Agent>> {
        let sql = format!("SELECT {} FROM agents ORDER BY agent_id", AGENT_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(decode_agents(&rows))
    }

    async fn list_active_agents(&self) -> Result<Vec<Agent>> {
        let sql = format!(
            "SELECT {} FROM agents WHERE status = 'active' ORDER BY agent_id",
            AGENT_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let agents = decode_agents(&rows);
        debug!("Found {} active agents", agents.len());
        Ok(agents)
    }

    async fn get_agent(&self, agent_id: &AgentId) -> Result<Option<Agent>> {
        let sql = format!("SELECT {} FROM agents WHERE agent_id = ?", AGENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(agent_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(agent_from_row).transpose()
    }

    async fn upsert_agent(&self, agent: &Agent) -> Result<()> {
        agent.validate()?;
        let sql = format!(
            "{} ON CONFLICT(agent_id) DO UPDATE SET
                name = excluded.name,
                contact = excluded.contact,
                email = excluded.email,
                status = excluded.status,
                specialties = excluded.specialties,
                priority = excluded.priority,
                max_leads = excluded.max_leads,
                current_leads = excluded.current_leads,
                assigned_today = excluded.assigned_today,
                assigned_this_month = excluded.assigned_this_month,
                assigned_total = excluded.assigned_total,
                conversion_rate = excluded.conversion_rate,
                closed_deals = excluded.closed_deals,
                total_loan_amount = excluded.total_loan_amount,
                avg_response_time = excluded.avg_response_time,
                working_hours = excluded.working_hours,
                notes = excluded.notes,
                last_assigned_at = excluded.last_assigned_at,
                updated_at = excluded.updated_at",
            INSERT_AGENT
        );
        bind_agent(sqlx::query(&sql), agent, Utc::now())?
            .execute(&self.pool)
            .await?;

        debug!(agent_id = %agent.id, "Agent upserted");
        Ok(())
    }

    async fn insert_agent(&self, agent: &Agent) -> Result<bool> {
        agent.validate()?;
        let sql = format!("{} ON CONFLICT(agent_id) DO NOTHING", INSERT_AGENT);
        let inserted = bind_agent(sqlx::query(&sql), agent, Utc::now())?
            .execute(&self.pool)
            .await?
            .rows_affected()
            > 0;
        if inserted {
            debug!(agent_id = %agent.id, "Agent inserted");
        }
        Ok(inserted)
    }

    async fn update_profile(&self, agent: &Agent) -> Result<bool> {
        agent.validate()?;
        let specialties = serde_json::to_string(&agent.specialties)?;
        let working_hours = serde_json::to_string(&agent.working_hours)?;
        let max_leads = i64::from(agent.workload.max_leads);

        let result = sqlx::query(
            "UPDATE agents
             SET name = ?, contact = ?, email = ?, status = ?, specialties = ?, priority = ?,
                 max_leads = ?, working_hours = ?, notes = ?, updated_at = ?
             WHERE agent_id = ? AND current_leads <= ?",
        )
        .bind(&agent.name)
        .bind(&agent.contact)
        .bind(&agent.email)
        .bind(agent.status.as_str())
        .bind(specialties)
        .bind(i64::from(agent.priority))
        .bind(max_leads)
        .bind(working_hours)
        .bind(&agent.notes)
        .bind(Utc::now())
        .bind(agent.id.as_str())
        .bind(max_leads)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() > 0 {
            debug!(agent_id = %agent.id, "Agent profile updated");
            return Ok(true);
        }

        let open: Option<i64> = sqlx::query_scalar("SELECT current_leads FROM agents WHERE agent_id = ?")
            .bind(agent.id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        match open {
            None => Ok(false),
            Some(open) => Err(LeadEngineError::malformed_agent(
                agent.id.as_str(),
                format!("max_leads {} is below {} open leads", max_leads, open),
            )),
        }
    }

    async fn set_agent_status(&self, agent_id: &AgentId, status: AgentStatus) -> Result<()> {
        let result = sqlx::query("UPDATE agents SET status = ?, updated_at = ? WHERE agent_id = ?")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(agent_id.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(LeadEngineError::not_found(format!("agent {}", agent_id)));
        }
        debug!(agent_id = %agent_id, status = %status, "Agent status updated");
        Ok(())
    }

    async fn remove_agent(&self, agent_id: &AgentId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM leases WHERE agent_id = ?")
            .bind(agent_id.as_str())
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM agents WHERE agent_id = ?")
            .bind(agent_id.as_str())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl WorkloadLedger for SqliteAgentStore {
    async fn try_claim(&self, agent_id: &AgentId) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(CLAIM_SLOT)
            .bind(now)
            .bind(now)
            .bind(agent_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn complete_lead(&self, agent_id: &AgentId, success: bool) -> Result<CompletionOutcome> {
        let mut tx = self.pool.begin().await?;
        let outcome = Self::release_in_tx(&mut tx, agent_id, success).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    async fn reset_daily(&self, today: NaiveDate, policy: ResetConfig) -> Result<ResetOutcome> {
        let mut tx = self.pool.begin().await?;
        if !Self::claim_reset_period(&mut tx, "daily", today, policy.once_per_day).await? {
            tx.rollback().await?;
            return Ok(ResetOutcome::AlreadyApplied { period: today });
        }

        let clear = policy.clear_current_leads_on_daily_reset;
        let sql = if clear {
            "UPDATE agents SET assigned_today = 0, current_leads = 0, updated_at = ?"
        } else {
            "UPDATE agents SET assigned_today = 0, updated_at = ?"
        };
        let agents = sqlx::query(sql)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let dropped_leases = if clear {
            sqlx::query("DELETE FROM leases")
                .execute(&mut *tx)
                .await?
                .rows_affected()
        } else {
            0
        };
        tx.commit().await?;

        info!(%today, agents, cleared_current_leads = clear, dropped_leases, "Daily counters reset");
        Ok(ResetOutcome::Applied {
            agents,
            cleared_current_leads: clear,
        })
    }

    async fn reset_monthly(&self, today: NaiveDate) -> Result<ResetOutcome> {
        let period = month_start(today);
        let mut tx = self.pool.begin().await?;
        if !Self::claim_reset_period(&mut tx, "monthly", period, true).await? {
            tx.rollback().await?;
            return Ok(ResetOutcome::AlreadyApplied { period });
        }

        let agents = sqlx::query("UPDATE agents SET assigned_this_month = 0, updated_at = ?")
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        info!(%period, agents, "Monthly counters reset");
        Ok(ResetOutcome::Applied {
            agents,
            cleared_current_leads: false,
        })
    }
}

#[async_trait]
impl LeaseLedger for SqliteAgentStore {
    async fn claim_with_lease(&self, lease: &Lease) -> Result<bool> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let claimed = sqlx::query(CLAIM_SLOT)
            .bind(now)
            .bind(now)
            .bind(lease.agent_id.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;
        if !claimed {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("INSERT INTO leases (lease_id, agent_id, issued_at_us) VALUES (?, ?, ?)")
            .bind(lease.id.to_string())
            .bind(lease.agent_id.as_str())
            .bind(lease.issued_at.timestamp_micros())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn release_lease(&self, lease_id: &Uuid, success: bool) -> Result<Option<Released>> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("DELETE FROM leases WHERE lease_id = ? RETURNING {}", LEASE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(lease_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let lease = lease_from_row(&row)?;
        let completion = Self::release_in_tx(&mut tx, &lease.agent_id, success).await?;
        tx.commit().await?;
        Ok(Some(Released { lease, completion }))
    }

    async fn release_oldest_for(
        &self,
        agent_id: &AgentId,
        success: bool,
    ) -> Result<(Option<Lease>, CompletionOutcome)> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "DELETE FROM leases WHERE lease_id = (
                 SELECT lease_id FROM leases WHERE agent_id = ?
                 ORDER BY issued_at_us, lease_id LIMIT 1)
             RETURNING {}",
            LEASE_COLUMNS
        );
        let retired = sqlx::query(&sql)
            .bind(agent_id.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .as_ref()
            .map(lease_from_row)
            .transpose()?;

        let completion = Self::release_in_tx(&mut tx, agent_id, success).await?;
        tx.commit().await?;
        Ok((retired, completion))
    }

    async fn leases_issued_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Lease>> {
        let sql = format!(
            "SELECT {} FROM leases WHERE issued_at_us <= ? ORDER BY issued_at_us, lease_id",
            LEASE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(cutoff.timestamp_micros())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(lease_from_row).collect()
    }

    async fn open_leases(&self) -> Result<Vec<Lease>> {
        let sql = format!("SELECT {} FROM leases ORDER BY issued_at_us, lease_id", LEASE_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(lease_from_row).collect()
    }
}

#[async_trait]
impl AssignmentLog for SqliteAgentStore {
    async fn record_assignment(&self, record: &AssignmentRecord) -> Result<()> {
        let reason = record
            .no_agent_reason
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT INTO assignments
                (id, agent_id, score, strategy, no_agent_reason, lead_amount, lead_purpose, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(record.agent_id.as_ref().map(|id| id.as_str().to_string()))
        .bind(record.score)
        .bind(record.strategy.to_string())
        .bind(reason)
        .bind(record.lead_amount)
        .bind(&record.lead_purpose)
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_assignments(&self, limit: usize) -> Result<Vec<AssignmentRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            "SELECT id, agent_id, score, strategy, no_agent_reason, lead_amount, lead_purpose, recorded_at
             FROM assignments ORDER BY recorded_at DESC, rowid DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }
}

fn record_from_row(row: &SqliteRow) -> Result<AssignmentRecord> {
    let id: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id)
        .map_err(|e| LeadEngineError::Serialization(format!("assignment id {}: {}", id, e)))?;
    let strategy: String = row.try_get("strategy")?;
    let reason: Option<String> = row.try_get("no_agent_reason")?;
    let agent_id: Option<String> = row.try_get("agent_id")?;
    let recorded_at: DateTime<Utc> = row.try_get("recorded_at")?;

    Ok(AssignmentRecord {
        id,
        agent_id: agent_id.map(AgentId::from),
        score: row.try_get("score")?,
        strategy: AssignmentStrategy::from_str(&strategy)?,
        no_agent_reason: reason.as_deref().map(serde_json::from_str).transpose()?,
        lead_amount: row.try_get("lead_amount")?,
        lead_purpose: row.try_get("lead_purpose")?,
        recorded_at,
    })
}
