//! Store wrapper that fails or interleaves selected operations on demand

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use uuid::Uuid;

use super::MemoryAgentStore;
use crate::agent::{Agent, AgentId, AgentStatus};
use crate::audit::{AssignmentLog, AssignmentRecord};
use crate::config::ResetConfig;
use crate::directory::AgentDirectory;
use crate::error::{LeadEngineError, Result};
use crate::lease::{Lease, LeaseLedger, Released};
use crate::ledger::{CompletionOutcome, ResetOutcome, WorkloadLedger};

pub(crate) struct FaultyStore {
    inner: MemoryAgentStore,
    failing_releases: AtomicU32,
    failing_monthly_resets: AtomicU32,
    claim_before_write: AtomicBool,
}

impl FaultyStore {
    pub(crate) fn new(inner: MemoryAgentStore) -> Self {
        Self {
            inner,
            failing_releases: AtomicU32::new(0),
            failing_monthly_resets: AtomicU32::new(0),
            claim_before_write: AtomicBool::new(false),
        }
    }

    /// The next `count` lease releases fail without touching anything
    pub(crate) fn fail_releases(&self, count: u32) {
        self.failing_releases.store(count, Ordering::SeqCst);
    }

    pub(crate) fn fail_monthly_resets(&self, count: u32) {
        self.failing_monthly_resets.store(count, Ordering::SeqCst);
    }

    /// Commit a claim on the agent being written just before the next
    /// directory write lands
    pub(crate) fn claim_before_next_write(&self) {
        self.claim_before_write.store(true, Ordering::SeqCst);
    }

    async fn interleave_claim(&self, agent_id: &AgentId) -> Result<()> {
        if self.claim_before_write.swap(false, Ordering::SeqCst) {
            self.inner.try_claim(agent_id).await?;
        }
        Ok(())
    }
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn locked() -> LeadEngineError {
    LeadEngineError::database("database is locked")
}

#[async_trait]
impl AgentDirectory for FaultyStore {
    async fn list_agents(&self) -> Result<Vec<Agent>> {
        self.inner.list_agents().await
    }

    async fn get_agent(&self, agent_id: &AgentId) -> Result<Option<Agent>> {
        self.inner.get_agent(agent_id).await
    }

    async fn upsert_agent(&self, agent: &Agent) -> Result<()> {
        self.interleave_claim(&agent.id).await?;
        self.inner.upsert_agent(agent).await
    }

    async fn insert_agent(&self, agent: &Agent) -> Result<bool> {
        self.interleave_claim(&agent.id).await?;
        self.inner.insert_agent(agent).await
    }

    async fn update_profile(&self, agent: &Agent) -> Result<bool> {
        self.interleave_claim(&agent.id).await?;
        self.inner.update_profile(agent).await
    }

    async fn set_agent_status(&self, agent_id: &AgentId, status: AgentStatus) -> Result<()> {
        self.inner.set_agent_status(agent_id, status).await
    }

    async fn remove_agent(&self, agent_id: &AgentId) -> Result<bool> {
        self.inner.remove_agent(agent_id).await
    }
}

#[async_trait]
impl WorkloadLedger for FaultyStore {
    async fn try_claim(&self, agent_id: &AgentId) -> Result<bool> {
        self.inner.try_claim(agent_id).await
    }

    async fn complete_lead(&self, agent_id: &AgentId, success: bool) -> Result<CompletionOutcome> {
        self.inner.complete_lead(agent_id, success).await
    }

    async fn reset_daily(&self, today: NaiveDate, policy: ResetConfig) -> Result<ResetOutcome> {
        self.inner.reset_daily(today, policy).await
    }

    async fn reset_monthly(&self, today: NaiveDate) -> Result<ResetOutcome> {
        if take_one(&self.failing_monthly_resets) {
            return Err(locked());
        }
        self.inner.reset_monthly(today).await
    }
}

#[async_trait]
impl LeaseLedger for FaultyStore {
    async fn claim_with_lease(&self, lease: &Lease) -> Result<bool> {
        self.inner.claim_with_lease(lease).await
    }

    async fn release_lease(&self, lease_id: &Uuid, success: bool) -> Result<Option<Released>> {
        if take_one(&self.failing_releases) {
            return Err(locked());
        }
        self.inner.release_lease(lease_id, success).await
    }

    async fn release_oldest_for(
        &self,
        agent_id: &AgentId,
        success: bool,
    ) -> Result<(Option<Lease>, CompletionOutcome)> {
        if take_one(&self.failing_releases) {
            return Err(locked());
        }
        self.inner.release_oldest_for(agent_id, success).await
    }

    async fn leases_issued_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Lease>> {
        self.inner.leases_issued_before(cutoff).await
    }

    async fn open_leases(&self) -> Result<Vec<Lease>> {
        self.inner.open_leases().await
    }
}

#[async_trait]
impl AssignmentLog for FaultyStore {
    async fn record_assignment(&self, record: &AssignmentRecord) -> Result<()> {
        self.inner.record_assignment(record).await
    }

    async fn recent_assignments(&self, limit: usize) -> Result<Vec<AssignmentRecord>> {
        self.inner.recent_assignments(limit).await
    }
}
