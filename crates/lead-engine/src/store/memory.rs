//! In-memory agent store
//!
//! For embedded deployments and tests. Claims are atomic because the
//! capacity check and the increment happen while holding the DashMap write
//! guard of that agent's entry.
//!
//! Lease bookkeeping takes the lease table lock first and the agent entry
//! second, so a claim and its lease (or a release and the lease it retires)
//! are never observed apart.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agent::{Agent, AgentId, AgentStatus};
use crate::audit::{AssignmentLog, AssignmentRecord};
use crate::config::ResetConfig;
use crate::directory::AgentDirectory;
use crate::error::{LeadEngineError, Result};
use crate::lease::{sort_leases, Lease, LeaseLedger, Released};
use crate::ledger::{month_start, CompletionOutcome, ResetOutcome, WorkloadLedger};

const DEFAULT_LOG_CAPACITY: usize = 10_000;

/// Agent store backed by a [`DashMap`]
pub struct MemoryAgentStore {
    agents: DashMap<AgentId, Agent>,
    leases: Mutex<HashMap<Uuid, Lease>>,
    last_daily_reset: Mutex<Option<NaiveDate>>,
    last_monthly_reset: Mutex<Option<NaiveDate>>,
    assignments: Mutex<VecDeque<AssignmentRecord>>,
    log_capacity: usize,
}

impl MemoryAgentStore {
    pub fn new() -> Self {
        Self::with_log_capacity(DEFAULT_LOG_CAPACITY)
    }

    /// Keep at most `log_capacity` audit records, dropping the oldest
    pub fn with_log_capacity(log_capacity: usize) -> Self {
        Self {
            agents: DashMap::new(),
            leases: Mutex::new(HashMap::new()),
            last_daily_reset: Mutex::new(None),
            last_monthly_reset: Mutex::new(None),
            assignments: Mutex::new(VecDeque::new()),
            log_capacity: log_capacity.max(1),
        }
    }

    /// Build a store pre-filled with `agents`
    pub fn with_agents(agents: impl IntoIterator<Item = Agent>) -> Result<Self> {
        let store = Self::new();
        for agent in agents {
            agent.validate()?;
            store.agents.insert(agent.id.clone(), agent);
        }
        Ok(store)
    }

    /// Plant a record without validation, for exercising bad-data paths
    #[cfg(test)]
    pub(crate) fn insert_unchecked(&self, agent: Agent) {
        self.agents.insert(agent.id.clone(), agent);
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for MemoryAgentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(agent_id: &AgentId) -> LeadEngineError {
    LeadEngineError::not_found(format!("agent {}", agent_id))
}

/// Take one slot if the agent has room
fn claim_slot(agent: &mut Agent) -> bool {
    if !agent.workload.has_capacity() {
        return false;
    }
    let now = Utc::now();
    let workload = &mut agent.workload;
    workload.current_leads += 1;
    workload.assigned_today = workload.assigned_today.saturating_add(1);
    workload.assigned_this_month = workload.assigned_this_month.saturating_add(1);
    workload.assigned_total = workload.assigned_total.saturating_add(1);
    agent.last_assigned_at = Some(now);
    agent.updated_at = now;
    true
}

/// Give one slot back, crediting a closed deal on success
fn release_slot(agent: &mut Agent, success: bool) -> CompletionOutcome {
    let floored = agent.workload.current_leads == 0;
    if floored {
        warn!(agent_id = %agent.id, "Lead completed for agent with no open leads; counter stays at 0");
    } else {
        agent.workload.current_leads -= 1;
    }

    if success {
        agent.performance.closed_deals = agent.performance.closed_deals.saturating_add(1);
        let total = agent.workload.assigned_total;
        if total > 0 {
            agent.performance.conversion_rate =
                (agent.performance.closed_deals as f64 / total as f64 * 100.0).min(100.0);
        }
    }
    agent.updated_at = Utc::now();

    CompletionOutcome {
        current_leads: agent.workload.current_leads,
        closed_deals: agent.performance.closed_deals,
        conversion_rate: agent.performance.conversion_rate,
        floored,
    }
}

#[async_trait]
impl AgentDirectory for MemoryAgentStore {
    async fn list_agents(&self) -> Result<Vec<Agent>> {
        let mut agents: Vec<Agent> = self.agents.iter().map(|entry| entry.value().clone()).collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(agents)
    }

    async fn get_agent(&self, agent_id: &AgentId) -> Result<Option<Agent>> {
        Ok(self.agents.get(agent_id).map(|entry| entry.value().clone()))
    }

    async fn upsert_agent(&self, agent: &Agent) -> Result<()> {
        agent.validate()?;
        let mut record = agent.clone();
        record.updated_at = Utc::now();
        self.agents.insert(record.id.clone(), record);
        debug!(agent_id = %agent.id, "Agent upserted");
        Ok(())
    }

    async fn insert_agent(&self, agent: &Agent) -> Result<bool> {
        agent.validate()?;
        match self.agents.entry(agent.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                let mut record = agent.clone();
                record.updated_at = Utc::now();
                slot.insert(record);
                debug!(agent_id = %agent.id, "Agent inserted");
                Ok(true)
            }
        }
    }

    async fn update_profile(&self, agent: &Agent) -> Result<bool> {
        agent.validate()?;
        let Some(mut entry) = self.agents.get_mut(&agent.id) else {
            return Ok(false);
        };
        if agent.workload.max_leads < entry.workload.current_leads {
            return Err(LeadEngineError::malformed_agent(
                agent.id.as_str(),
                format!(
                    "max_leads {} is below {} open leads",
                    agent.workload.max_leads, entry.workload.current_leads
                ),
            ));
        }

        entry.name = agent.name.clone();
        entry.contact = agent.contact.clone();
        entry.email = agent.email.clone();
        entry.status = agent.status;
        entry.specialties = agent.specialties.clone();
        entry.priority = agent.priority;
        entry.workload.max_leads = agent.workload.max_leads;
        entry.working_hours = agent.working_hours.clone();
        entry.notes = agent.notes.clone();
        entry.updated_at = Utc::now();
        debug!(agent_id = %agent.id, "Agent profile updated");
        Ok(true)
    }

    async fn set_agent_status(&self, agent_id: &AgentId, status: AgentStatus) -> Result<()> {
        let mut entry = self.agents.get_mut(agent_id).ok_or_else(|| not_found(agent_id))?;
        entry.status = status;
        entry.updated_at = Utc::now();
        debug!(agent_id = %agent_id, status = %status, "Agent status updated");
        Ok(())
    }

    async fn remove_agent(&self, agent_id: &AgentId) -> Result<bool> {
        let mut leases = self.leases.lock();
        let removed = self.agents.remove(agent_id).is_some();
        if removed {
            leases.retain(|_, lease| &lease.agent_id != agent_id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl WorkloadLedger for MemoryAgentStore {
    async fn try_claim(&self, agent_id: &AgentId) -> Result<bool> {
        // The RefMut keeps the shard write-locked for the whole check-and-increment
        let Some(mut entry) = self.agents.get_mut(agent_id) else {
            return Ok(false);
        };
        Ok(claim_slot(&mut entry))
    }

    async fn complete_lead(&self, agent_id: &AgentId, success: bool) -> Result<CompletionOutcome> {
        let mut entry = self.agents.get_mut(agent_id).ok_or_else(|| not_found(agent_id))?;
        Ok(release_slot(&mut entry, success))
    }

    async fn reset_daily(&self, today: NaiveDate, policy: ResetConfig) -> Result<ResetOutcome> {
        let mut last = self.last_daily_reset.lock();
        if policy.once_per_day && *last == Some(today) {
            return Ok(ResetOutcome::AlreadyApplied { period: today });
        }

        let clear = policy.clear_current_leads_on_daily_reset;
        let mut leases = clear.then(|| self.leases.lock());
        let mut agents = 0u64;
        for mut entry in self.agents.iter_mut() {
            entry.workload.assigned_today = 0;
            if clear {
                entry.workload.current_leads = 0;
            }
            agents += 1;
        }
        let dropped_leases = leases.as_mut().map_or(0, |leases| {
            let open = leases.len();
            leases.clear();
            open
        });
        *last = Some(today);

        info!(%today, agents, cleared_current_leads = clear, dropped_leases, "Daily counters reset");
        Ok(ResetOutcome::Applied {
            agents,
            cleared_current_leads: clear,
        })
    }

    async fn reset_monthly(&self, today: NaiveDate) -> Result<ResetOutcome> {
        let period = month_start(today);
        let mut last = self.last_monthly_reset.lock();
        if *last == Some(period) {
            return Ok(ResetOutcome::AlreadyApplied { period });
        }

        let mut agents = 0u64;
        for mut entry in self.agents.iter_mut() {
            entry.workload.assigned_this_month = 0;
            agents += 1;
        }
        *last = Some(period);

        info!(%period, agents, "Monthly counters reset");
        Ok(ResetOutcome::Applied {
            agents,
            cleared_current_leads: false,
        })
    }
}

#[async_trait]
impl LeaseLedger for MemoryAgentStore {
    async fn claim_with_lease(&self, lease: &Lease) -> Result<bool> {
        let mut leases = self.leases.lock();
        let Some(mut entry) = self.agents.get_mut(&lease.agent_id) else {
            return Ok(false);
        };
        if !claim_slot(&mut entry) {
            return Ok(false);
        }
        leases.insert(lease.id, lease.clone());
        Ok(true)
    }

    async fn release_lease(&self, lease_id: &Uuid, success: bool) -> Result<Option<Released>> {
        let mut leases = self.leases.lock();
        let Some(lease) = leases.get(lease_id).cloned() else {
            return Ok(None);
        };
        let mut entry = self
            .agents
            .get_mut(&lease.agent_id)
            .ok_or_else(|| not_found(&lease.agent_id))?;
        let completion = release_slot(&mut entry, success);
        leases.remove(lease_id);
        Ok(Some(Released { lease, completion }))
    }

    async fn release_oldest_for(
        &self,
        agent_id: &AgentId,
        success: bool,
    ) -> Result<(Option<Lease>, CompletionOutcome)> {
        let mut leases = self.leases.lock();
        let mut entry = self.agents.get_mut(agent_id).ok_or_else(|| not_found(agent_id))?;
        let oldest = leases
            .values()
            .filter(|lease| &lease.agent_id == agent_id)
            .min_by_key(|lease| (lease.issued_at, lease.id))
            .map(|lease| lease.id);
        let completion = release_slot(&mut entry, success);
        let retired = oldest.and_then(|id| leases.remove(&id));
        Ok((retired, completion))
    }

    async fn leases_issued_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Lease>> {
        let mut expired: Vec<Lease> = self
            .leases
            .lock()
            .values()
            .filter(|lease| lease.issued_at <= cutoff)
            .cloned()
            .collect();
        sort_leases(&mut expired);
        Ok(expired)
    }

    async fn open_leases(&self) -> Result<Vec<Lease>> {
        let mut open: Vec<Lease> = self.leases.lock().values().cloned().collect();
        sort_leases(&mut open);
        Ok(open)
    }
}

#[async_trait]
impl AssignmentLog for MemoryAgentStore {
    async fn record_assignment(&self, record: &AssignmentRecord) -> Result<()> {
        let mut log = self.assignments.lock();
        if log.len() >= self.log_capacity {
            log.pop_front();
        }
        log.push_back(record.clone());
        Ok(())
    }

    async fn recent_assignments(&self, limit: usize) -> Result<Vec<AssignmentRecord>> {
        let log = self.assignments.lock();
        Ok(log.iter().rev().take(limit).cloned().collect())
    }
}
