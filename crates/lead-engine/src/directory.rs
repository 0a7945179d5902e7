//! Agent Directory: read/write access to the agent roster
//!
//! Pure data access. Workload counters are only ever changed through
//! [`crate::ledger::WorkloadLedger`].

use async_trait::async_trait;

use crate::agent::{Agent, AgentId, AgentStatus};
use crate::error::Result;

#[async_trait]
pub trait AgentDirectory: Send + Sync {
    /// Every agent, ordered by id
    async fn list_agents(&self) -> Result<Vec<Agent>>;

    /// Agents with status `active`, ordered by id
    async fn list_active_agents(&self) -> Result<Vec<Agent>> {
        Ok(self
            .list_agents()
            .await?
            .into_iter()
            .filter(|a| a.status.is_eligible())
            .collect())
    }

    async fn get_agent(&self, agent_id: &AgentId) -> Result<Option<Agent>>;

    /// Insert or fully replace an agent record
    async fn upsert_agent(&self, agent: &Agent) -> Result<()>;

    /// Insert `agent` unless the id is taken; `Ok(false)` if it was
    async fn insert_agent(&self, agent: &Agent) -> Result<bool>;

    /// Overwrite the profile of an existing agent
    ///
    /// Changes name, contact, email, status, specialties, priority,
    /// max_leads, working hours and notes. Workload counters and performance
    /// are left as they are, so concurrent claims and completions are never
    /// lost. `Ok(false)` if the agent does not exist; a `max_leads` below
    /// the agent's open leads is rejected as malformed.
    async fn update_profile(&self, agent: &Agent) -> Result<bool>;

    async fn set_agent_status(&self, agent_id: &AgentId, status: AgentStatus) -> Result<()>;

    /// Returns whether the agent existed
    async fn remove_agent(&self, agent_id: &AgentId) -> Result<bool>;
}
