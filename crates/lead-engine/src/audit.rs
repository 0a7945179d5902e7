//! Assignment audit trail

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentId;
use crate::config::AssignmentStrategy;
use crate::error::Result;
use crate::lead::Lead;
use crate::routing::{AssignmentOutcome, NoAgentReason};

/// One line of the audit trail, written for every assignment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub id: Uuid,
    pub agent_id: Option<AgentId>,
    pub score: Option<f64>,
    pub strategy: AssignmentStrategy,
    pub no_agent_reason: Option<NoAgentReason>,
    pub lead_amount: Option<f64>,
    pub lead_purpose: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl AssignmentRecord {
    pub fn from_outcome(
        outcome: &AssignmentOutcome,
        strategy: AssignmentStrategy,
        lead: Option<&Lead>,
        at: DateTime<Utc>,
    ) -> Self {
        let (id, agent_id, score, strategy, no_agent_reason) = match outcome {
            AssignmentOutcome::Assigned(a) => (
                a.lease_id,
                Some(a.agent_id.clone()),
                a.score,
                a.strategy,
                None,
            ),
            AssignmentOutcome::NoAgentAvailable(reason) => {
                (Uuid::new_v4(), None, None, strategy, Some(*reason))
            }
        };
        Self {
            id,
            agent_id,
            score,
            strategy,
            no_agent_reason,
            lead_amount: lead.and_then(|l| l.amount),
            lead_purpose: lead.and_then(|l| l.purpose.clone()),
            recorded_at: at,
        }
    }
}

#[async_trait]
pub trait AssignmentLog: Send + Sync {
    async fn record_assignment(&self, record: &AssignmentRecord) -> Result<()>;

    /// Newest first
    async fn recent_assignments(&self, limit: usize) -> Result<Vec<AssignmentRecord>>;
}
