//! Assignment results handed back to callers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::agent::AgentId;
use crate::config::AssignmentStrategy;

/// A committed assignment
///
/// The agent's capacity stays reserved until the caller reports completion
/// with [`crate::routing::AssignmentEngine::complete`] (by `lease_id`) or
/// the lease expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub lease_id: Uuid,
    pub agent_id: AgentId,
    pub agent_name: String,
    pub contact: String,
    /// Match score; `None` for round-robin picks
    pub score: Option<f64>,
    pub strategy: AssignmentStrategy,
    pub assigned_at: DateTime<Utc>,
}

/// Why nobody got the lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum NoAgentReason {
    /// No agent has status `active`
    NoActiveAgents,
    /// Active agents exist but hours, hints or scoring ruled them all out
    NoEligibleAgents,
    /// Every eligible agent was already full when candidates were fetched
    AllAtCapacity,
    /// Every ranked candidate lost its claim to a concurrent request
    ClaimRaceExhausted { attempts: u32 },
}

impl fmt::Display for NoAgentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoAgentReason::NoActiveAgents => write!(f, "no active agents"),
            NoAgentReason::NoEligibleAgents => write!(f, "no eligible agents"),
            NoAgentReason::AllAtCapacity => write!(f, "all agents at capacity"),
            NoAgentReason::ClaimRaceExhausted { attempts } => {
                write!(f, "claim race exhausted after {} attempts", attempts)
            }
        }
    }
}

/// Outcome of one assignment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentOutcome {
    Assigned(Assignment),
    NoAgentAvailable(NoAgentReason),
}

impl AssignmentOutcome {
    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            AssignmentOutcome::Assigned(a) => Some(a),
            AssignmentOutcome::NoAgentAvailable(_) => None,
        }
    }

    pub fn into_assignment(self) -> Option<Assignment> {
        match self {
            AssignmentOutcome::Assigned(a) => Some(a),
            AssignmentOutcome::NoAgentAvailable(_) => None,
        }
    }

    pub fn agent_id(&self) -> Option<&AgentId> {
        self.assignment().map(|a| &a.agent_id)
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, AssignmentOutcome::Assigned(_))
    }
}
