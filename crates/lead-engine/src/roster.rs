//! Roster files
//!
//! A TOML roster describes the sales team: shared `[defaults]` plus one
//! `[[agents]]` table per agent. Seeding creates missing agents in an
//! [`AgentDirectory`] and refreshes the profile of the ones it already has.
//!
//! ```toml
//! [defaults]
//! priority = 10
//! max_leads = 20
//!
//! [defaults.specialties]
//! amount_range = { min = 0, max = 100000 }
//! loan_purposes = ["personal", "business"]
//! languages = ["Malay", "English"]
//!
//! [[agents]]
//! id = "agent-001"
//! name = "Cheng"
//! contact = "+60123456789"
//! max_leads = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::agent::{Agent, AgentStatus, Specialties, WorkingHours};
use crate::directory::AgentDirectory;
use crate::error::{LeadEngineError, Result};

/// Values applied to every entry that does not set its own
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterDefaults {
    pub status: AgentStatus,
    pub priority: u8,
    pub max_leads: u32,
    pub specialties: Specialties,
    pub working_hours: WorkingHours,
}

impl Default for RosterDefaults {
    fn default() -> Self {
        Self {
            status: AgentStatus::Active,
            priority: 10,
            max_leads: 20,
            specialties: Specialties::default(),
            working_hours: WorkingHours::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Defaults to `agent-NNN` by position
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub contact: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: Option<AgentStatus>,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub max_leads: Option<u32>,
    #[serde(default)]
    pub specialties: Option<Specialties>,
    #[serde(default)]
    pub working_hours: Option<WorkingHours>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub defaults: RosterDefaults,
    #[serde(default)]
    pub agents: Vec<RosterEntry>,
}

/// What a seeding run changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSummary {
    pub created: usize,
    pub updated: usize,
}

impl Roster {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let roster: Self = toml::from_str(source)?;
        Ok(roster)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            LeadEngineError::configuration(format!("cannot read roster {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    /// Merge defaults into every entry; fails on the first invalid agent
    /// or duplicate id
    pub fn to_agents(&self) -> Result<Vec<Agent>> {
        let mut agents: Vec<Agent> = Vec::with_capacity(self.agents.len());
        for (index, entry) in self.agents.iter().enumerate() {
            let id = entry
                .id
                .clone()
                .unwrap_or_else(|| format!("agent-{:03}", index + 1));
            if agents.iter().any(|a| a.id.as_str() == id) {
                return Err(LeadEngineError::AlreadyExists(format!(
                    "agent {} listed twice in roster",
                    id
                )));
            }

            let mut agent = Agent::new(id, entry.name.clone(), entry.contact.clone())
                .with_status(entry.status.unwrap_or(self.defaults.status))
                .with_priority(entry.priority.unwrap_or(self.defaults.priority))
                .with_capacity(entry.max_leads.unwrap_or(self.defaults.max_leads))
                .with_specialties(
                    entry
                        .specialties
                        .clone()
                        .unwrap_or_else(|| self.defaults.specialties.clone()),
                )
                .with_working_hours(
                    entry
                        .working_hours
                        .clone()
                        .unwrap_or_else(|| self.defaults.working_hours.clone()),
                );
            agent.email = entry.email.clone();
            agent.notes = entry.notes.clone();
            agent.validate()?;
            agents.push(agent);
        }
        Ok(agents)
    }

    /// Create missing roster agents and refresh the profile of existing ones
    ///
    /// Existing agents keep their live counters, performance history and
    /// creation time. Profiles are written with
    /// [`AgentDirectory::update_profile`] and new agents with
    /// [`AgentDirectory::insert_agent`]; neither overwrites a counter, so
    /// seeding is safe while assignments are running.
    pub async fn seed<D>(&self, directory: &D) -> Result<SeedSummary>
    where
        D: AgentDirectory + ?Sized,
    {
        let mut summary = SeedSummary::default();
        for agent in self.to_agents()? {
            if directory.update_profile(&agent).await? {
                summary.updated += 1;
            } else if directory.insert_agent(&agent).await? {
                summary.created += 1;
            } else if directory.update_profile(&agent).await? {
                // Created by another seeder between the two calls
                summary.updated += 1;
            } else {
                return Err(LeadEngineError::not_found(format!(
                    "agent {} removed while seeding",
                    agent.id
                )));
            }
        }
        info!(created = summary.created, updated = summary.updated, "🌱 Roster seeded");
        Ok(summary)
    }
}
