//! Distribution report
//!
//! Read-only summary of how leads are spread across the roster: totals,
//! per-agent load and a balance classification of open leads among active
//! agents.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agent::{Agent, AgentId, AgentStatus, LoadState};

/// Spread at or below which workload counts as even
pub const EVEN_SPREAD: u32 = 3;
/// Spread at or below which workload counts as fair
pub const FAIR_SPREAD: u32 = 5;
/// Utilization from which an accepting agent is flagged as nearly full
pub const NEAR_CAPACITY_PERCENT: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Balance {
    Even,
    Fair,
    Uneven,
}

impl Balance {
    pub fn from_spread(spread: u32) -> Self {
        if spread <= EVEN_SPREAD {
            Balance::Even
        } else if spread <= FAIR_SPREAD {
            Balance::Fair
        } else {
            Balance::Uneven
        }
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Balance::Even => write!(f, "even"),
            Balance::Fair => write!(f, "fair"),
            Balance::Uneven => write!(f, "uneven"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub agents: usize,
    pub active_agents: usize,
    pub open_leads: u64,
    pub capacity: u64,
    /// Open leads over capacity, percent
    pub utilization: f64,
    pub assigned_today: u64,
    pub assigned_this_month: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLoad {
    pub agent_id: AgentId,
    pub name: String,
    pub status: AgentStatus,
    pub current_leads: u32,
    pub max_leads: u32,
    pub utilization: f64,
    pub load_state: LoadState,
    pub near_capacity: bool,
    pub assigned_today: u32,
    pub assigned_this_month: u32,
    pub assigned_total: u32,
    pub conversion_rate: f64,
    pub closed_deals: u32,
    pub priority: u8,
}

/// Open-lead spread among active agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadBalance {
    pub average: f64,
    pub min: u32,
    pub max: u32,
    pub spread: u32,
    pub balance: Balance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionReport {
    pub totals: ReportTotals,
    /// Highest priority first, then by id
    pub agents: Vec<AgentLoad>,
    /// `None` when no agent is active
    pub balance: Option<WorkloadBalance>,
    /// Active agents at capacity
    pub full_agents: Vec<AgentId>,
    /// Active agents with spare capacity, and how much
    pub accepting_agents: Vec<(AgentId, u32)>,
}

impl DistributionReport {
    pub fn build(agents: &[Agent]) -> Self {
        let mut totals = ReportTotals {
            agents: agents.len(),
            ..ReportTotals::default()
        };
        for agent in agents {
            let w = &agent.workload;
            if agent.status.is_eligible() {
                totals.active_agents += 1;
            }
            totals.open_leads += u64::from(w.current_leads);
            totals.capacity += u64::from(w.max_leads);
            totals.assigned_today += u64::from(w.assigned_today);
            totals.assigned_this_month += u64::from(w.assigned_this_month);
        }
        totals.utilization = totals.open_leads as f64 / totals.capacity.max(1) as f64 * 100.0;

        let mut rows: Vec<AgentLoad> = agents.iter().map(agent_load).collect();
        rows.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.agent_id.cmp(&b.agent_id)));

        let active: Vec<&Agent> = agents.iter().filter(|a| a.status.is_eligible()).collect();
        let balance = workload_balance(&active);

        let mut full_agents = Vec::new();
        let mut accepting_agents = Vec::new();
        for agent in &active {
            match agent.load_state() {
                LoadState::Full => full_agents.push(agent.id.clone()),
                LoadState::Accepting => {
                    accepting_agents.push((agent.id.clone(), agent.workload.remaining()))
                }
            }
        }
        full_agents.sort();
        accepting_agents.sort();

        Self {
            totals,
            agents: rows,
            balance,
            full_agents,
            accepting_agents,
        }
    }

    /// Spare slots across all active agents
    pub fn remaining_capacity(&self) -> u64 {
        self.accepting_agents
            .iter()
            .map(|(_, remaining)| u64::from(*remaining))
            .sum()
    }
}

fn agent_load(agent: &Agent) -> AgentLoad {
    let w = &agent.workload;
    let utilization = w.utilization();
    AgentLoad {
        agent_id: agent.id.clone(),
        name: agent.name.clone(),
        status: agent.status,
        current_leads: w.current_leads,
        max_leads: w.max_leads,
        utilization,
        load_state: w.load_state(),
        near_capacity: w.has_capacity() && utilization >= NEAR_CAPACITY_PERCENT,
        assigned_today: w.assigned_today,
        assigned_this_month: w.assigned_this_month,
        assigned_total: w.assigned_total,
        conversion_rate: agent.performance.conversion_rate,
        closed_deals: agent.performance.closed_deals,
        priority: agent.priority,
    }
}

fn workload_balance(active: &[&Agent]) -> Option<WorkloadBalance> {
    let loads: Vec<u32> = active.iter().map(|a| a.workload.current_leads).collect();
    let min = *loads.iter().min()?;
    let max = *loads.iter().max()?;
    let total: u64 = loads.iter().map(|&l| u64::from(l)).sum();
    let spread = max - min;
    Some(WorkloadBalance {
        average: total as f64 / loads.len() as f64,
        min,
        max,
        spread,
        balance: Balance::from_spread(spread),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: &str, current: u32, max: u32) -> Agent {
        let mut agent = Agent::new(id, id.to_uppercase(), "x").with_capacity(max);
        agent.workload.current_leads = current;
        agent
    }

    #[test]
    fn test_empty_roster() {
        let report = DistributionReport::build(&[]);
        assert_eq!(report.totals.agents, 0);
        assert_eq!(report.totals.utilization, 0.0);
        assert!(report.balance.is_none());
    }

    #[test]
    fn test_totals_and_states() {
        let agents = vec![
            agent("a", 3, 3),
            agent("b", 1, 3),
            agent("c", 2, 4).with_status(AgentStatus::Inactive),
        ];
        let report = DistributionReport::build(&agents);

        assert_eq!(report.totals.agents, 3);
        assert_eq!(report.totals.active_agents, 2);
        assert_eq!(report.totals.open_leads, 6);
        assert_eq!(report.totals.capacity, 10);
        assert_eq!(report.totals.utilization, 60.0);
        assert_eq!(report.full_agents, vec![AgentId::from("a")]);
        assert_eq!(report.accepting_agents, vec![(AgentId::from("b"), 2)]);
        assert_eq!(report.remaining_capacity(), 2);

        let balance = report.balance.unwrap();
        assert_eq!(balance.spread, 2);
        assert_eq!(balance.average, 2.0);
        assert_eq!(balance.balance, Balance::Even);
    }

    #[test]
    fn test_balance_thresholds() {
        assert_eq!(Balance::from_spread(3), Balance::Even);
        assert_eq!(Balance::from_spread(5), Balance::Fair);
        assert_eq!(Balance::from_spread(6), Balance::Uneven);
    }

    #[test]
    fn test_rows_sorted_by_priority() {
        let agents = vec![
            agent("a", 0, 5).with_priority(2),
            agent("b", 4, 5).with_priority(9),
        ];
        let report = DistributionReport::build(&agents);
        assert_eq!(report.agents[0].agent_id.as_str(), "b");
        assert!(report.agents[0].near_capacity);
        assert!(!report.agents[1].near_capacity);
    }
}
