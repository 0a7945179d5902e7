//! Output formatting

use clap::ValueEnum;
use leadroute_engine::prelude::*;
use leadroute_engine::report::AgentLoad;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

pub fn print_json<T: Serialize>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

pub fn render<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
pub struct AgentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: u8,
    #[tabled(rename = "Leads")]
    leads: String,
    #[tabled(rename = "Amount range")]
    amount_range: String,
    #[tabled(rename = "Purposes")]
    purposes: String,
    #[tabled(rename = "Conv %")]
    conversion: String,
}

impl From<&Agent> for AgentRow {
    fn from(agent: &Agent) -> Self {
        let purposes = if agent.specialties.loan_purposes.is_empty() {
            "any".to_string()
        } else {
            agent
                .specialties
                .loan_purposes
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        };
        AgentRow {
            id: agent.id.to_string(),
            name: agent.name.clone(),
            status: agent.status.to_string(),
            priority: agent.priority,
            leads: format!("{}/{}", agent.workload.current_leads, agent.workload.max_leads),
            amount_range: format!(
                "{:.0} - {:.0}",
                agent.specialties.amount_range.min, agent.specialties.amount_range.max
            ),
            purposes,
            conversion: format!("{:.1}", agent.performance.conversion_rate),
        }
    }
}

#[derive(Tabled)]
pub struct LoadRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Leads")]
    leads: String,
    #[tabled(rename = "Util %")]
    utilization: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Today")]
    today: u32,
    #[tabled(rename = "Month")]
    month: u32,
    #[tabled(rename = "Total")]
    total: u32,
    #[tabled(rename = "Closed")]
    closed: u32,
}

impl From<&AgentLoad> for LoadRow {
    fn from(load: &AgentLoad) -> Self {
        let state = match (load.load_state, load.near_capacity) {
            (LoadState::Full, _) => "full",
            (LoadState::Accepting, true) => "near capacity",
            (LoadState::Accepting, false) => "accepting",
        };
        LoadRow {
            id: load.agent_id.to_string(),
            name: load.name.clone(),
            status: load.status.to_string(),
            leads: format!("{}/{}", load.current_leads, load.max_leads),
            utilization: format!("{:.0}", load.utilization),
            state: state.to_string(),
            today: load.assigned_today,
            month: load.assigned_this_month,
            total: load.assigned_total,
            closed: load.closed_deals,
        }
    }
}

#[derive(Tabled)]
pub struct RecordRow {
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "Agent")]
    agent: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Purpose")]
    purpose: String,
}

impl From<&AssignmentRecord> for RecordRow {
    fn from(record: &AssignmentRecord) -> Self {
        let agent = match (&record.agent_id, &record.no_agent_reason) {
            (Some(id), _) => id.to_string(),
            (None, Some(reason)) => format!("- ({})", reason),
            (None, None) => "-".to_string(),
        };
        RecordRow {
            when: record.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            strategy: record.strategy.to_string(),
            agent,
            score: record.score.map(|s| format!("{:.1}", s)).unwrap_or_else(|| "-".into()),
            amount: record.lead_amount.map(|a| format!("{:.0}", a)).unwrap_or_else(|| "-".into()),
            purpose: record.lead_purpose.clone().unwrap_or_else(|| "-".into()),
        }
    }
}

#[derive(Tabled)]
pub struct LeaseRow {
    #[tabled(rename = "Lease")]
    lease: String,
    #[tabled(rename = "Agent")]
    agent: String,
    #[tabled(rename = "Issued")]
    issued: String,
}

impl From<&Lease> for LeaseRow {
    fn from(lease: &Lease) -> Self {
        LeaseRow {
            lease: lease.id.to_string(),
            agent: lease.agent_id.to_string(),
            issued: lease.issued_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Plain-text distribution report
pub fn report_text(report: &DistributionReport) -> String {
    let mut out = String::new();
    let totals = &report.totals;
    out.push_str(&format!(
        "Agents: {} ({} active)\nOpen leads: {} / {} ({:.1}% utilized, {} remaining)\nAssigned today: {}  this month: {}\n\n",
        totals.agents,
        totals.active_agents,
        totals.open_leads,
        totals.capacity,
        totals.utilization,
        report.remaining_capacity(),
        totals.assigned_today,
        totals.assigned_this_month,
    ));
    out.push_str(&render(report.agents.iter().map(LoadRow::from).collect()));
    out.push('\n');

    if let Some(balance) = &report.balance {
        out.push_str(&format!(
            "\nWorkload balance: {} (avg {:.1}, min {}, max {}, spread {})\n",
            balance.balance, balance.average, balance.min, balance.max, balance.spread
        ));
    }
    if !report.full_agents.is_empty() {
        let full: Vec<String> = report.full_agents.iter().map(|id| id.to_string()).collect();
        out.push_str(&format!("Full: {}\n", full.join(", ")));
    }
    if !report.accepting_agents.is_empty() {
        let accepting: Vec<String> = report
            .accepting_agents
            .iter()
            .map(|(id, remaining)| format!("{} ({} left)", id, remaining))
            .collect();
        out.push_str(&format!("Accepting: {}\n", accepting.join(", ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_row_shows_any_purpose_when_unrestricted() {
        let agent = Agent::new("agent-001", "Cheng", "+60123456789").with_capacity(10);
        let table = render(vec![AgentRow::from(&agent)]);
        assert!(table.contains("agent-001"));
        assert!(table.contains("0/10"));
        assert!(table.contains("any"));
    }

    #[test]
    fn test_report_text_lists_full_agents() {
        let mut full = Agent::new("agent-001", "Cheng", "x").with_capacity(1);
        full.workload.current_leads = 1;
        let open = Agent::new("agent-002", "Sarah", "y").with_capacity(4);
        let report = DistributionReport::build(&[full, open]);

        let text = report_text(&report);
        assert!(text.contains("Full: agent-001"));
        assert!(text.contains("agent-002 (4 left)"));
        assert!(text.contains("Open leads: 1 / 5"));
    }

    #[test]
    fn test_lease_row_shows_full_id() {
        let lease = Lease::new(AgentId::from("agent-002"), chrono::Utc::now());
        let table = render(vec![LeaseRow::from(&lease)]);
        assert!(table.contains(&lease.id.to_string()));
        assert!(table.contains("agent-002"));
    }
}
