//! Core types for sales agents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::hours::WorkingHours;
use crate::error::{LeadEngineError, Result};

/// Highest accepted agent priority
pub const MAX_PRIORITY: u8 = 10;

/// Agent status enumeration
///
/// Only [`AgentStatus::Active`] agents are eligible for assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Accepting leads
    Active,

    /// Switched off by an administrator
    Inactive,

    /// Temporarily away
    OnLeave,

    /// Manually marked busy; not eligible even with spare capacity
    Busy,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
            AgentStatus::OnLeave => "on_leave",
            AgentStatus::Busy => "busy",
        }
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self, AgentStatus::Active)
    }
}

impl std::str::FromStr for AgentStatus {
    type Err = LeadEngineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" | "Active" | "ACTIVE" => Ok(AgentStatus::Active),
            "inactive" | "Inactive" | "INACTIVE" => Ok(AgentStatus::Inactive),
            "on_leave" | "OnLeave" | "ON_LEAVE" | "on-leave" => Ok(AgentStatus::OnLeave),
            "busy" | "Busy" | "BUSY" => Ok(AgentStatus::Busy),
            _ => Err(LeadEngineError::Serialization(format!("Unknown agent status: {}", s))),
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent identifier type for strongly-typed agent references
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        AgentId(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        AgentId(s.to_string())
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AgentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Inclusive loan-amount range an agent specialises in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

impl AmountRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, amount: f64) -> bool {
        amount >= self.min && amount <= self.max
    }
}

impl Default for AmountRange {
    fn default() -> Self {
        Self { min: 0.0, max: 100_000.0 }
    }
}

/// What an agent is good at
///
/// An empty set means "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Specialties {
    pub amount_range: AmountRange,
    pub loan_purposes: BTreeSet<String>,
    pub regions: BTreeSet<String>,
    pub languages: BTreeSet<String>,
}

impl Specialties {
    pub fn with_amount_range(mut self, min: f64, max: f64) -> Self {
        self.amount_range = AmountRange::new(min, max);
        self
    }

    pub fn with_purposes<I, S>(mut self, purposes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.loan_purposes = purposes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Region hint check; unrestricted agents serve every region
    pub fn serves_region(&self, region: &str) -> bool {
        self.regions.is_empty() || self.regions.iter().any(|r| r.eq_ignore_ascii_case(region))
    }

    /// Language hint check; unrestricted agents speak every language
    pub fn speaks(&self, language: &str) -> bool {
        self.languages.is_empty() || self.languages.iter().any(|l| l.eq_ignore_ascii_case(language))
    }
}

/// Two-state daily capacity cycle of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// `current_leads < max_leads`
    Accepting,
    /// `current_leads == max_leads`
    Full,
}

/// Capacity counters owned by the workload ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workload {
    pub current_leads: u32,
    pub max_leads: u32,
    pub assigned_today: u32,
    pub assigned_this_month: u32,
    pub assigned_total: u32,
}

impl Workload {
    pub fn with_capacity(max_leads: u32) -> Self {
        Self {
            max_leads,
            ..Self::default()
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.current_leads < self.max_leads
    }

    pub fn remaining(&self) -> u32 {
        self.max_leads.saturating_sub(self.current_leads)
    }

    pub fn load_state(&self) -> LoadState {
        if self.has_capacity() {
            LoadState::Accepting
        } else {
            LoadState::Full
        }
    }

    /// Load as a percentage of capacity; an agent without capacity counts as full
    pub fn utilization(&self) -> f64 {
        if self.max_leads == 0 {
            return 100.0;
        }
        self.current_leads as f64 / self.max_leads as f64 * 100.0
    }
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            current_leads: 0,
            max_leads: 20,
            assigned_today: 0,
            assigned_this_month: 0,
            assigned_total: 0,
        }
    }
}

/// Historical performance, recomputed on lead completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Performance {
    /// Percentage, 0-100
    pub conversion_rate: f64,
    pub closed_deals: u32,
    pub total_loan_amount: f64,
    /// Minutes
    pub avg_response_time: f64,
}

/// A sales agent eligible to receive leads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    /// Opaque messaging handle (e.g. a WhatsApp number)
    pub contact: String,
    #[serde(default)]
    pub email: Option<String>,
    pub status: AgentStatus,
    #[serde(default)]
    pub specialties: Specialties,
    /// 0-10, higher is preferred
    #[serde(default)]
    pub priority: u8,
    #[serde(default)]
    pub workload: Workload,
    #[serde(default)]
    pub performance: Performance,
    #[serde(default)]
    pub working_hours: WorkingHours,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub last_assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// New active agent with default specialties and a capacity of 20
    pub fn new(id: impl Into<AgentId>, name: impl Into<String>, contact: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            contact: contact.into(),
            email: None,
            status: AgentStatus::Active,
            specialties: Specialties::default(),
            priority: 1,
            workload: Workload::default(),
            performance: Performance::default(),
            working_hours: WorkingHours::default(),
            notes: String::new(),
            last_assigned_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_capacity(mut self, max_leads: u32) -> Self {
        self.workload.max_leads = max_leads;
        self
    }

    pub fn with_specialties(mut self, specialties: Specialties) -> Self {
        self.specialties = specialties;
        self
    }

    pub fn with_performance(mut self, conversion_rate: f64, closed_deals: u32) -> Self {
        self.performance.conversion_rate = conversion_rate;
        self.performance.closed_deals = closed_deals;
        self
    }

    pub fn with_working_hours(mut self, hours: WorkingHours) -> Self {
        self.working_hours = hours;
        self
    }

    pub fn load_state(&self) -> LoadState {
        self.workload.load_state()
    }

    /// Check the record for values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let malformed = |reason: String| LeadEngineError::malformed_agent(self.id.as_str(), reason);

        if self.id.as_str().trim().is_empty() {
            return Err(malformed("empty agent id".to_string()));
        }
        if self.priority > MAX_PRIORITY {
            return Err(malformed(format!(
                "priority {} exceeds {}",
                self.priority, MAX_PRIORITY
            )));
        }

        let range = self.specialties.amount_range;
        if !range.min.is_finite() || !range.max.is_finite() {
            return Err(malformed("loan amount range is not finite".to_string()));
        }
        if range.min < 0.0 || range.min > range.max {
            return Err(malformed(format!(
                "invalid loan amount range [{}, {}]",
                range.min, range.max
            )));
        }

        let rate = self.performance.conversion_rate;
        if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
            return Err(malformed(format!("conversion rate {} outside 0-100", rate)));
        }

        if self.workload.current_leads > self.workload.max_leads {
            return Err(malformed(format!(
                "current leads {} exceed capacity {}",
                self.workload.current_leads, self.workload.max_leads
            )));
        }

        self.working_hours.validate().map_err(|e| malformed(e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            AgentStatus::Active,
            AgentStatus::Inactive,
            AgentStatus::OnLeave,
            AgentStatus::Busy,
        ] {
            assert_eq!(status.as_str().parse::<AgentStatus>().unwrap(), status);
        }
        assert!("retired".parse::<AgentStatus>().is_err());
        assert!(AgentStatus::Active.is_eligible());
        assert!(!AgentStatus::Busy.is_eligible());
    }

    #[test]
    fn test_load_state_transitions() {
        let mut workload = Workload::with_capacity(2);
        assert_eq!(workload.load_state(), LoadState::Accepting);
        workload.current_leads = 2;
        assert_eq!(workload.load_state(), LoadState::Full);
        assert_eq!(workload.remaining(), 0);

        let zero = Workload::with_capacity(0);
        assert_eq!(zero.load_state(), LoadState::Full);
        assert_eq!(zero.utilization(), 100.0);
    }

    #[test]
    fn test_validate_rejects_bad_records() {
        let base = Agent::new("a-1", "Aina", "+60111111111");
        assert!(base.validate().is_ok());

        assert!(base.clone().with_priority(11).validate().is_err());
        assert!(base
            .clone()
            .with_specialties(Specialties::default().with_amount_range(5000.0, 100.0))
            .validate()
            .is_err());
        assert!(base.clone().with_performance(f64::NAN, 0).validate().is_err());
        assert!(base.clone().with_performance(120.0, 0).validate().is_err());

        let mut overfull = base.with_capacity(1);
        overfull.workload.current_leads = 2;
        assert!(matches!(
            overfull.validate(),
            Err(LeadEngineError::MalformedAgent { .. })
        ));
    }

    #[test]
    fn test_unrestricted_hints_match_everything() {
        let open = Specialties::default();
        assert!(open.serves_region("Johor"));
        assert!(open.speaks("Tamil"));

        let narrow = Specialties::default()
            .with_regions(["Selangor"])
            .with_languages(["Malay", "English"]);
        assert!(narrow.serves_region("selangor"));
        assert!(!narrow.serves_region("Penang"));
        assert!(narrow.speaks("english"));
        assert!(!narrow.speaks("Chinese"));
    }
}
