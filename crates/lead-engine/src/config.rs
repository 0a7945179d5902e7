use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{LeadEngineError, Result};

/// Environment variable that overrides [`DatabaseConfig::url`]
pub const DATABASE_URL_ENV: &str = "LEADROUTE_DATABASE_URL";

/// Lead engine configuration
///
/// # Configuration Sections
///
/// - [`scoring`]: weights and constants of the match score
/// - [`assignment`]: strategy selection and eligibility filters
/// - [`reset`]: daily/monthly counter reset policy
/// - [`leases`]: expiry of assignments that are never completed
/// - [`database`]: SQLite storage
///
/// # Examples
///
/// ```
/// use leadroute_engine::config::{LeadEngineConfig, AssignmentStrategy};
///
/// let mut config = LeadEngineConfig::default();
/// assert_eq!(config.scoring.workload_weight, 30.0);
///
/// config.assignment.default_strategy = AssignmentStrategy::RoundRobin;
/// config.validate().expect("Configuration should be valid");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadEngineConfig {
    pub scoring: ScoringConfig,
    pub assignment: AssignmentConfig,
    pub reset: ResetConfig,
    pub leases: LeaseConfig,
    pub database: DatabaseConfig,
}

/// Weights and constants of the five-part match score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub workload_weight: f64,
    pub amount_weight: f64,
    pub performance_weight: f64,
    pub specialty_weight: f64,
    pub priority_weight: f64,

    /// Specialty score when the lead's purpose is in the agent's set
    pub specialty_match_score: f64,

    /// Specialty score when the agent has purposes but not this one
    pub specialty_mismatch_score: f64,

    /// Specialty score when the agent lists no purposes at all
    pub unrestricted_specialty_score: f64,

    /// Closed deals beyond this count add nothing to the performance score
    pub closed_deals_cap: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            workload_weight: 30.0,
            amount_weight: 25.0,
            performance_weight: 20.0,
            specialty_weight: 15.0,
            priority_weight: 10.0,
            specialty_match_score: 100.0,
            specialty_mismatch_score: 30.0,
            unrestricted_specialty_score: 50.0,
            closed_deals_cap: 100,
        }
    }
}

impl ScoringConfig {
    fn weights(&self) -> [(&'static str, f64); 5] {
        [
            ("workload_weight", self.workload_weight),
            ("amount_weight", self.amount_weight),
            ("performance_weight", self.performance_weight),
            ("specialty_weight", self.specialty_weight),
            ("priority_weight", self.priority_weight),
        ]
    }
}

/// Selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    /// Five-factor weighted match
    Weighted,
    /// Least assigned today first
    RoundRobin,
}

impl std::fmt::Display for AssignmentStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentStrategy::Weighted => write!(f, "weighted"),
            AssignmentStrategy::RoundRobin => write!(f, "round_robin"),
        }
    }
}

impl std::str::FromStr for AssignmentStrategy {
    type Err = LeadEngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "weighted" => Ok(AssignmentStrategy::Weighted),
            "round_robin" | "round-robin" => Ok(AssignmentStrategy::RoundRobin),
            other => Err(LeadEngineError::Serialization(format!(
                "Unknown assignment strategy: {}",
                other
            ))),
        }
    }
}

/// Assignment behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentConfig {
    pub default_strategy: AssignmentStrategy,

    /// Drop agents outside their working hours before scoring
    pub enforce_working_hours: bool,

    /// Offset of the business timezone that schedules are written in
    pub working_hours_utc_offset_minutes: i32,

    /// Drop agents who do not serve the lead's region hint
    pub require_region_match: bool,

    /// Drop agents who do not speak the lead's language hint
    pub require_language_match: bool,

    /// Use round-robin when eligible agents exist but none could be scored
    pub fallback_to_round_robin: bool,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            default_strategy: AssignmentStrategy::Weighted,
            enforce_working_hours: false,
            working_hours_utc_offset_minutes: 0,
            require_region_match: false,
            require_language_match: false,
            fallback_to_round_robin: true,
        }
    }
}

impl AssignmentConfig {
    pub fn business_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.working_hours_utc_offset_minutes * 60).ok_or_else(|| {
            LeadEngineError::configuration(format!(
                "working_hours_utc_offset_minutes {} out of range",
                self.working_hours_utc_offset_minutes
            ))
        })
    }
}

/// Counter reset policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetConfig {
    /// Business rule "assume all leads are closed by day's end": the daily
    /// reset also zeroes `current_leads`
    pub clear_current_leads_on_daily_reset: bool,

    /// Second and later resets on the same calendar day are no-ops
    pub once_per_day: bool,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            clear_current_leads_on_daily_reset: true,
            once_per_day: true,
        }
    }
}

/// Expiry of assignments whose completion is never reported
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseConfig {
    /// 0 disables expiry
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            sweep_interval_secs: 300,
        }
    }
}

impl LeaseConfig {
    pub fn ttl(&self) -> Option<chrono::Duration> {
        if self.ttl_secs == 0 {
            return None;
        }
        i64::try_from(self.ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// SQLite storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://leadroute.db?mode=rwc".to_string(),
            max_connections: 5,
            busy_timeout_secs: 5,
        }
    }
}

impl LeadEngineConfig {
    /// Parse a TOML document; missing sections take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file and apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            LeadEngineError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&source)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.database.url = url;
            }
        }
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<()> {
        let weights = self.scoring.weights();
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(LeadEngineError::configuration(format!(
                    "scoring.{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        if weights.iter().map(|(_, w)| w).sum::<f64>() <= 0.0 {
            return Err(LeadEngineError::configuration(
                "at least one scoring weight must be positive",
            ));
        }

        for (name, value) in [
            ("specialty_match_score", self.scoring.specialty_match_score),
            ("specialty_mismatch_score", self.scoring.specialty_mismatch_score),
            ("unrestricted_specialty_score", self.scoring.unrestricted_specialty_score),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(LeadEngineError::configuration(format!(
                    "scoring.{} must be within 0-100, got {}",
                    name, value
                )));
            }
        }

        if self.scoring.closed_deals_cap == 0 {
            return Err(LeadEngineError::configuration(
                "scoring.closed_deals_cap must be at least 1",
            ));
        }

        self.assignment.business_offset()?;

        if self.database.url.trim().is_empty() {
            return Err(LeadEngineError::configuration("database.url must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(LeadEngineError::configuration(
                "database.max_connections must be at least 1",
            ));
        }
        Ok(())
    }
}
