//! # Agent/Lead Match Scoring
//!
//! Pure, deterministic scoring of one agent against one lead. The score is a
//! weighted sum of five sub-scores, each in `[0, 100]`:
//!
//! | component   | default weight | sub-score |
//! |-------------|---------------:|-----------|
//! | workload    | 30 | `100 × (1 − current/max)`, 50 when `max == 0` |
//! | amount      | 25 | 100 inside the range, linear decay outside |
//! | performance | 20 | `0.7 × conversion + 0.3 × min(deals, cap)/cap × 100` |
//! | specialty   | 15 | match / mismatch / unrestricted constants |
//! | priority    | 10 | `100 × priority / 10` |
//!
//! When the lead has no amount (or no purpose) that component is left out and
//! the remaining weights are rescaled so they still sum to 100.

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AmountRange, Performance, Specialties, Workload, MAX_PRIORITY};
use crate::config::ScoringConfig;
use crate::error::{LeadEngineError, Result};
use crate::lead::Lead;

/// Per-component view of a score, for auditing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub workload: f64,
    /// `None` when the lead carried no amount
    pub amount: Option<f64>,
    pub performance: f64,
    /// `None` when the lead carried no purpose
    pub specialty: Option<f64>,
    pub priority: f64,
    pub total: f64,
}

/// Scores agents against leads with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Total match score in `[0, 100]`
    pub fn score(&self, agent: &Agent, lead: &Lead) -> Result<f64> {
        self.breakdown(agent, lead).map(|b| b.total)
    }

    /// Score with every sub-score exposed
    ///
    /// Fails with [`LeadEngineError::MalformedAgent`] when the agent record
    /// carries values no score can be derived from.
    pub fn breakdown(&self, agent: &Agent, lead: &Lead) -> Result<ScoreBreakdown> {
        check_scorable(agent)?;

        let cfg = &self.config;
        let workload = workload_score(&agent.workload);
        let amount = lead
            .amount
            .map(|amount| amount_score(&agent.specialties.amount_range, amount));
        let performance = performance_score(&agent.performance, cfg.closed_deals_cap);
        let specialty = lead
            .purpose
            .as_deref()
            .map(|purpose| self.specialty_score(&agent.specialties, purpose));
        let priority = priority_score(agent.priority);

        let mut weighted = workload * cfg.workload_weight
            + performance * cfg.performance_weight
            + priority * cfg.priority_weight;
        let mut weight_sum = cfg.workload_weight + cfg.performance_weight + cfg.priority_weight;

        if let Some(amount) = amount {
            weighted += amount * cfg.amount_weight;
            weight_sum += cfg.amount_weight;
        }
        if let Some(specialty) = specialty {
            weighted += specialty * cfg.specialty_weight;
            weight_sum += cfg.specialty_weight;
        }

        let total = if weight_sum > 0.0 {
            (weighted / weight_sum).clamp(0.0, 100.0)
        } else {
            0.0
        };

        Ok(ScoreBreakdown {
            workload,
            amount,
            performance,
            specialty,
            priority,
            total,
        })
    }

    /// 100 for a listed purpose, the mismatch score otherwise, and the
    /// unrestricted score for agents who list no purposes
    pub fn specialty_score(&self, specialties: &Specialties, purpose: &str) -> f64 {
        if specialties.loan_purposes.is_empty() {
            return self.config.unrestricted_specialty_score;
        }
        if specialties
            .loan_purposes
            .iter()
            .any(|p| p.eq_ignore_ascii_case(purpose))
        {
            self.config.specialty_match_score
        } else {
            self.config.specialty_mismatch_score
        }
    }
}

/// Score with the default weights
pub fn score(agent: &Agent, lead: &Lead) -> Result<f64> {
    Scorer::default().score(agent, lead)
}

fn check_scorable(agent: &Agent) -> Result<()> {
    let malformed = |reason: String| LeadEngineError::malformed_agent(agent.id.as_str(), reason);

    if agent.priority > MAX_PRIORITY {
        return Err(malformed(format!("priority {} exceeds {}", agent.priority, MAX_PRIORITY)));
    }
    let range = agent.specialties.amount_range;
    if !range.min.is_finite() || !range.max.is_finite() || range.min < 0.0 || range.min > range.max {
        return Err(malformed(format!(
            "invalid loan amount range [{}, {}]",
            range.min, range.max
        )));
    }
    let rate = agent.performance.conversion_rate;
    if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
        return Err(malformed(format!("conversion rate {} outside 0-100", rate)));
    }
    Ok(())
}

/// Lower relative load scores higher; at or over capacity scores 0
pub fn workload_score(workload: &Workload) -> f64 {
    if workload.max_leads == 0 {
        return 50.0;
    }
    let load = workload.current_leads as f64 / workload.max_leads as f64;
    (100.0 * (1.0 - load)).clamp(0.0, 100.0)
}

/// 100 inside `[min, max]`; below the range decays to 0 as the shortfall
/// approaches `min`, above it decays at half that rate relative to `max`
pub fn amount_score(range: &AmountRange, amount: f64) -> f64 {
    if range.contains(amount) {
        return 100.0;
    }
    if amount < range.min {
        // range.min > amount >= 0, so min is positive here
        let shortfall = range.min - amount;
        return (100.0 * (1.0 - shortfall / range.min)).max(0.0);
    }
    if range.max <= 0.0 {
        return 0.0;
    }
    let excess = amount - range.max;
    (100.0 * (1.0 - excess / (2.0 * range.max))).max(0.0)
}

/// Conversion rate dominates; deal count contributes up to `deals_cap`
pub fn performance_score(performance: &Performance, deals_cap: u32) -> f64 {
    let deals = if deals_cap == 0 {
        0.0
    } else {
        performance.closed_deals.min(deals_cap) as f64 / deals_cap as f64 * 100.0
    };
    (0.7 * performance.conversion_rate + 0.3 * deals).clamp(0.0, 100.0)
}

pub fn priority_score(priority: u8) -> f64 {
    100.0 * priority.min(MAX_PRIORITY) as f64 / MAX_PRIORITY as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Specialties;

    fn agent(id: &str) -> Agent {
        Agent::new(id, id, format!("+60{}", id.len()))
            .with_capacity(10)
            .with_priority(10)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_workload_score() {
        let mut w = Workload::with_capacity(4);
        assert_eq!(workload_score(&w), 100.0);
        w.current_leads = 1;
        assert!(close(workload_score(&w), 75.0));
        w.current_leads = 4;
        assert_eq!(workload_score(&w), 0.0);
        w.current_leads = 6;
        assert_eq!(workload_score(&w), 0.0);
        assert_eq!(workload_score(&Workload::with_capacity(0)), 50.0);
    }

    #[test]
    fn test_amount_score_decay() {
        let range = AmountRange::new(10_000.0, 50_000.0);
        assert_eq!(amount_score(&range, 10_000.0), 100.0);
        assert_eq!(amount_score(&range, 50_000.0), 100.0);
        // Below: 5000 short of 10000 -> 50
        assert!(close(amount_score(&range, 5_000.0), 50.0));
        assert_eq!(amount_score(&range, 0.0), 0.0);
        // Above: 25000 over 50000 -> 1 - 25000/100000 -> 75
        assert!(close(amount_score(&range, 75_000.0), 75.0));
        assert_eq!(amount_score(&range, 200_000.0), 0.0);
        // Above a zero-width range at zero
        assert_eq!(amount_score(&AmountRange::new(0.0, 0.0), 10.0), 0.0);
        assert_eq!(amount_score(&AmountRange::new(0.0, 0.0), 0.0), 100.0);
    }

    #[test]
    fn test_exceeding_is_penalized_less_than_falling_short() {
        let range = AmountRange::new(10_000.0, 10_000.0);
        assert!(amount_score(&range, 12_000.0) > amount_score(&range, 8_000.0));
    }

    #[test]
    fn test_performance_score_caps_deals() {
        let mut p = Performance::default();
        p.conversion_rate = 50.0;
        p.closed_deals = 40;
        assert!(close(performance_score(&p, 100), 35.0 + 12.0));
        p.closed_deals = 100;
        let at_cap = performance_score(&p, 100);
        p.closed_deals = 500;
        assert_eq!(performance_score(&p, 100), at_cap);
        p.conversion_rate = 100.0;
        assert_eq!(performance_score(&p, 100), 100.0);
    }

    #[test]
    fn test_specialty_score_variants() {
        let scorer = Scorer::default();
        let listed = Specialties::default().with_purposes(["personal", "business"]);
        assert_eq!(scorer.specialty_score(&listed, "business"), 100.0);
        assert_eq!(scorer.specialty_score(&listed, "Business"), 100.0);
        assert_eq!(scorer.specialty_score(&listed, "auto"), 30.0);
        assert_eq!(scorer.specialty_score(&Specialties::default(), "auto"), 50.0);
    }

    #[test]
    fn test_full_lead_uses_fixed_weights() {
        let a = agent("a")
            .with_performance(40.0, 20)
            .with_specialties(
                Specialties::default()
                    .with_amount_range(1_000.0, 20_000.0)
                    .with_purposes(["personal"]),
            );
        let lead = Lead::new().with_amount(5_000.0).with_purpose("personal");
        let b = Scorer::default().breakdown(&a, &lead).unwrap();

        assert_eq!(b.workload, 100.0);
        assert_eq!(b.amount, Some(100.0));
        assert!(close(b.performance, 28.0 + 6.0));
        assert_eq!(b.specialty, Some(100.0));
        assert_eq!(b.priority, 100.0);
        let expected = 100.0 * 0.30 + 100.0 * 0.25 + 34.0 * 0.20 + 100.0 * 0.15 + 100.0 * 0.10;
        assert!(close(b.total, expected));
    }

    #[test]
    fn test_missing_fields_redistribute_weight() {
        let a = agent("a").with_performance(0.0, 0).with_priority(0);
        // Only workload (100) counts among nonzero sub-scores: 100*30/(30+20+10)
        let b = Scorer::default().breakdown(&a, &Lead::new()).unwrap();
        assert_eq!(b.amount, None);
        assert_eq!(b.specialty, None);
        assert!(close(b.total, 100.0 * 30.0 / 60.0));

        // A perfect agent scores 100 whether or not the lead is complete
        let perfect = agent("p").with_performance(100.0, 100);
        let bare = Scorer::default().score(&perfect, &Lead::new()).unwrap();
        let full = Scorer::default()
            .score(
                &perfect.clone().with_specialties(Specialties::default().with_purposes(["auto"])),
                &Lead::new().with_amount(50.0).with_purpose("auto"),
            )
            .unwrap();
        assert!(close(bare, 100.0));
        assert!(close(full, 100.0));
    }

    #[test]
    fn test_malformed_agent_is_an_error() {
        let lead = Lead::new().with_amount(1000.0);
        let mut bad = agent("bad");
        bad.priority = 11;
        assert!(matches!(
            score(&bad, &lead),
            Err(LeadEngineError::MalformedAgent { .. })
        ));

        let mut bad = agent("bad");
        bad.specialties.amount_range = AmountRange::new(100.0, 10.0);
        assert!(score(&bad, &lead).is_err());

        let bad = agent("bad").with_performance(f64::NAN, 0);
        assert!(score(&bad, &lead).is_err());
    }

    #[test]
    fn test_lower_range_agent_wins_small_amount() {
        let big = agent("big").with_specialties(Specialties::default().with_amount_range(10_000.0, 50_000.0));
        let small = agent("small").with_specialties(Specialties::default().with_amount_range(0.0, 9_999.0));
        let lead = Lead::new().with_amount(5_000.0);
        let scorer = Scorer::default();

        let big_b = scorer.breakdown(&big, &lead).unwrap();
        let small_b = scorer.breakdown(&small, &lead).unwrap();
        assert_eq!(small_b.amount, Some(100.0));
        assert!(big_b.amount.unwrap() < 100.0);
        assert!(small_b.total > big_b.total);
    }
}
