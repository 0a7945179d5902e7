//! Assignment metrics
//!
//! Lock-free counters updated on the assignment hot path.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::routing::NoAgentReason;

#[derive(Debug, Default)]
pub struct AssignmentMetrics {
    weighted_assignments: AtomicU64,
    round_robin_assignments: AtomicU64,
    round_robin_fallbacks: AtomicU64,
    no_active_agents: AtomicU64,
    no_eligible_agents: AtomicU64,
    all_at_capacity: AtomicU64,
    claim_races_exhausted: AtomicU64,
    lost_claim_races: AtomicU64,
    scoring_exclusions: AtomicU64,
    completions: AtomicU64,
    successful_completions: AtomicU64,
    double_completions: AtomicU64,
    expired_leases: AtomicU64,
}

impl AssignmentMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_weighted(&self) {
        self.weighted_assignments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_round_robin(&self) {
        self.round_robin_assignments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.round_robin_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_agent(&self, reason: &NoAgentReason) {
        let counter = match reason {
            NoAgentReason::NoActiveAgents => &self.no_active_agents,
            NoAgentReason::NoEligibleAgents => &self.no_eligible_agents,
            NoAgentReason::AllAtCapacity => &self.all_at_capacity,
            NoAgentReason::ClaimRaceExhausted { .. } => &self.claim_races_exhausted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lost_claim(&self) {
        self.lost_claim_races.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scoring_exclusion(&self) {
        self.scoring_exclusions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completion(&self, success: bool, floored: bool) {
        self.completions.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_completions.fetch_add(1, Ordering::Relaxed);
        }
        if floored {
            self.double_completions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_expired_leases(&self, count: u64) {
        self.expired_leases.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        MetricsSnapshot {
            weighted_assignments: load(&self.weighted_assignments),
            round_robin_assignments: load(&self.round_robin_assignments),
            round_robin_fallbacks: load(&self.round_robin_fallbacks),
            no_active_agents: load(&self.no_active_agents),
            no_eligible_agents: load(&self.no_eligible_agents),
            all_at_capacity: load(&self.all_at_capacity),
            claim_races_exhausted: load(&self.claim_races_exhausted),
            lost_claim_races: load(&self.lost_claim_races),
            scoring_exclusions: load(&self.scoring_exclusions),
            completions: load(&self.completions),
            successful_completions: load(&self.successful_completions),
            double_completions: load(&self.double_completions),
            expired_leases: load(&self.expired_leases),
        }
    }
}

/// Point-in-time copy of [`AssignmentMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub weighted_assignments: u64,
    pub round_robin_assignments: u64,
    pub round_robin_fallbacks: u64,
    pub no_active_agents: u64,
    pub no_eligible_agents: u64,
    pub all_at_capacity: u64,
    pub claim_races_exhausted: u64,
    pub lost_claim_races: u64,
    pub scoring_exclusions: u64,
    pub completions: u64,
    pub successful_completions: u64,
    pub double_completions: u64,
    pub expired_leases: u64,
}

impl MetricsSnapshot {
    pub fn total_assignments(&self) -> u64 {
        self.weighted_assignments + self.round_robin_assignments
    }

    pub fn total_no_agent(&self) -> u64 {
        self.no_active_agents
            + self.no_eligible_agents
            + self.all_at_capacity
            + self.claim_races_exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = AssignmentMetrics::new();
        metrics.record_weighted();
        metrics.record_round_robin();
        metrics.record_no_agent(&NoAgentReason::AllAtCapacity);
        metrics.record_no_agent(&NoAgentReason::ClaimRaceExhausted { attempts: 2 });
        metrics.record_completion(true, false);
        metrics.record_completion(false, true);
        metrics.record_expired_leases(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_assignments(), 2);
        assert_eq!(snapshot.total_no_agent(), 2);
        assert_eq!(snapshot.completions, 2);
        assert_eq!(snapshot.successful_completions, 1);
        assert_eq!(snapshot.double_completions, 1);
        assert_eq!(snapshot.expired_leases, 3);
    }
}
