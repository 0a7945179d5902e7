//! Candidate ordering
//!
//! Both orders are total: ties always fall back to the agent id, so the same
//! snapshot always yields the same claim sequence.

use std::cmp::Ordering;

use crate::agent::Agent;

/// A candidate with the score it was ranked by
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub agent: Agent,
    pub score: Option<f64>,
}

/// Highest score first, ties broken by ascending agent id
pub fn rank_by_score(scored: Vec<(Agent, f64)>) -> Vec<RankedCandidate> {
    let mut scored = scored;
    scored.sort_by(|(a, a_score), (b, b_score)| {
        b_score
            .partial_cmp(a_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    scored
        .into_iter()
        .map(|(agent, score)| RankedCandidate {
            agent,
            score: Some(score),
        })
        .collect()
}

/// Fewest leads assigned today first, ties broken by ascending agent id
pub fn rank_round_robin(agents: Vec<Agent>) -> Vec<RankedCandidate> {
    let mut agents = agents;
    agents.sort_by(|a, b| {
        a.workload
            .assigned_today
            .cmp(&b.workload.assigned_today)
            .then_with(|| a.id.cmp(&b.id))
    });
    agents
        .into_iter()
        .map(|agent| RankedCandidate { agent, score: None })
        .collect()
}
