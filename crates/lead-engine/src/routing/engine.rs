//! Assignment engine
//!
//! Stateless per request: every call reads a fresh snapshot of the roster,
//! ranks candidates without holding any lock, and only then claims capacity
//! through the workload ledger. A lost claim is not an error; the engine
//! moves on to the next-ranked candidate, so one request makes at most one
//! claim attempt per candidate and always terminates.
//!
//! The engine keeps no lease state of its own. Leases are claimed, retired
//! and expired through the store, so several engines (or one-shot CLI
//! invocations) over the same database share them.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::outcome::{Assignment, AssignmentOutcome, NoAgentReason};
use super::ranking::{rank_by_score, rank_round_robin, RankedCandidate};
use super::scoring::Scorer;
use crate::agent::{Agent, AgentId};
use crate::audit::{AssignmentLog, AssignmentRecord};
use crate::config::{AssignmentStrategy, LeadEngineConfig};
use crate::directory::AgentDirectory;
use crate::error::{LeadEngineError, Result};
use crate::lead::Lead;
use crate::lease::{Lease, LeaseLedger};
use crate::ledger::{CompletionOutcome, ResetOutcome, WorkloadLedger};
use crate::monitoring::{AssignmentMetrics, MetricsSnapshot};
use crate::report::DistributionReport;
use crate::store::AgentStore;

/// Routes leads to agents
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use leadroute_engine::prelude::*;
///
/// # async fn example() -> leadroute_engine::Result<()> {
/// let store = Arc::new(MemoryAgentStore::new());
/// store.upsert_agent(&Agent::new("agent-001", "Aina", "+60111111111")).await?;
///
/// let engine = AssignmentEngine::new(store, LeadEngineConfig::default())?;
/// let lead = Lead::new().with_amount(5000.0).with_purpose("personal");
///
/// match engine.assign_best_agent(&lead).await? {
///     AssignmentOutcome::Assigned(assignment) => {
///         println!("{} takes the lead", assignment.agent_id);
///         engine.complete(assignment.lease_id, true).await?;
///     }
///     AssignmentOutcome::NoAgentAvailable(reason) => println!("queue it: {}", reason),
/// }
/// # Ok(())
/// # }
/// ```
pub struct AssignmentEngine {
    store: Arc<dyn AgentStore>,
    config: LeadEngineConfig,
    scorer: Scorer,
    metrics: AssignmentMetrics,
}

impl AssignmentEngine {
    pub fn new(store: Arc<dyn AgentStore>, config: LeadEngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            scorer: Scorer::new(config.scoring.clone()),
            config,
            metrics: AssignmentMetrics::new(),
        })
    }

    pub fn store(&self) -> &Arc<dyn AgentStore> {
        &self.store
    }

    pub fn config(&self) -> &LeadEngineConfig {
        &self.config
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Leases not yet completed or expired, oldest first
    pub async fn open_leases(&self) -> Result<Vec<Lease>> {
        self.store.open_leases().await
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Assign with the configured default strategy
    pub async fn assign(&self, lead: &Lead) -> Result<AssignmentOutcome> {
        match self.config.assignment.default_strategy {
            AssignmentStrategy::Weighted => self.assign_best_agent(lead).await,
            AssignmentStrategy::RoundRobin => {
                lead.validate()?;
                self.round_robin_at(Some(lead), Utc::now()).await
            }
        }
    }

    pub async fn assign_best_agent(&self, lead: &Lead) -> Result<AssignmentOutcome> {
        self.assign_best_agent_at(lead, Utc::now()).await
    }

    /// Weighted assignment as of `now`
    ///
    /// `now` drives the working-hours filter and stamps the assignment and
    /// its lease.
    pub async fn assign_best_agent_at(
        &self,
        lead: &Lead,
        now: DateTime<Utc>,
    ) -> Result<AssignmentOutcome> {
        lead.validate()?;

        let active = self.store.list_active_agents().await?;
        if active.is_empty() {
            return self
                .finish(NoAgentReason::NoActiveAgents.into(), AssignmentStrategy::Weighted, Some(lead), now)
                .await;
        }

        let eligible = self.eligible(active, Some(lead), now)?;
        if eligible.is_empty() {
            return self
                .finish(NoAgentReason::NoEligibleAgents.into(), AssignmentStrategy::Weighted, Some(lead), now)
                .await;
        }

        let accepting: Vec<Agent> = eligible
            .into_iter()
            .filter(|agent| agent.workload.has_capacity())
            .collect();
        if accepting.is_empty() {
            return self
                .finish(NoAgentReason::AllAtCapacity.into(), AssignmentStrategy::Weighted, Some(lead), now)
                .await;
        }

        let mut scored = Vec::with_capacity(accepting.len());
        for agent in &accepting {
            match self.scorer.score(agent, lead) {
                Ok(score) => scored.push((agent.clone(), score)),
                Err(e) => {
                    self.metrics.record_scoring_exclusion();
                    warn!(agent_id = %agent.id, error = %e, "Excluding agent that cannot be scored");
                }
            }
        }

        if scored.is_empty() {
            if self.config.assignment.fallback_to_round_robin {
                self.metrics.record_fallback();
                info!("🔄 No agent could be scored; falling back to round-robin");
                let ranked = rank_round_robin(accepting);
                return self
                    .claim_first(ranked, AssignmentStrategy::RoundRobin, Some(lead), now)
                    .await;
            }
            return self
                .finish(NoAgentReason::NoEligibleAgents.into(), AssignmentStrategy::Weighted, Some(lead), now)
                .await;
        }

        let ranked = rank_by_score(scored);
        debug!(
            candidates = ranked.len(),
            top_agent = %ranked[0].agent.id,
            top_score = ranked[0].score.unwrap_or_default(),
            "Candidates ranked"
        );
        self.claim_first(ranked, AssignmentStrategy::Weighted, Some(lead), now)
            .await
    }

    /// Least-assigned-today active agent with spare capacity
    pub async fn assign_round_robin(&self) -> Result<AssignmentOutcome> {
        self.round_robin_at(None, Utc::now()).await
    }

    pub async fn assign_round_robin_at(&self, now: DateTime<Utc>) -> Result<AssignmentOutcome> {
        self.round_robin_at(None, now).await
    }

    async fn round_robin_at(
        &self,
        lead: Option<&Lead>,
        now: DateTime<Utc>,
    ) -> Result<AssignmentOutcome> {
        let strategy = AssignmentStrategy::RoundRobin;
        let active = self.store.list_active_agents().await?;
        if active.is_empty() {
            return self.finish(NoAgentReason::NoActiveAgents.into(), strategy, lead, now).await;
        }

        let eligible = self.eligible(active, lead, now)?;
        if eligible.is_empty() {
            return self.finish(NoAgentReason::NoEligibleAgents.into(), strategy, lead, now).await;
        }

        let accepting: Vec<Agent> = eligible
            .into_iter()
            .filter(|agent| agent.workload.has_capacity())
            .collect();
        if accepting.is_empty() {
            return self.finish(NoAgentReason::AllAtCapacity.into(), strategy, lead, now).await;
        }

        self.claim_first(rank_round_robin(accepting), strategy, lead, now)
            .await
    }

    /// Apply the optional working-hours and region/language filters
    fn eligible(
        &self,
        agents: Vec<Agent>,
        lead: Option<&Lead>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Agent>> {
        let rules = &self.config.assignment;
        let local = now.with_timezone(&rules.business_offset()?).naive_local();
        let region = lead.and_then(|l| l.region.as_deref());
        let language = lead.and_then(|l| l.language.as_deref());

        let mut eligible = Vec::with_capacity(agents.len());
        for agent in agents {
            if rules.enforce_working_hours {
                match agent.working_hours.is_within(local) {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!(agent_id = %agent.id, "Outside working hours");
                        continue;
                    }
                    Err(reason) => {
                        self.metrics.record_scoring_exclusion();
                        warn!(agent_id = %agent.id, %reason, "Excluding agent with unreadable working hours");
                        continue;
                    }
                }
            }
            if rules.require_region_match {
                if let Some(region) = region {
                    if !agent.specialties.serves_region(region) {
                        continue;
                    }
                }
            }
            if rules.require_language_match {
                if let Some(language) = language {
                    if !agent.specialties.speaks(language) {
                        continue;
                    }
                }
            }
            eligible.push(agent);
        }
        Ok(eligible)
    }

    /// Walk `ranked` and keep the first successful claim
    async fn claim_first(
        &self,
        ranked: Vec<RankedCandidate>,
        strategy: AssignmentStrategy,
        lead: Option<&Lead>,
        now: DateTime<Utc>,
    ) -> Result<AssignmentOutcome> {
        let mut attempts = 0u32;
        for candidate in ranked {
            attempts += 1;
            let agent = candidate.agent;
            let lease = Lease::new(agent.id.clone(), now);
            if !self.store.claim_with_lease(&lease).await? {
                self.metrics.record_lost_claim();
                debug!(agent_id = %agent.id, attempt = attempts, "Claim lost; trying next candidate");
                continue;
            }

            match strategy {
                AssignmentStrategy::Weighted => self.metrics.record_weighted(),
                AssignmentStrategy::RoundRobin => self.metrics.record_round_robin(),
            }
            info!(
                agent_id = %agent.id,
                score = candidate.score,
                %strategy,
                attempts,
                "✅ Lead assigned to {}",
                agent.name
            );

            let assignment = Assignment {
                lease_id: lease.id,
                agent_id: agent.id,
                agent_name: agent.name,
                contact: agent.contact,
                score: candidate.score,
                strategy,
                assigned_at: now,
            };
            return self
                .finish(AssignmentOutcome::Assigned(assignment), strategy, lead, now)
                .await;
        }

        warn!(attempts, %strategy, "⚠️ Every candidate lost its claim race");
        self.finish(
            NoAgentReason::ClaimRaceExhausted { attempts }.into(),
            strategy,
            lead,
            now,
        )
        .await
    }

    /// Record the outcome in metrics and the audit log
    async fn finish(
        &self,
        outcome: AssignmentOutcome,
        strategy: AssignmentStrategy,
        lead: Option<&Lead>,
        now: DateTime<Utc>,
    ) -> Result<AssignmentOutcome> {
        if let AssignmentOutcome::NoAgentAvailable(reason) = &outcome {
            self.metrics.record_no_agent(reason);
            info!(%reason, %strategy, "No agent available for lead");
        }

        let record = AssignmentRecord::from_outcome(&outcome, strategy, lead, now);
        if let Err(e) = self.store.record_assignment(&record).await {
            // The claim is already committed; losing the audit line is not fatal
            warn!(error = %e, record_id = %record.id, "Failed to write assignment record");
        }
        Ok(outcome)
    }

    /// Report the end of a lead by its lease; releases capacity exactly once
    ///
    /// A failed release leaves the lease open, so the call can be retried.
    pub async fn complete(&self, lease_id: Uuid, success: bool) -> Result<CompletionOutcome> {
        let released = self
            .store
            .release_lease(&lease_id, success)
            .await?
            .ok_or_else(|| LeadEngineError::LeaseNotFound(lease_id.to_string()))?;

        let outcome = released.completion;
        self.metrics.record_completion(success, outcome.floored);
        info!(
            agent_id = %released.lease.agent_id,
            %lease_id,
            success,
            current_leads = outcome.current_leads,
            "Lead completed"
        );
        Ok(outcome)
    }

    /// Report the end of one of `agent_id`'s leads without a lease handle
    ///
    /// Retires that agent's oldest open lease, if any, in the same step, so
    /// the expiry sweep cannot release the same slot a second time.
    pub async fn complete_lead(
        &self,
        agent_id: &AgentId,
        success: bool,
    ) -> Result<CompletionOutcome> {
        let (retired, outcome) = self.store.release_oldest_for(agent_id, success).await?;
        self.metrics.record_completion(success, outcome.floored);
        info!(
            agent_id = %agent_id,
            lease_id = ?retired.map(|l| l.id),
            success,
            current_leads = outcome.current_leads,
            "Lead completed"
        );
        Ok(outcome)
    }

    /// Daily counter reset with the configured policy
    ///
    /// A reset that clears `current_leads` retires every open lease with it.
    pub async fn reset_daily(&self, today: NaiveDate) -> Result<ResetOutcome> {
        let outcome = self.store.reset_daily(today, self.config.reset).await?;
        match outcome {
            ResetOutcome::Applied {
                agents,
                cleared_current_leads,
            } => {
                info!(%today, agents, cleared_current_leads, "🌅 Daily reset applied");
            }
            ResetOutcome::AlreadyApplied { period } => {
                info!(%period, "Daily reset already applied; skipping");
            }
        }
        Ok(outcome)
    }

    pub async fn reset_monthly(&self, today: NaiveDate) -> Result<ResetOutcome> {
        let outcome = self.store.reset_monthly(today).await?;
        match outcome {
            ResetOutcome::Applied { agents, .. } => info!(%today, agents, "Monthly reset applied"),
            ResetOutcome::AlreadyApplied { period } => {
                info!(%period, "Monthly reset already applied; skipping")
            }
        }
        Ok(outcome)
    }

    /// Release every lease older than the configured TTL as an unsuccessful
    /// completion; returns how many slots were released
    ///
    /// A lease whose release fails stays open for the next sweep; the sweep
    /// carries on with the remaining leases.
    pub async fn expire_stale_leases(&self, now: DateTime<Utc>) -> Result<usize> {
        let Some(ttl) = self.config.leases.ttl() else {
            return Ok(0);
        };

        let mut released = 0usize;
        let mut failed = 0usize;
        for lease in self.store.leases_issued_before(now - ttl).await? {
            match self.store.release_lease(&lease.id, false).await {
                Ok(Some(retired)) => {
                    warn!(
                        lease_id = %lease.id,
                        agent_id = %lease.agent_id,
                        issued_at = %lease.issued_at,
                        "⏰ Lease expired without completion; capacity released"
                    );
                    self.metrics.record_completion(false, retired.completion.floored);
                    released += 1;
                }
                Ok(None) => {
                    debug!(lease_id = %lease.id, "Lease completed before it could expire");
                }
                Err(e) => {
                    failed += 1;
                    error!(lease_id = %lease.id, error = %e, "Failed to release expired lease");
                }
            }
        }
        if failed > 0 {
            warn!(failed, released, "Some expired leases stay open until the next sweep");
        }
        self.metrics.record_expired_leases(released as u64);
        Ok(released)
    }

    /// Current distribution of work across the whole roster
    pub async fn distribution_report(&self) -> Result<DistributionReport> {
        let agents = self.store.list_agents().await?;
        Ok(DistributionReport::build(&agents))
    }

    /// Newest audit records first
    pub async fn recent_assignments(&self, limit: usize) -> Result<Vec<AssignmentRecord>> {
        self.store.recent_assignments(limit).await
    }
}

impl From<NoAgentReason> for AssignmentOutcome {
    fn from(reason: NoAgentReason) -> Self {
        AssignmentOutcome::NoAgentAvailable(reason)
    }
}
