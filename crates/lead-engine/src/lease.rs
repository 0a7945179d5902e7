//! Assignment leases
//!
//! Every committed claim is paired with a lease so the capacity it holds can
//! be released exactly once: by the caller reporting completion, or by the
//! expiry sweep when nobody ever does.
//!
//! Leases are stored next to the counters they guard. Claiming a slot and
//! recording its lease is one step, and so is retiring a lease and releasing
//! its slot; a release that fails leaves the lease open for a later retry.
//! Any engine sharing the store can complete or expire any lease.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentId;
use crate::error::Result;
use crate::ledger::CompletionOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub id: Uuid,
    pub agent_id: AgentId,
    pub issued_at: DateTime<Utc>,
}

impl Lease {
    pub fn new(agent_id: AgentId, issued_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            issued_at,
        }
    }
}

/// A lease retired together with the slot it held
#[derive(Debug, Clone, PartialEq)]
pub struct Released {
    pub lease: Lease,
    pub completion: CompletionOutcome,
}

#[async_trait]
pub trait LeaseLedger: Send + Sync {
    /// Reserve one slot on `lease.agent_id` and record `lease` as one step
    ///
    /// Same capacity rule as [`crate::ledger::WorkloadLedger::try_claim`];
    /// on `Ok(false)` nothing is recorded.
    async fn claim_with_lease(&self, lease: &Lease) -> Result<bool>;

    /// Retire an open lease and release its slot
    ///
    /// `Ok(None)` when the lease was already retired or never existed. On
    /// error the lease stays open.
    async fn release_lease(&self, lease_id: &Uuid, success: bool) -> Result<Option<Released>>;

    /// Release one slot of `agent_id`, retiring its oldest open lease if it
    /// has one
    async fn release_oldest_for(
        &self,
        agent_id: &AgentId,
        success: bool,
    ) -> Result<(Option<Lease>, CompletionOutcome)>;

    /// Open leases issued at or before `cutoff`, oldest first
    async fn leases_issued_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Lease>>;

    /// Every open lease, oldest first
    async fn open_leases(&self) -> Result<Vec<Lease>>;
}

/// Oldest first, ties broken by id
pub(crate) fn sort_leases(leases: &mut [Lease]) {
    leases.sort_by(|a, b| (a.issued_at, a.id).cmp(&(b.issued_at, b.id)));
}
