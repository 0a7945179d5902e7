//! Capacity invariant under concurrent assignment
//!
//! N requests race over a pool whose total capacity M is smaller than N.
//! Exactly M must win, and no agent may ever be over-booked.

mod common;

use common::{agent, assert_capacity_invariant, memory_engine, sqlite_engine, sqlite_store};
use futures::future::join_all;
use leadroute_engine::prelude::*;
use serial_test::serial;
use std::collections::HashMap;
use std::sync::Arc;

const REQUESTS: usize = 40;

fn pool() -> Vec<Agent> {
    vec![agent("agent-a", 2), agent("agent-b", 3), agent("agent-c", 5)]
}

async fn race(engine: Arc<AssignmentEngine>, requests: usize) -> Vec<AssignmentOutcome> {
    let tasks = (0..requests).map(|i| {
        let engine = engine.clone();
        tokio::spawn(async move {
            let lead = Lead::new()
                .with_amount(1000.0 * (i as f64 + 1.0))
                .with_purpose("personal");
            engine.assign_best_agent(&lead).await
        })
    });
    join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked").expect("assignment failed"))
        .collect()
}

fn tally(outcomes: &[AssignmentOutcome]) -> HashMap<String, u32> {
    let mut per_agent = HashMap::new();
    for outcome in outcomes {
        if let Some(id) = outcome.agent_id() {
            *per_agent.entry(id.as_str().to_string()).or_insert(0) += 1;
        }
    }
    per_agent
}

async fn check_race_result(engine: &AssignmentEngine, outcomes: &[AssignmentOutcome]) {
    let assigned = outcomes.iter().filter(|o| o.is_assigned()).count();
    assert_eq!(assigned, 10, "exactly the pool capacity must be assigned");
    assert_eq!(outcomes.len() - assigned, REQUESTS - 10);

    let per_agent = tally(outcomes);
    assert_eq!(per_agent.get("agent-a"), Some(&2));
    assert_eq!(per_agent.get("agent-b"), Some(&3));
    assert_eq!(per_agent.get("agent-c"), Some(&5));

    assert_capacity_invariant(engine).await;
    for agent in engine.store().list_agents().await.unwrap() {
        assert_eq!(agent.workload.current_leads, agent.workload.max_leads);
        assert_eq!(agent.workload.assigned_today, agent.workload.max_leads);
    }
    assert_eq!(engine.open_leases().await.unwrap().len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_memory_store_never_overbooks() {
    let engine = memory_engine(pool());
    let outcomes = race(engine.clone(), REQUESTS).await;
    check_race_result(&engine, &outcomes).await;

    let metrics = engine.metrics();
    assert_eq!(metrics.weighted_assignments, 10);
    assert_eq!(metrics.total_no_agent(), (REQUESTS - 10) as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[serial]
async fn test_sqlite_store_never_overbooks() {
    let (engine, _dir) = sqlite_engine(pool()).await;
    let outcomes = race(engine.clone(), REQUESTS).await;
    check_race_result(&engine, &outcomes).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_last_slot_is_claimed_once_in_memory() {
    let store = Arc::new(MemoryAgentStore::with_agents([agent("solo", 1)]).unwrap());
    let id = AgentId::from("solo");

    let tasks = (0..64).map(|_| {
        let store = store.clone();
        let id = id.clone();
        tokio::spawn(async move { store.try_claim(&id).await })
    });
    let wins = join_all(tasks)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(true))))
        .count();

    assert_eq!(wins, 1);
    let agent = store.get_agent(&id).await.unwrap().unwrap();
    assert_eq!(agent.workload.current_leads, 1);
    assert_eq!(agent.workload.assigned_total, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[serial]
async fn test_last_slot_is_claimed_once_in_sqlite() {
    let (store, _dir, _) = sqlite_store().await;
    store.upsert_agent(&agent("solo", 1)).await.unwrap();
    let store = Arc::new(store);
    let id = AgentId::from("solo");

    let tasks = (0..32).map(|_| {
        let store = store.clone();
        let id = id.clone();
        tokio::spawn(async move { store.try_claim(&id).await })
    });
    let results: Vec<bool> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked").expect("claim failed"))
        .collect();

    assert_eq!(results.iter().filter(|won| **won).count(), 1);
    let agent = store.get_agent(&id).await.unwrap().unwrap();
    assert_eq!(agent.workload.current_leads, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_claims_and_completions_interleave_safely() {
    let engine = memory_engine(vec![agent("agent-a", 3), agent("agent-b", 3)]);

    let tasks = (0..200).map(|_| {
        let engine = engine.clone();
        tokio::spawn(async move {
            let outcome = engine.assign_round_robin().await?;
            if let Some(assignment) = outcome.into_assignment() {
                tokio::task::yield_now().await;
                engine.complete(assignment.lease_id, false).await?;
                return Ok::<bool, LeadEngineError>(true);
            }
            Ok(false)
        })
    });
    let completed = join_all(tasks)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(true))))
        .count();

    assert!(completed > 0);
    assert_capacity_invariant(&engine).await;
    for agent in engine.store().list_agents().await.unwrap() {
        assert_eq!(agent.workload.current_leads, 0, "every lease was completed");
    }
    assert!(engine.open_leases().await.unwrap().is_empty());
    assert_eq!(engine.metrics().double_completions, 0);
}
