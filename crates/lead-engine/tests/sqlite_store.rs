//! SQLite store over a real database file

mod common;

use chrono::{Duration, NaiveDate, Utc};
use common::{agent, sqlite_store};
use futures::future::join_all;
use leadroute_engine::config::ResetConfig;
use leadroute_engine::prelude::*;
use serial_test::serial;
use std::sync::Arc;

#[tokio::test]
#[serial]
async fn test_state_survives_reopen() {
    let (store, _dir, url) = sqlite_store().await;
    let profile = agent("agent-1", 3).with_specialties(
        Specialties::default()
            .with_amount_range(0.0, 50000.0)
            .with_purposes(["personal"])
            .with_regions(["Johor", "Melaka"])
            .with_languages(["Malay", "English"]),
    );
    store.upsert_agent(&profile).await.unwrap();
    assert!(store.try_claim(&profile.id).await.unwrap());
    store.complete_lead(&profile.id, true).await.unwrap();
    assert!(store.try_claim(&profile.id).await.unwrap());
    drop(store);

    let reopened = SqliteAgentStore::connect(&url).await.unwrap();
    let loaded = reopened.get_agent(&profile.id).await.unwrap().unwrap();
    assert_eq!(loaded.specialties, profile.specialties);
    assert_eq!(loaded.workload.current_leads, 1);
    assert_eq!(loaded.workload.assigned_total, 2);
    assert_eq!(loaded.performance.closed_deals, 1);
    assert_eq!(loaded.performance.conversion_rate, 100.0);
}

#[tokio::test]
#[serial]
async fn test_reset_guard_is_shared_between_connections() {
    let (first, _dir, url) = sqlite_store().await;
    first.upsert_agent(&agent("agent-1", 3)).await.unwrap();
    let second = SqliteAgentStore::connect(&url).await.unwrap();
    let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

    assert!(first
        .reset_daily(today, ResetConfig::default())
        .await
        .unwrap()
        .was_applied());
    assert_eq!(
        second
            .reset_daily(today, ResetConfig::default())
            .await
            .unwrap(),
        ResetOutcome::AlreadyApplied { period: today }
    );
}

#[tokio::test]
#[serial]
async fn test_engine_over_sqlite_records_audit_trail() {
    let (store, _dir, _) = sqlite_store().await;
    store.upsert_agent(&agent("agent-1", 1)).await.unwrap();
    let engine = AssignmentEngine::new(Arc::new(store), LeadEngineConfig::default()).unwrap();

    let lead = Lead::new().with_amount(12000.0).with_purpose("business");
    let first = engine.assign_best_agent(&lead).await.unwrap();
    assert!(first.is_assigned());
    let second = engine.assign_best_agent(&lead).await.unwrap();
    assert_eq!(
        second,
        AssignmentOutcome::NoAgentAvailable(NoAgentReason::AllAtCapacity)
    );

    let audit = engine.recent_assignments(10).await.unwrap();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0].no_agent_reason, Some(NoAgentReason::AllAtCapacity));
    assert_eq!(audit[1].agent_id, Some(AgentId::from("agent-1")));
    assert_eq!(audit[1].lead_purpose.as_deref(), Some("business"));
}

#[tokio::test]
#[serial]
async fn test_roster_seed_into_sqlite() {
    let (store, _dir, _) = sqlite_store().await;
    let roster = Roster::from_toml_str(
        r#"
        [defaults]
        max_leads = 4

        [[agents]]
        id = "agent-1"
        name = "Cheng"
        contact = "+60123456789"

        [[agents]]
        id = "agent-2"
        name = "Sarah"
        contact = "+60198765432"
        status = "on_leave"
        "#,
    )
    .unwrap();

    let summary = roster.seed(&store).await.unwrap();
    assert_eq!(summary.created, 2);
    assert_eq!(store.list_agents().await.unwrap().len(), 2);
    let active = store.list_active_agents().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].workload.max_leads, 4);
}

async fn engine_on(url: &str) -> AssignmentEngine {
    let store = SqliteAgentStore::connect(url).await.unwrap();
    AssignmentEngine::new(Arc::new(store), LeadEngineConfig::default()).unwrap()
}

#[tokio::test]
#[serial]
async fn test_clearing_reset_retires_leases_of_every_engine() {
    let (store, _dir, url) = sqlite_store().await;
    store.upsert_agent(&agent("agent-1", 1)).await.unwrap();
    let first = engine_on(&url).await;
    let second = engine_on(&url).await;
    let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

    let before_reset = second
        .assign_round_robin()
        .await
        .unwrap()
        .into_assignment()
        .unwrap();
    assert!(first.reset_daily(today).await.unwrap().was_applied());
    assert_eq!(
        second.reset_daily(today).await.unwrap(),
        ResetOutcome::AlreadyApplied { period: today }
    );

    // The slot freed by the reset must not be released a second time
    assert!(matches!(
        second.complete(before_reset.lease_id, false).await,
        Err(LeadEngineError::LeaseNotFound(_))
    ));
    assert!(first.assign_round_robin().await.unwrap().is_assigned());
    assert_eq!(
        second.assign_round_robin().await.unwrap(),
        AssignmentOutcome::NoAgentAvailable(NoAgentReason::AllAtCapacity)
    );

    // Either engine may expire a lease the other one issued
    let later = Utc::now() + Duration::days(2);
    assert_eq!(second.expire_stale_leases(later).await.unwrap(), 1);
    let loaded = store.get_agent(&AgentId::from("agent-1")).await.unwrap().unwrap();
    assert_eq!(loaded.workload.current_leads, 0);
    assert!(store.open_leases().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_lease_outlives_the_engine_that_issued_it() {
    let (store, _dir, url) = sqlite_store().await;
    store.upsert_agent(&agent("agent-1", 2)).await.unwrap();

    let lease_id = {
        let engine = engine_on(&url).await;
        let assignment = engine
            .assign_best_agent(&Lead::new())
            .await
            .unwrap()
            .into_assignment()
            .unwrap();
        assignment.lease_id
    };

    let engine = engine_on(&url).await;
    let open = engine.open_leases().await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, lease_id);

    let outcome = engine.complete(lease_id, true).await.unwrap();
    assert_eq!(outcome.current_leads, 0);
    assert_eq!(outcome.closed_deals, 1);
    assert!(matches!(
        engine.complete(lease_id, true).await,
        Err(LeadEngineError::LeaseNotFound(_))
    ));
}

#[tokio::test]
#[serial]
async fn test_seeding_during_assignments_keeps_counters() {
    let (store, _dir, url) = sqlite_store().await;
    let roster = Roster::from_toml_str(
        r#"
        [[agents]]
        id = "agent-1"
        name = "Cheng"
        contact = "+60123456789"
        max_leads = 20
        "#,
    )
    .unwrap();
    roster.seed(&store).await.unwrap();
    let engine = Arc::new(engine_on(&url).await);
    let store = Arc::new(store);

    let assignments = (0..10).map(|_| {
        let engine = engine.clone();
        tokio::spawn(async move { engine.assign_round_robin().await.map(|o| o.is_assigned()) })
    });
    let seeds = (0..5).map(|_| {
        let store = store.clone();
        let roster = roster.clone();
        tokio::spawn(async move { roster.seed(store.as_ref()).await.map(|_| true) })
    });
    let results = join_all(assignments.chain(seeds)).await;
    for result in results {
        assert!(result.unwrap().unwrap());
    }

    let loaded = store.get_agent(&AgentId::from("agent-1")).await.unwrap().unwrap();
    assert_eq!(loaded.workload.current_leads, 10);
    assert_eq!(loaded.workload.assigned_total, 10);
    assert_eq!(engine.open_leases().await.unwrap().len(), 10);
}
