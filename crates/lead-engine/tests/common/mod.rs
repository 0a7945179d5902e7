//! Shared fixtures for the integration tests

#![allow(dead_code)]

use leadroute_engine::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

/// Route engine logs to the test harness; `RUST_LOG` picks the level
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Active agent with the given capacity and otherwise identical attributes
pub fn agent(id: &str, max_leads: u32) -> Agent {
    Agent::new(id, id.to_uppercase(), format!("+6010{}", id.len()))
        .with_capacity(max_leads)
        .with_priority(10)
}

pub fn memory_engine(agents: Vec<Agent>) -> Arc<AssignmentEngine> {
    memory_engine_with(agents, LeadEngineConfig::default())
}

pub fn memory_engine_with(agents: Vec<Agent>, config: LeadEngineConfig) -> Arc<AssignmentEngine> {
    init_logging();
    let store = Arc::new(MemoryAgentStore::with_agents(agents).expect("valid agents"));
    Arc::new(AssignmentEngine::new(store, config).expect("valid config"))
}

/// File-backed SQLite store in a fresh temporary directory
///
/// Keep the returned `TempDir` alive for as long as the store is used.
pub async fn sqlite_store() -> (SqliteAgentStore, TempDir, String) {
    init_logging();
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("leads.db").display());
    let store = SqliteAgentStore::connect(&url).await.expect("open database");
    (store, dir, url)
}

pub async fn sqlite_engine(agents: Vec<Agent>) -> (Arc<AssignmentEngine>, TempDir) {
    let (store, dir, _) = sqlite_store().await;
    for agent in &agents {
        store.upsert_agent(agent).await.expect("upsert");
    }
    let engine = AssignmentEngine::new(Arc::new(store), LeadEngineConfig::default()).expect("engine");
    (Arc::new(engine), dir)
}

/// Every agent's workload, failing the test on any capacity violation
pub async fn assert_capacity_invariant(engine: &AssignmentEngine) {
    for agent in engine.store().list_agents().await.expect("list agents") {
        assert!(
            agent.workload.current_leads <= agent.workload.max_leads,
            "agent {} holds {} leads with capacity {}",
            agent.id,
            agent.workload.current_leads,
            agent.workload.max_leads
        );
    }
}
