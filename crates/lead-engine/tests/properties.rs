//! Property tests for scoring and the ledger

mod common;

use leadroute_engine::prelude::*;
use leadroute_engine::routing::scoring::{amount_score, performance_score, workload_score};
use proptest::prelude::*;

fn lead_strategy() -> impl Strategy<Value = Lead> {
    (
        prop::option::of(0.0f64..500_000.0),
        prop::option::of(prop::sample::select(vec!["personal", "business", "auto"])),
    )
        .prop_map(|(amount, purpose)| {
            let mut lead = Lead::new();
            lead.amount = amount;
            lead.purpose = purpose.map(str::to_string);
            lead
        })
}

proptest! {
    #[test]
    fn workload_score_never_drops_as_load_falls(max in 1u32..100, current in 0u32..100) {
        let current = current.min(max);
        let busier = Workload { current_leads: current, ..Workload::with_capacity(max) };
        let lighter = Workload { current_leads: current.saturating_sub(1), ..busier };
        prop_assert!(workload_score(&lighter) >= workload_score(&busier));
    }

    #[test]
    fn performance_score_never_drops_as_conversion_rises(
        rate in 0.0f64..100.0,
        bump in 0.0f64..50.0,
        deals in 0u32..500,
    ) {
        let base = Performance { conversion_rate: rate, closed_deals: deals, ..Performance::default() };
        let better = Performance { conversion_rate: (rate + bump).min(100.0), ..base };
        prop_assert!(performance_score(&better, 100) >= performance_score(&base, 100));
    }

    #[test]
    fn amount_strictly_inside_range_scores_exactly_100(
        min in 0.0f64..1_000_000.0,
        width in 1e-6f64..1_000_000.0,
        t in 0.0f64..1.0,
    ) {
        let range = AmountRange::new(min, min + width);
        let amount = min + width * t;
        prop_assume!(amount > range.min && amount < range.max);
        prop_assert_eq!(amount_score(&range, amount), 100.0);
    }

    #[test]
    fn total_score_stays_in_bounds(
        lead in lead_strategy(),
        current in 0u32..30,
        rate in 0.0f64..=100.0,
        priority in 0u8..=10,
    ) {
        let mut agent = Agent::new("agent-1", "A", "x")
            .with_capacity(30)
            .with_priority(priority)
            .with_performance(rate, 7);
        agent.workload.current_leads = current;
        let total = Scorer::default().score(&agent, &lead).unwrap();
        prop_assert!((0.0..=100.0).contains(&total));
    }

    #[test]
    fn ledger_never_exceeds_capacity(max in 0u32..10, attempts in 0usize..30) {
        let store = MemoryAgentStore::with_agents([common::agent("agent-1", max)]).unwrap();
        let id = AgentId::from("agent-1");
        let wins = tokio_test::block_on(async {
            let mut wins = 0u32;
            for _ in 0..attempts {
                if store.try_claim(&id).await.unwrap() {
                    wins += 1;
                }
            }
            wins
        });
        prop_assert_eq!(wins as usize, attempts.min(max as usize));

        let agent = tokio_test::block_on(store.get_agent(&id)).unwrap().unwrap();
        prop_assert!(agent.workload.current_leads <= agent.workload.max_leads);
    }
}
