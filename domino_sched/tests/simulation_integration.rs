//! End-to-end runs of several tables with every thread live.
//!
//! Each test checks what the ledger saw against what the protocol promises:
//! one applied action per opened slot, slots in order, the full set of
//! tiles on every table, and exactly one outcome per table.

use domino_sched::{
    Policy, Simulation, SimulationConfig, SimulationReport, TerminationReason, TurnLedger,
    TurnParams,
    game::constants::TILE_COUNT,
    policy::{Fcfs, RoundRobin, SjfCost, SjfUnits},
};
use serial_test::serial;
use std::sync::Arc;

fn run(config: SimulationConfig) -> (SimulationReport, Arc<TurnLedger>) {
    let ledger = Arc::new(TurnLedger::new());
    let report = Simulation::with_sink(config, ledger.clone())
        .unwrap()
        .run()
        .unwrap();
    (report, ledger)
}

fn fixed_policy(policy: Policy, seed: u64) -> SimulationConfig {
    SimulationConfig {
        tables: 4,
        seed: Some(seed),
        params: TurnParams::default().with_policy(policy),
        auto_tune: false,
        ..SimulationConfig::default()
    }
}

/// Invariants every finished run must satisfy.
fn assert_protocol_held(report: &SimulationReport, ledger: &TurnLedger) {
    assert_eq!(ledger.finished_tables(), report.tables.len());

    for table in &report.tables {
        let id = table.table;
        let records = ledger.records_for(id);
        let opened = ledger.opened_slots(id);
        let actors = table.snapshot.actor_count();

        // Exactly one outcome, announced by the last applied action.
        let outcomes = ledger.outcomes(id);
        assert_eq!(outcomes.len(), 1, "table {id} outcomes {outcomes:?}");
        assert_eq!(table.outcome, Some(outcomes[0]));
        assert!(table.snapshot.terminated);
        let last = records.last().expect("every table applies at least one action");
        assert_eq!(last.outcome, table.outcome);
        assert!(records[..records.len() - 1].iter().all(|r| r.outcome.is_none()));

        // Slots 1..=n, each applied once, in order.
        let slots: Vec<u64> = records.iter().map(|r| r.slot).collect();
        let expected: Vec<u64> = (1..=records.len() as u64).collect();
        assert_eq!(slots, expected, "table {id}");
        assert_eq!(table.snapshot.steps, records.len() as u64);

        // Every opened slot was applied by the actor it was opened for.
        assert_eq!(opened.len(), records.len(), "table {id}");
        for (record, (actor, slot)) in records.iter().zip(&opened) {
            assert_eq!(record.slot, *slot);
            assert_eq!(record.actor, *actor);
            assert!(record.actor < actors);
        }

        // Tiles are never created or lost.
        assert!(records.iter().all(|r| r.total_units == TILE_COUNT));
        assert_eq!(table.snapshot.total_units(), TILE_COUNT);

        // Each actor proposed once per slot it held.
        assert_eq!(table.proposals, records.len() as u64);
    }

    assert_eq!(report.authority.stale, 0);
    assert_eq!(report.authority.unknown_table, 0);
    assert_eq!(report.authority.applied, ledger.records().len() as u64);
}

#[test]
#[serial]
fn test_fcfs_run_cycles_seats() {
    let (report, ledger) = run(fixed_policy(Fcfs.into(), 17));
    assert_protocol_held(&report, &ledger);

    for table in &report.tables {
        let actors = table.snapshot.actor_count();
        let records = ledger.records_for(table.table);
        for pair in records.windows(2) {
            assert_eq!(pair[1].actor, (pair[0].actor + 1) % actors);
        }
    }
}

#[test]
#[serial]
fn test_every_policy_terminates_every_table() {
    for (seed, policy) in [
        (1, Policy::from(Fcfs)),
        (2, Policy::from(RoundRobin)),
        (3, Policy::from(SjfUnits)),
        (4, Policy::from(SjfCost)),
    ] {
        let (report, ledger) = run(fixed_policy(policy, seed));
        assert_protocol_held(&report, &ledger);
        assert!(report.tables.iter().all(|t| t.snapshot.policy == policy));
    }
}

#[test]
#[serial]
fn test_step_ceiling_stops_runaway_tables() {
    let config = SimulationConfig {
        max_steps: 5,
        ..fixed_policy(Fcfs.into(), 23)
    };
    let (report, ledger) = run(config);
    assert_protocol_held(&report, &ledger);

    for table in &report.tables {
        let outcome = table.outcome.unwrap();
        assert!(outcome.steps <= 5);
        if outcome.reason == TerminationReason::StepCeiling {
            assert_eq!(outcome.steps, 5);
        }
    }
}

#[test]
#[serial]
fn test_winner_matches_termination_reason() {
    let (report, ledger) = run(fixed_policy(SjfCost.into(), 99));
    assert_protocol_held(&report, &ledger);

    for table in &report.tables {
        let outcome = table.outcome.unwrap();
        let loads = &table.snapshot.loads;
        match outcome.reason {
            TerminationReason::HandEmptied => assert_eq!(loads[outcome.winner].units, 0),
            TerminationReason::Blocked | TerminationReason::StepCeiling => {
                let best = loads
                    .iter()
                    .enumerate()
                    .min_by_key(|(actor, load)| (load.cost, load.units, *actor))
                    .map(|(actor, _)| actor);
                assert_eq!(Some(outcome.winner), best);
            }
            TerminationReason::Aborted => panic!("table {} aborted", table.table),
        }
        if outcome.reason == TerminationReason::Blocked {
            assert_eq!(table.snapshot.pool_units, 0);
            assert!(table.snapshot.pass_streak >= table.snapshot.actor_count());
        }
    }
}

#[test]
#[serial]
fn test_auto_tuned_run_keeps_protocol() {
    let config = SimulationConfig {
        tables: 3,
        seed: Some(8),
        params: TurnParams::default().with_cooldown_ms(1),
        auto_tune: true,
        tune_interval_ms: 5,
        ..SimulationConfig::default()
    };
    let (report, ledger) = run(config);
    assert_protocol_held(&report, &ledger);
    assert!(report.tuner.is_some());

    for change in ledger.params_changes() {
        assert_ne!(change.before, change.after);
    }
}

#[test]
#[serial]
fn test_report_serializes() {
    let (report, _) = run(SimulationConfig {
        tables: 1,
        ..fixed_policy(Fcfs.into(), 5)
    });
    let json = serde_json::to_string(&report).unwrap();
    let back: SimulationReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back, report);
}
