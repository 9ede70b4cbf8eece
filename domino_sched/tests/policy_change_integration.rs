//! Runtime policy changes against live tables.

use domino_sched::{
    ControlError, Policy, Simulation, SimulationConfig, Target, TurnLedger, TurnParams,
    authority::{Disposition, ValidatingAuthority},
    channel::{action_channel, policy_change_channel},
    game::{Board, Hand, Opening, Pool, Side, Tile, Train, constants::TILE_COUNT},
    policy::{Fcfs, RoundRobin, SjfUnits},
    stats::StatsSink,
    table::{
        ActionKind, AppliedAction, PolicyChangeRequest, Table, TableConfig, TableRegistry,
        TableState, TableThreads, TerminationReason,
    },
    tuning::PolicySupervisor,
};
use serial_test::serial;
use std::{sync::Arc, time::Duration};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn tiles(pairs: &[(u8, u8)]) -> Vec<Tile> {
    pairs.iter().map(|&(a, b)| Tile(a, b)).collect()
}

/// Three seats; actor 0 holds the first slot.
fn three_seat_registry(policy: Policy) -> Arc<TableRegistry> {
    let hands = vec![
        Hand::from_tiles(tiles(&[(6, 0), (1, 1)])),
        Hand::from_tiles(tiles(&[(2, 3), (3, 4), (4, 5)])),
        Hand::from_tiles(tiles(&[(5, 5)])),
    ];
    let board = Board::from_parts(
        hands,
        Pool::from_tiles(tiles(&[(1, 2)])),
        Train::starting_with(Tile(6, 6)),
    );
    let opening = Opening {
        actor: 2,
        tile: Tile(6, 6),
    };
    let config = TableConfig::new(3, TurnParams::default().with_policy(policy));
    let state = TableState::new(0, board, opening, &config);
    Arc::new(TableRegistry::new(vec![Table::new(state)]))
}

#[test]
#[serial]
fn test_change_between_proposal_and_apply_takes_effect_next_slot() {
    let registry = three_seat_registry(Fcfs.into());
    let table = Arc::clone(registry.get(0).unwrap());
    let actions = Arc::new(action_channel());
    let ledger = Arc::new(TurnLedger::new());
    let sink: Arc<dyn StatsSink> = ledger.clone();

    let authority = ValidatingAuthority::new(
        Arc::clone(&registry),
        Arc::clone(&actions),
        Arc::clone(&sink),
    );
    let supervisor = PolicySupervisor::new(
        Arc::clone(&registry),
        Arc::new(policy_change_channel()),
        Arc::clone(&sink),
    );
    let threads = TableThreads::spawn(&table, &actions, &sink).unwrap();

    // Slot 1 is in flight when the policy changes.
    let in_flight = actions.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!((in_flight.actor, in_flight.slot), (0, 1));
    assert!(supervisor.apply(&PolicyChangeRequest::policy(0, SjfUnits.into())));

    let Disposition::Applied(record) = authority.process(&in_flight) else {
        panic!("in-flight action must still apply");
    };
    assert_eq!(
        record.requested,
        ActionKind::Play {
            index: 0,
            side: Side::Left
        }
    );
    assert!(record.applied.is_play());

    // SJF-UNITS: actors 0 and 2 both hold one tile, lowest id wins.
    // FCFS would have picked actor 1.
    let next = actions.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!((next.actor, next.slot), (0, 2));

    // Replaying the consumed proposal is stale.
    assert!(matches!(authority.process(&in_flight), Disposition::Stale(_)));

    assert!(supervisor.apply(&PolicyChangeRequest::policy(0, Fcfs.into())));
    let Disposition::Applied(record) = authority.process(&next) else {
        panic!("second action must apply");
    };
    assert_eq!(record.applied, AppliedAction::Drew { tile: Tile(1, 2) });

    let third = actions.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!((third.actor, third.slot), (1, 3));
    assert!(actions.recv_timeout(Duration::from_millis(30)).is_none());

    table.lock().terminate(TerminationReason::StepCeiling);
    table.broadcast();
    let run = threads.join().unwrap();
    assert_eq!(run.proposals, 3);

    let slots: Vec<u64> = ledger.records_for(0).iter().map(|r| r.slot).collect();
    assert_eq!(slots, vec![1, 2]);
    assert_eq!(ledger.opened_slots(0), vec![(0, 1), (0, 2), (1, 3)]);
}

#[test]
#[serial]
fn test_operator_changes_on_running_simulation() {
    let ledger = Arc::new(TurnLedger::new());
    let config = SimulationConfig {
        tables: 3,
        actors: Some(3),
        seed: Some(31),
        params: TurnParams::default().with_cooldown_ms(2),
        auto_tune: false,
        ..SimulationConfig::default()
    };
    let handle = Simulation::with_sink(config, ledger.clone())
        .unwrap()
        .start()
        .unwrap();

    assert_eq!(handle.request_policy(Target::All, RoundRobin.into()), Ok(3));
    assert_eq!(handle.request_quantum(Target::Table(1), 150), Ok(1));
    assert_eq!(
        handle.request_policy(Target::Table(7), Fcfs.into()),
        Err(ControlError::UnknownTable(7))
    );
    assert!(handle.set_cooldown(Target::All, 0).is_ok());

    let report = handle.wait().unwrap();

    for table in &report.tables {
        let records = ledger.records_for(table.table);
        let slots: Vec<u64> = records.iter().map(|r| r.slot).collect();
        let expected: Vec<u64> = (1..=records.len() as u64).collect();
        assert_eq!(slots, expected);
        assert!(records.iter().all(|r| r.total_units == TILE_COUNT));
        assert_eq!(ledger.outcomes(table.table).len(), 1);
    }

    for change in ledger.params_changes() {
        assert_ne!(change.before, change.after);
        let table = &report.tables[change.table];
        if change.after.policy.is_round_robin() {
            assert!(table.snapshot.policy.is_round_robin());
        }
        if change.after.quantum_ms == 150 {
            assert_eq!(change.table, 1);
        }
    }
    assert_eq!(report.authority.stale, 0);
}

#[test]
#[serial]
fn test_stop_accepting_then_shutdown() {
    let config = SimulationConfig {
        tables: 2,
        seed: Some(77),
        params: TurnParams::default().with_cooldown_ms(1),
        auto_tune: true,
        tune_interval_ms: 5,
        ..SimulationConfig::default()
    };
    let handle = Simulation::new(config).unwrap().start().unwrap();

    handle.stop_policy_requests();
    assert_eq!(
        handle.request_policy(Target::All, SjfUnits.into()),
        Err(ControlError::Closed)
    );
    assert_eq!(
        handle.request_quantum(Target::Table(0), 10),
        Err(ControlError::Closed)
    );
    // Cooldown bypasses the channel.
    assert_ne!(
        handle.set_cooldown(Target::Table(0), 0),
        Err(ControlError::Closed)
    );

    let report = handle.wait().unwrap();
    assert!(report.tables.iter().all(|t| t.outcome.is_some()));
    assert_eq!(report.supervisor.applied, 0);
    let tuner = report.tuner.unwrap();
    assert_eq!(tuner.policy_requests, 0);
}
