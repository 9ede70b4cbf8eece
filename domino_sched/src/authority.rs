//! The validating authority: the only thread that applies actions.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    channel::ActionChannel,
    stats::StatsSink,
    table::{Action, StaleReason, TableRegistry, TurnRecord},
};

/// What happened to one drained proposal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Disposition {
    Applied(TurnRecord),
    Stale(StaleReason),
    UnknownTable,
}

/// Counters reported when the authority stops.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct AuthorityStats {
    pub applied: u64,
    /// Applied, but not as requested.
    pub downgraded: u64,
    pub stale: u64,
    pub unknown_table: u64,
}

impl AuthorityStats {
    fn record(&mut self, disposition: &Disposition) {
        match disposition {
            Disposition::Applied(record) => {
                self.applied += 1;
                if record.was_downgraded() {
                    self.downgraded += 1;
                }
            }
            Disposition::Stale(_) => self.stale += 1,
            Disposition::UnknownTable => self.unknown_table += 1,
        }
    }
}

/// Drains the action channel and serializes every mutation of every table.
pub struct ValidatingAuthority {
    registry: Arc<TableRegistry>,
    actions: Arc<ActionChannel>,
    sink: Arc<dyn StatsSink>,
}

impl ValidatingAuthority {
    #[must_use]
    pub fn new(
        registry: Arc<TableRegistry>,
        actions: Arc<ActionChannel>,
        sink: Arc<dyn StatsSink>,
    ) -> Self {
        Self {
            registry,
            actions,
            sink,
        }
    }

    /// Runs until the action channel is closed and drained.
    pub fn run(self) -> AuthorityStats {
        let mut stats = AuthorityStats::default();
        while let Some(action) = self.actions.recv() {
            let disposition = self.process(&action);
            stats.record(&disposition);
        }

        log::debug!(
            "authority stops: {} applied ({} downgraded), {} stale, {} for unknown tables",
            stats.applied,
            stats.downgraded,
            stats.stale,
            stats.unknown_table
        );
        stats
    }

    /// Validates and applies one proposal against the live table.
    pub fn process(&self, action: &Action) -> Disposition {
        let Some(table) = self.registry.get(action.table) else {
            log::debug!("discarding action for unknown table {}", action.table);
            return Disposition::UnknownTable;
        };

        let result = table.lock().apply(action);
        let record = match result {
            Ok(record) => record,
            Err(reason) => {
                log::debug!(
                    "table {}: stale {} from actor {} for slot {}: {:?}",
                    action.table,
                    action.kind,
                    action.actor,
                    action.slot,
                    reason
                );
                return Disposition::Stale(reason);
            }
        };
        table.broadcast();

        if record.was_downgraded() {
            log::info!(
                "table {}: actor {} asked {} but {} (hand {}, pool {}, streak {})",
                record.table,
                record.actor,
                record.requested,
                record.applied,
                record.hand_units,
                record.pool_units,
                record.pass_streak
            );
        } else {
            log::info!(
                "table {}: actor {} {} (hand {}, pool {}, streak {})",
                record.table,
                record.actor,
                record.applied,
                record.hand_units,
                record.pool_units,
                record.pass_streak
            );
        }
        self.sink.action_applied(&record);

        if let Some(outcome) = &record.outcome {
            log::info!("table {}: finished, {}", record.table, outcome);
            self.sink.table_finished(record.table, outcome);
        }

        Disposition::Applied(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        channel::action_channel,
        game::{Board, Hand, Opening, Pool, Side, Tile, Train},
        stats::TurnLedger,
        table::{ActionKind, AppliedAction, Table, TableConfig, TableState, TerminationReason},
    };
    use std::thread;

    fn registry() -> Arc<TableRegistry> {
        let hands = vec![
            Hand::from_tiles(vec![Tile(6, 1)]),
            Hand::from_tiles(vec![Tile(0, 3), Tile(5, 5)]),
        ];
        let board = Board::from_parts(
            hands,
            Pool::from_tiles(vec![Tile(2, 4)]),
            Train::starting_with(Tile(6, 6)),
        );
        let opening = Opening {
            actor: 1,
            tile: Tile(6, 6),
        };
        let state = TableState::new(0, board, opening, &TableConfig::default());
        Arc::new(TableRegistry::new(vec![Table::new(state)]))
    }

    fn authority(registry: &Arc<TableRegistry>, ledger: &Arc<TurnLedger>) -> ValidatingAuthority {
        ValidatingAuthority::new(Arc::clone(registry), Arc::new(action_channel()), ledger.clone())
    }

    fn play(actor: usize, slot: u64, index: usize, side: Side) -> Action {
        Action {
            table: 0,
            actor,
            slot,
            kind: ActionKind::Play { index, side },
        }
    }

    #[test]
    fn test_winning_play_is_applied_once_and_reported() {
        let registry = registry();
        let ledger = Arc::new(TurnLedger::new());
        let authority = authority(&registry, &ledger);

        let action = play(0, 1, 0, Side::Right);
        let Disposition::Applied(record) = authority.process(&action) else {
            panic!("expected the play to be applied");
        };
        assert_eq!(record.outcome.map(|o| o.reason), Some(TerminationReason::HandEmptied));

        assert_eq!(
            authority.process(&action),
            Disposition::Stale(StaleReason::Terminated)
        );
        assert_eq!(ledger.records().len(), 1);
        assert_eq!(ledger.outcomes(0).len(), 1);
    }

    #[test]
    fn test_out_of_turn_and_unknown_table_are_discarded() {
        let registry = registry();
        let ledger = Arc::new(TurnLedger::new());
        let authority = authority(&registry, &ledger);

        assert_eq!(
            authority.process(&play(1, 1, 0, Side::Left)),
            Disposition::Stale(StaleReason::NotYourTurn { turn: 0 })
        );
        assert_eq!(
            authority.process(&Action {
                table: 9,
                ..play(0, 1, 0, Side::Left)
            }),
            Disposition::UnknownTable
        );
        assert!(ledger.records().is_empty());
        assert_eq!(registry.snapshots()[0].steps, 0);
    }

    #[test]
    fn test_illegal_play_becomes_draw() {
        let registry = registry();
        let ledger = Arc::new(TurnLedger::new());
        let authority = authority(&registry, &ledger);

        // Index 3 does not exist in actor 0's hand.
        let Disposition::Applied(record) = authority.process(&play(0, 1, 3, Side::Left)) else {
            panic!("expected a fallback to be applied");
        };
        assert_eq!(record.applied, AppliedAction::Drew { tile: Tile(2, 4) });
        assert_eq!(record.total_units, 5);
    }

    #[test]
    fn test_run_drains_channel_until_closed() {
        let registry = registry();
        let actions = Arc::new(action_channel());
        let authority = ValidatingAuthority::new(
            Arc::clone(&registry),
            Arc::clone(&actions),
            Arc::new(TurnLedger::new()),
        );
        let handle = thread::spawn(move || authority.run());

        actions.push(play(1, 1, 0, Side::Left)).unwrap();
        actions.push(play(0, 1, 0, Side::Left)).unwrap();
        actions.push(play(0, 1, 0, Side::Left)).unwrap();
        actions.close();

        let stats = handle.join().unwrap();
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.stale, 2);
        assert!(registry.all_terminated());
    }
}
