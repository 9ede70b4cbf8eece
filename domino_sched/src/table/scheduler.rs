//! Per-table scheduler thread.

use std::sync::Arc;

use crate::stats::StatsSink;

use super::{messages::Outcome, shared::Table};

/// Opens one slot after another until the table terminates.
///
/// Each time the open slot is consumed, the scheduler asks the active policy
/// for the next actor and opens the next slot in the same critical section,
/// then wakes the table.
pub struct TurnScheduler {
    table: Arc<Table>,
    sink: Arc<dyn StatsSink>,
}

impl TurnScheduler {
    #[must_use]
    pub fn new(table: Arc<Table>, sink: Arc<dyn StatsSink>) -> Self {
        Self { table, sink }
    }

    /// Runs until the table terminates and returns its outcome.
    pub fn run(self) -> Option<Outcome> {
        let id = self.table.id();

        let first = {
            let state = self.table.lock();
            (!state.is_terminated()).then(|| (state.turn(), state.slot()))
        };
        if let Some((actor, slot)) = first {
            log::debug!("table {}: slot {} opens for actor {}", id, slot, actor);
            self.sink.turn_opened(id, actor, slot);
        }
        self.table.broadcast();

        loop {
            let mut state = self.table.wait_turn_applied(self.table.lock());
            let opened = state.schedule_next();
            let policy = state.params().policy;
            drop(state);

            let Some((actor, slot)) = opened else {
                break;
            };
            self.table.broadcast();
            log::debug!(
                "table {}: [{}] slot {} opens for actor {}",
                id,
                policy,
                slot,
                actor
            );
            self.sink.turn_opened(id, actor, slot);
        }

        // Release anything still blocked on the table.
        self.table.broadcast();
        let outcome = self.table.lock().outcome();
        log::debug!("table {}: scheduler stops", id);
        outcome
    }
}
