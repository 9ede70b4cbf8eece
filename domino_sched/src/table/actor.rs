//! Seat actor: one thread per seat, proposing one action per scheduled turn.

use std::{sync::Arc, thread};

use crate::{channel::ActionChannel, game::ActorId};

use super::{messages::Action, shared::Table};

/// A seated participant of one table.
///
/// The actor never mutates the table. It waits for a slot addressed to it,
/// honours the cooldown without holding the lock, re-validates, plans from
/// what it sees and hands the proposal to the authority.
pub struct SeatActor {
    table: Arc<Table>,
    actor: ActorId,
    actions: Arc<ActionChannel>,
}

impl SeatActor {
    #[must_use]
    pub fn new(table: Arc<Table>, actor: ActorId, actions: Arc<ActionChannel>) -> Self {
        Self {
            table,
            actor,
            actions,
        }
    }

    /// Runs until the table terminates. Returns how many proposals were sent.
    pub fn run(self) -> u64 {
        let table_id = self.table.id();
        let mut last_proposed = 0;
        let mut proposals = 0;

        loop {
            let state = self
                .table
                .wait_for_turn(self.table.lock(), self.actor, last_proposed);
            if state.is_terminated() {
                break;
            }
            let slot = state.slot();
            let cooldown = state.params().cooldown();
            drop(state);

            if !cooldown.is_zero() {
                thread::sleep(cooldown);
            }

            let state = self.table.lock();
            if state.is_terminated() {
                break;
            }
            if !state.is_turn_open_for(self.actor) || state.slot() != slot {
                continue;
            }
            let kind = state.plan_action(self.actor);
            drop(state);

            last_proposed = slot;
            let action = Action {
                table: table_id,
                actor: self.actor,
                slot,
                kind,
            };
            if self.actions.push(action).is_err() {
                log::warn!(
                    "table {}: actor {} found the action channel closed",
                    table_id,
                    self.actor
                );
                break;
            }
            proposals += 1;

            let state = self.table.wait_slot_closed(self.table.lock(), slot);
            if state.is_terminated() {
                break;
            }
        }

        log::debug!(
            "table {}: actor {} leaves after {} proposals",
            table_id,
            self.actor,
            proposals
        );
        proposals
    }
}
