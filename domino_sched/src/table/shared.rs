//! A table shared between its actor threads, its scheduler, the
//! authority and the supervisor.

use std::{
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::game::{ActorId, TableId};

use super::{
    config::TurnParams,
    messages::{Outcome, TableSnapshot},
    state::TableState,
};

/// One lock and one condition variable around a [`TableState`].
///
/// Every wait re-checks termination, and every state change that another
/// thread may be waiting on is followed by a broadcast.
#[derive(Debug)]
pub struct Table {
    id: TableId,
    actor_count: usize,
    state: Mutex<TableState>,
    turn_cv: Condvar,
}

impl Table {
    #[must_use]
    pub fn new(state: TableState) -> Self {
        Self {
            id: state.id(),
            actor_count: state.actor_count(),
            state: Mutex::new(state),
            turn_cv: Condvar::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> TableId {
        self.id
    }

    #[must_use]
    pub const fn actor_count(&self) -> usize {
        self.actor_count
    }

    /// Locks the state. A poisoned lock is recovered: no critical section
    /// leaves the state half-updated.
    pub fn lock(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wakes every thread blocked on this table.
    pub fn broadcast(&self) {
        self.turn_cv.notify_all();
    }

    /// Blocks until `done` holds or the table terminates.
    pub fn wait_until<'a, F>(
        &'a self,
        guard: MutexGuard<'a, TableState>,
        mut done: F,
    ) -> MutexGuard<'a, TableState>
    where
        F: FnMut(&TableState) -> bool,
    {
        self.turn_cv
            .wait_while(guard, |state| !state.is_terminated() && !done(state))
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until `actor` holds an open slot it has not proposed for yet.
    pub fn wait_for_turn<'a>(
        &'a self,
        guard: MutexGuard<'a, TableState>,
        actor: ActorId,
        last_proposed: u64,
    ) -> MutexGuard<'a, TableState> {
        self.wait_until(guard, |state| {
            state.is_turn_open_for(actor) && state.slot() != last_proposed
        })
    }

    /// Blocks until the open slot has been consumed.
    pub fn wait_turn_applied<'a>(
        &'a self,
        guard: MutexGuard<'a, TableState>,
    ) -> MutexGuard<'a, TableState> {
        self.wait_until(guard, TableState::turn_applied)
    }

    /// Blocks until `slot` is no longer the open, unconsumed slot.
    pub fn wait_slot_closed<'a>(
        &'a self,
        guard: MutexGuard<'a, TableState>,
        slot: u64,
    ) -> MutexGuard<'a, TableState> {
        self.wait_until(guard, |state| state.slot() != slot || state.turn_applied())
    }

    /// Blocks until the table terminates and returns its outcome.
    pub fn wait_terminated(&self) -> Option<Outcome> {
        let guard = self.wait_until(self.lock(), |_| false);
        guard.outcome()
    }

    /// Like [`Table::wait_terminated`] but gives up after `timeout`.
    pub fn wait_terminated_timeout(&self, timeout: Duration) -> Option<Outcome> {
        let (guard, _) = self
            .turn_cv
            .wait_timeout_while(self.lock(), timeout, |state| !state.is_terminated())
            .unwrap_or_else(PoisonError::into_inner);
        guard.outcome()
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.lock().is_terminated()
    }

    #[must_use]
    pub fn snapshot(&self) -> TableSnapshot {
        self.lock().snapshot()
    }

    #[must_use]
    pub fn params(&self) -> TurnParams {
        self.lock().params()
    }

    /// Replaces the turn parameters with `update(current)` and wakes the
    /// table. Returns the previous and new parameters, or `None` when the
    /// table already terminated.
    pub fn update_params<F>(&self, update: F) -> Option<(TurnParams, TurnParams)>
    where
        F: FnOnce(TurnParams) -> TurnParams,
    {
        let mut state = self.lock();
        if state.is_terminated() {
            return None;
        }
        let before = state.params();
        let after = update(before);
        state.set_params(after);
        drop(state);

        self.broadcast();
        Some((before, after))
    }
}
