//! Observer hooks for table activity.
//!
//! A [`StatsSink`] receives events after the emitting thread released the
//! table lock, so an implementation may take its own locks or block briefly
//! without stalling the turn protocol. Every method defaults to a no-op.

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{
    game::{ActorId, TableId},
    table::{
        TurnParams,
        messages::{Outcome, TurnRecord},
    },
};

pub trait StatsSink: Send + Sync {
    /// A slot was opened for `actor`.
    fn turn_opened(&self, _table: TableId, _actor: ActorId, _slot: u64) {}

    /// The authority applied a proposal.
    fn action_applied(&self, _record: &TurnRecord) {}

    /// The supervisor replaced a table's parameters.
    fn policy_changed(&self, _table: TableId, _before: TurnParams, _after: TurnParams) {}

    /// A table ended. Reported once per table.
    fn table_finished(&self, _table: TableId, _outcome: &Outcome) {}
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl StatsSink for NoopSink {}

/// A recorded parameter change.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ParamsChange {
    pub table: TableId,
    pub before: TurnParams,
    pub after: TurnParams,
}

#[derive(Debug, Default)]
struct LedgerInner {
    opened: BTreeMap<TableId, Vec<(ActorId, u64)>>,
    applied: Vec<TurnRecord>,
    changes: Vec<ParamsChange>,
    finished: BTreeMap<TableId, Vec<Outcome>>,
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct TurnLedger {
    inner: Mutex<LedgerInner>,
}

impl TurnLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every applied turn in the order the authority reported them.
    #[must_use]
    pub fn records(&self) -> Vec<TurnRecord> {
        self.lock().applied.clone()
    }

    #[must_use]
    pub fn records_for(&self, table: TableId) -> Vec<TurnRecord> {
        self.lock()
            .applied
            .iter()
            .filter(|record| record.table == table)
            .copied()
            .collect()
    }

    /// `(actor, slot)` for every slot opened at `table`.
    #[must_use]
    pub fn opened_slots(&self, table: TableId) -> Vec<(ActorId, u64)> {
        self.lock().opened.get(&table).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn params_changes(&self) -> Vec<ParamsChange> {
        self.lock().changes.clone()
    }

    /// Every outcome reported for `table`; more than one would be a bug.
    #[must_use]
    pub fn outcomes(&self, table: TableId) -> Vec<Outcome> {
        self.lock().finished.get(&table).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn finished_tables(&self) -> usize {
        self.lock().finished.len()
    }
}

impl StatsSink for TurnLedger {
    fn turn_opened(&self, table: TableId, actor: ActorId, slot: u64) {
        self.lock().opened.entry(table).or_default().push((actor, slot));
    }

    fn action_applied(&self, record: &TurnRecord) {
        self.lock().applied.push(*record);
    }

    fn policy_changed(&self, table: TableId, before: TurnParams, after: TurnParams) {
        self.lock().changes.push(ParamsChange {
            table,
            before,
            after,
        });
    }

    fn table_finished(&self, table: TableId, outcome: &Outcome) {
        self.lock().finished.entry(table).or_default().push(*outcome);
    }
}
