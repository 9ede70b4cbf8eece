//! Table registry and per-table thread management.

use rand::Rng;
use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
};
use thiserror::Error;

use super::{
    actor::SeatActor,
    config::{TableConfig, TableConfigError},
    messages::{Outcome, TableSnapshot},
    scheduler::TurnScheduler,
    shared::Table,
    state::TableState,
};
use crate::{
    channel::ActionChannel,
    game::{Board, Deck, TableId},
    stats::StatsSink,
};

/// Deals a fresh shuffled set for a table and plays the opening tile.
///
/// # Arguments
///
/// * `id` - Table ID
/// * `config` - Table configuration, validated here
/// * `rng` - Source for the shuffle
///
/// # Returns
///
/// * `Result<Table, TableConfigError>` - Table ready for its first slot
pub fn deal_table<R: Rng + ?Sized>(
    id: TableId,
    config: &TableConfig,
    rng: &mut R,
) -> Result<Table, TableConfigError> {
    config.validate()?;

    let mut deck = Deck::default();
    deck.shuffle(rng);
    let (hands, pool) = deck.deal(config.actor_count);
    let (board, opening) = Board::open(hands, pool).ok_or(TableConfigError::NoOpeningTile)?;

    log::info!(
        "table {}: {} actors, actor {} opens with {} [{}]",
        id,
        config.actor_count,
        opening.actor,
        opening.tile,
        config.params.policy
    );

    Ok(Table::new(TableState::new(id, board, opening, config)))
}

/// All tables of a simulation, indexed by table ID.
#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: Vec<Arc<Table>>,
}

impl TableRegistry {
    /// Builds a registry. Table IDs must equal their position.
    #[must_use]
    pub fn new(tables: Vec<Table>) -> Self {
        Self {
            tables: tables.into_iter().map(Arc::new).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: TableId) -> Option<&Arc<Table>> {
        self.tables.get(id).filter(|table| table.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Table>> {
        self.tables.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    #[must_use]
    pub fn all_terminated(&self) -> bool {
        self.tables.iter().all(|table| table.is_terminated())
    }

    /// Blocks until every table terminated, one table at a time.
    pub fn wait_all_terminated(&self) -> Vec<Option<Outcome>> {
        self.tables
            .iter()
            .map(|table| table.wait_terminated())
            .collect()
    }

    #[must_use]
    pub fn snapshots(&self) -> Vec<TableSnapshot> {
        self.tables.iter().map(|table| table.snapshot()).collect()
    }
}

/// Errors from per-table threads
#[derive(Debug, Error)]
pub enum TableThreadError {
    #[error("failed to spawn thread {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("thread {0} panicked")]
    Panicked(String),
}

/// Result of joining one table's threads.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TableRun {
    pub table: TableId,
    pub outcome: Option<Outcome>,
    /// Proposals sent by all actors of the table.
    pub proposals: u64,
}

/// Scheduler and seat threads of one table.
pub struct TableThreads {
    table: TableId,
    scheduler: JoinHandle<Option<Outcome>>,
    actors: Vec<JoinHandle<u64>>,
}

impl TableThreads {
    /// Spawns the scheduler and one thread per seat.
    ///
    /// # Arguments
    ///
    /// * `table` - Table to run
    /// * `actions` - Channel every seat pushes its proposals to
    /// * `sink` - Receives turn events from the scheduler
    pub fn spawn(
        table: &Arc<Table>,
        actions: &Arc<ActionChannel>,
        sink: &Arc<dyn StatsSink>,
    ) -> Result<Self, TableThreadError> {
        let id = table.id();

        let actors = (0..table.actor_count())
            .map(|actor| {
                let seat = SeatActor::new(Arc::clone(table), actor, Arc::clone(actions));
                spawn_named(format!("table-{id}-actor-{actor}"), move || seat.run())
            })
            .collect::<Result<Vec<_>, _>>()?;

        let scheduler = TurnScheduler::new(Arc::clone(table), Arc::clone(sink));
        let scheduler = spawn_named(format!("table-{id}-scheduler"), move || scheduler.run())?;

        Ok(Self {
            table: id,
            scheduler,
            actors,
        })
    }

    #[must_use]
    pub const fn table(&self) -> TableId {
        self.table
    }

    /// Waits for every thread of the table to exit.
    pub fn join(self) -> Result<TableRun, TableThreadError> {
        let mut proposals = 0;
        for (actor, handle) in self.actors.into_iter().enumerate() {
            proposals += handle.join().map_err(|_| {
                TableThreadError::Panicked(format!("table-{}-actor-{}", self.table, actor))
            })?;
        }
        let outcome = self
            .scheduler
            .join()
            .map_err(|_| TableThreadError::Panicked(format!("table-{}-scheduler", self.table)))?;

        Ok(TableRun {
            table: self.table,
            outcome,
            proposals,
        })
    }
}

/// Spawns a named thread, mapping spawn failure to [`TableThreadError`].
pub(crate) fn spawn_named<F, T>(name: String, body: F) -> Result<JoinHandle<T>, TableThreadError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn(body)
        .map_err(|source| TableThreadError::Spawn { name, source })
}
