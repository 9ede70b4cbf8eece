//! Tables and the turn protocol.
//!
//! This module implements:
//! - `TableState`: allocation state plus turn bookkeeping, mutated under one lock
//! - `Table`: the lock and condition variable shared by every thread of a table
//! - `SeatActor`: one thread per seat, one proposal per scheduled slot
//! - `TurnScheduler`: one thread per table, opening slots through the active policy
//! - `TableRegistry`: lookup and termination tracking across tables
//!
//! ## Turn protocol
//!
//! The scheduler opens a slot by picking the next actor, bumping the slot
//! number and clearing `turn_applied` under the lock, then broadcasting.
//! The scheduled actor plans its action, releases the lock and pushes to the
//! action channel. The authority applies it, sets `turn_applied` and
//! broadcasts, which wakes the scheduler for the next slot. Termination is
//! part of every wait predicate.

pub mod actor;
pub mod config;
pub mod manager;
pub mod messages;
pub mod scheduler;
pub mod shared;
pub mod state;

pub use actor::SeatActor;
pub use config::{TableConfig, TableConfigError, TurnParams};
pub use manager::{TableRegistry, TableRun, TableThreadError, TableThreads, deal_table};
pub use messages::{
    Action, ActionKind, AppliedAction, Outcome, PolicyChangeRequest, TableSnapshot,
    TerminationReason, TurnRecord,
};
pub use scheduler::TurnScheduler;
pub use shared::Table;
pub use state::{StaleReason, TableState};
