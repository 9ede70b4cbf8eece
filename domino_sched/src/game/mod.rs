//! Domino resource model.
//!
//! This module provides the per-table allocation state the scheduler works on:
//! - Tiles, hands, the pool and the two-ended train
//! - Dealing a shuffled double-six set
//! - Opening selection (highest double, else highest pip sum)
//! - Per-actor load figures consumed by the scheduling policies

pub mod board;
pub mod constants;
pub mod entities;

pub use board::{ActorLoad, Board, Opening, PlayRejection, fewest_units_actor, lowest_cost_actor};
pub use entities::{ActorId, Deck, Hand, Pips, Pool, Side, TableId, Tile, Train};
