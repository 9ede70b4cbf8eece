//! Values exchanged between actors, the authority, the supervisor and
//! observers of a table.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    game::{ActorId, ActorLoad, Pips, Side, TableId, Tile},
    policy::Policy,
};

/// What an actor asks the authority to do with its turn.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ActionKind {
    /// Place the tile at `index` of the hand on the given end of the train.
    Play { index: usize, side: Side },
    Draw,
    Pass,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Play { index, side } => write!(f, "PLAY #{index} {side}"),
            Self::Draw => write!(f, "DRAW"),
            Self::Pass => write!(f, "PASS"),
        }
    }
}

/// A proposal produced once per scheduled turn.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Action {
    pub table: TableId,
    pub actor: ActorId,
    /// Slot the proposal was computed for. Anything else is stale.
    pub slot: u64,
    pub kind: ActionKind,
}

/// What the authority actually did with an accepted proposal.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum AppliedAction {
    Played { tile: Tile, side: Side },
    Drew { tile: Tile },
    Passed,
}

impl AppliedAction {
    #[must_use]
    pub const fn is_play(&self) -> bool {
        matches!(self, Self::Played { .. })
    }
}

impl fmt::Display for AppliedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Played { tile, side } => write!(f, "plays {tile} on the {side}"),
            Self::Drew { tile } => write!(f, "draws {tile}"),
            Self::Passed => write!(f, "passes"),
        }
    }
}

/// Request to replace a table's policy and/or quantum.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PolicyChangeRequest {
    pub table: TableId,
    pub policy: Option<Policy>,
    pub quantum_ms: Option<u64>,
}

impl PolicyChangeRequest {
    #[must_use]
    pub const fn policy(table: TableId, policy: Policy) -> Self {
        Self {
            table,
            policy: Some(policy),
            quantum_ms: None,
        }
    }

    #[must_use]
    pub const fn quantum(table: TableId, quantum_ms: u64) -> Self {
        Self {
            table,
            policy: None,
            quantum_ms: Some(quantum_ms),
        }
    }

    /// True when the request would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.policy.is_none() && self.quantum_ms.is_none()
    }
}

/// Why a table stopped.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationReason {
    /// The winner placed its last tile.
    HandEmptied,
    /// Pool empty and every actor passed in a row.
    Blocked,
    /// The runaway guard fired.
    StepCeiling,
    /// The simulation failed to start and ended the table.
    Aborted,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::HandEmptied => "hand emptied",
            Self::Blocked => "blocked",
            Self::StepCeiling => "step ceiling reached",
            Self::Aborted => "aborted",
        };
        write!(f, "{reason}")
    }
}

/// Announced once when a table ends.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Outcome {
    pub winner: ActorId,
    pub reason: TerminationReason,
    pub steps: u64,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "actor {} wins ({}) after {} steps",
            self.winner, self.reason, self.steps
        )
    }
}

/// One applied turn as seen right after the authority released the lock.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TurnRecord {
    pub table: TableId,
    pub actor: ActorId,
    pub slot: u64,
    pub requested: ActionKind,
    pub applied: AppliedAction,
    /// Tiles left in the acting actor's hand.
    pub hand_units: usize,
    pub pool_units: usize,
    pub train_units: usize,
    /// Every tile on the table after the turn.
    pub total_units: usize,
    pub pass_streak: usize,
    pub steps: u64,
    pub outcome: Option<Outcome>,
}

impl TurnRecord {
    /// The proposal could not be honoured as asked.
    #[must_use]
    pub fn was_downgraded(&self) -> bool {
        matches!(self.requested, ActionKind::Play { .. }) && !self.applied.is_play()
    }
}

/// Read-only view of a table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableSnapshot {
    pub table: TableId,
    pub policy: Policy,
    pub quantum_ms: u64,
    pub cooldown_ms: u64,
    pub terminated: bool,
    pub turn: ActorId,
    pub slot: u64,
    pub steps: u64,
    pub max_steps: u64,
    pub pass_streak: usize,
    pub loads: Vec<ActorLoad>,
    pub pool_units: usize,
    pub train_units: usize,
    pub ends: (Pips, Pips),
    pub outcome: Option<Outcome>,
}

impl TableSnapshot {
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.loads.len()
    }

    #[must_use]
    pub fn total_units(&self) -> usize {
        self.loads.iter().map(|load| load.units).sum::<usize>() + self.pool_units + self.train_units
    }

    /// Largest minus smallest hand size.
    #[must_use]
    pub fn unit_gap(&self) -> usize {
        let max = self.loads.iter().map(|load| load.units).max().unwrap_or(0);
        let min = self.loads.iter().map(|load| load.units).min().unwrap_or(0);
        max - min
    }

    /// Largest minus smallest hand cost.
    #[must_use]
    pub fn cost_gap(&self) -> u32 {
        let max = self.loads.iter().map(|load| load.cost).max().unwrap_or(0);
        let min = self.loads.iter().map(|load| load.cost).min().unwrap_or(0);
        max - min
    }
}

impl fmt::Display for TableSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "table {} [{} q={}ms cd={}ms] slot {} turn {} steps {}/{} streak {} pool {} train {} ends {}|{}",
            self.table,
            self.policy,
            self.quantum_ms,
            self.cooldown_ms,
            self.slot,
            self.turn,
            self.steps,
            self.max_steps,
            self.pass_streak,
            self.pool_units,
            self.train_units,
            self.ends.0,
            self.ends.1,
        )?;
        for (actor, load) in self.loads.iter().enumerate() {
            write!(f, " a{actor}={}u/{}c", load.units, load.cost)?;
        }
        if let Some(outcome) = &self.outcome {
            write!(f, " :: {outcome}")?;
        }
        Ok(())
    }
}
