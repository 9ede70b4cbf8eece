//! Lock-protected state of one table.
//!
//! Every method here assumes the caller holds the table lock; the type
//! itself is plain data so it can be exercised without threads.

use crate::{
    game::{ActorId, Board, Opening, TableId, lowest_cost_actor},
    policy::Discipline,
};

use super::{
    config::{TableConfig, TurnParams},
    messages::{
        Action, ActionKind, AppliedAction, Outcome, TableSnapshot, TerminationReason, TurnRecord,
    },
};

/// Why the authority discarded a proposal without touching the table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StaleReason {
    Terminated,
    NotYourTurn { turn: ActorId },
    WrongSlot { open: u64 },
    AlreadyApplied,
}

/// Allocation state plus the turn bookkeeping of a table.
#[derive(Clone, Debug)]
pub struct TableState {
    id: TableId,
    board: Board,
    /// Actor holding the open (or last) slot.
    turn: ActorId,
    /// Incremented each time a slot is opened.
    slot: u64,
    /// The open slot has been consumed by the authority.
    turn_applied: bool,
    params: TurnParams,
    steps: u64,
    max_steps: u64,
    pass_streak: usize,
    outcome: Option<Outcome>,
}

impl TableState {
    /// Builds the state right after the opening tile was played and opens
    /// the first slot for the opener's successor.
    #[must_use]
    pub fn new(id: TableId, board: Board, opening: Opening, config: &TableConfig) -> Self {
        let actors = board.actor_count().max(1);
        Self {
            id,
            board,
            turn: (opening.actor + 1) % actors,
            slot: 1,
            turn_applied: false,
            params: config.params,
            steps: 0,
            max_steps: config.max_steps,
            pass_streak: 0,
            outcome: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> TableId {
        self.id
    }

    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.board.actor_count()
    }

    #[must_use]
    pub const fn turn(&self) -> ActorId {
        self.turn
    }

    #[must_use]
    pub const fn slot(&self) -> u64 {
        self.slot
    }

    #[must_use]
    pub const fn turn_applied(&self) -> bool {
        self.turn_applied
    }

    #[must_use]
    pub const fn params(&self) -> TurnParams {
        self.params
    }

    pub fn set_params(&mut self, params: TurnParams) {
        self.params = params;
    }

    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    #[must_use]
    pub const fn pass_streak(&self) -> usize {
        self.pass_streak
    }

    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        self.outcome.is_some()
    }

    /// `actor` holds the open slot and may propose.
    #[must_use]
    pub fn is_turn_open_for(&self, actor: ActorId) -> bool {
        !self.is_terminated() && !self.turn_applied && self.turn == actor
    }

    /// Consults the active policy and opens the next slot in the same step.
    /// Returns the scheduled actor and slot, or `None` once terminated.
    pub fn schedule_next(&mut self) -> Option<(ActorId, u64)> {
        if self.is_terminated() {
            return None;
        }

        let next = self.params.policy.next_actor(&self.board.loads(), self.turn);
        self.turn = next;
        self.slot += 1;
        self.turn_applied = false;
        Some((self.turn, self.slot))
    }

    /// The single action an actor proposes from what it sees now: the first
    /// legal play, otherwise a draw while the pool lasts, otherwise a pass.
    #[must_use]
    pub fn plan_action(&self, actor: ActorId) -> ActionKind {
        if let Some((index, side)) = self.board.find_play(actor) {
            ActionKind::Play { index, side }
        } else if self.board.pool().is_empty() {
            ActionKind::Pass
        } else {
            ActionKind::Draw
        }
    }

    /// Checks that `action` belongs to the open slot.
    pub fn check_current(&self, action: &Action) -> Result<(), StaleReason> {
        if self.is_terminated() {
            return Err(StaleReason::Terminated);
        }
        if action.slot != self.slot {
            return Err(StaleReason::WrongSlot { open: self.slot });
        }
        if action.actor != self.turn {
            return Err(StaleReason::NotYourTurn { turn: self.turn });
        }
        if self.turn_applied {
            return Err(StaleReason::AlreadyApplied);
        }
        Ok(())
    }

    /// Applies `action` if it is current, closes the slot and returns what
    /// happened. Illegal plays fall back to a draw, or a pass when the pool
    /// is empty.
    pub fn apply(&mut self, action: &Action) -> Result<TurnRecord, StaleReason> {
        self.check_current(action)?;
        let actor = action.actor;

        let applied = match action.kind {
            ActionKind::Play { index, side } => match self.board.play(actor, index, side) {
                Ok(tile) => {
                    self.pass_streak = 0;
                    AppliedAction::Played { tile, side }
                }
                Err(_) => self.draw_or_pass(actor),
            },
            ActionKind::Draw => self.draw_or_pass(actor),
            ActionKind::Pass => self.pass(),
        };

        self.steps += 1;

        if applied.is_play() && self.board.hand(actor).is_some_and(|hand| hand.is_empty()) {
            self.finish(actor, TerminationReason::HandEmptied);
        } else if !self.is_terminated()
            && self.board.pool().is_empty()
            && self.pass_streak >= self.actor_count()
        {
            self.finish_by_ranking(TerminationReason::Blocked);
        }

        if !self.is_terminated() && self.steps >= self.max_steps {
            self.finish_by_ranking(TerminationReason::StepCeiling);
        }

        self.turn_applied = true;

        Ok(TurnRecord {
            table: self.id,
            actor,
            slot: action.slot,
            requested: action.kind,
            applied,
            hand_units: self.board.hand(actor).map_or(0, |hand| hand.len()),
            pool_units: self.board.pool().len(),
            train_units: self.board.train().len(),
            total_units: self.board.unit_count(),
            pass_streak: self.pass_streak,
            steps: self.steps,
            outcome: self.outcome,
        })
    }

    fn draw_or_pass(&mut self, actor: ActorId) -> AppliedAction {
        match self.board.draw(actor) {
            Some(tile) => AppliedAction::Drew { tile },
            None => self.pass(),
        }
    }

    fn pass(&mut self) -> AppliedAction {
        self.pass_streak += 1;
        AppliedAction::Passed
    }

    fn finish(&mut self, winner: ActorId, reason: TerminationReason) {
        if self.outcome.is_none() {
            self.outcome = Some(Outcome {
                winner,
                reason,
                steps: self.steps,
            });
        }
    }

    /// Ends the table naming the lowest cost actor (fewer tiles, then lowest
    /// id on ties).
    fn finish_by_ranking(&mut self, reason: TerminationReason) {
        let winner = lowest_cost_actor(&self.board.loads()).unwrap_or(0);
        self.finish(winner, reason);
    }

    /// Forces termination from outside the turn protocol. Idempotent.
    pub fn terminate(&mut self, reason: TerminationReason) -> bool {
        if self.is_terminated() {
            return false;
        }
        self.finish_by_ranking(reason);
        true
    }

    #[must_use]
    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            table: self.id,
            policy: self.params.policy,
            quantum_ms: self.params.quantum_ms,
            cooldown_ms: self.params.cooldown_ms,
            terminated: self.is_terminated(),
            turn: self.turn,
            slot: self.slot,
            steps: self.steps,
            max_steps: self.max_steps,
            pass_streak: self.pass_streak,
            loads: self.board.loads(),
            pool_units: self.board.pool().len(),
            train_units: self.board.train().len(),
            ends: self.board.ends(),
            outcome: self.outcome,
        }
    }
}
