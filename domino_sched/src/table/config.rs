//! Table configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::{
    game::constants::{
        DEFAULT_COOLDOWN_MS, DEFAULT_MAX_STEPS, DEFAULT_QUANTUM_MS, MAX_ACTORS, MIN_ACTORS,
    },
    policy::{Policy, SjfCost},
};

/// Scheduling parameters of a table.
///
/// Policy, quantum and cooldown are always replaced together under the
/// table lock, so a scheduling decision never sees half of an update.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TurnParams {
    /// Active scheduling policy
    pub policy: Policy,

    /// Reserved for multi-action turns; reported and settable only
    pub quantum_ms: u64,

    /// Delay an actor observes after being scheduled and before proposing
    pub cooldown_ms: u64,
}

impl Default for TurnParams {
    fn default() -> Self {
        Self {
            policy: SjfCost.into(),
            quantum_ms: DEFAULT_QUANTUM_MS,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
        }
    }
}

impl TurnParams {
    #[must_use]
    pub const fn with_policy(self, policy: Policy) -> Self {
        Self { policy, ..self }
    }

    #[must_use]
    pub const fn with_quantum_ms(self, quantum_ms: u64) -> Self {
        Self { quantum_ms, ..self }
    }

    #[must_use]
    pub const fn with_cooldown_ms(self, cooldown_ms: u64) -> Self {
        Self {
            cooldown_ms,
            ..self
        }
    }

    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Table configuration errors
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TableConfigError {
    #[error("actor count must be between {MIN_ACTORS} and {MAX_ACTORS}, got {0}")]
    ActorCount(usize),

    #[error("step ceiling must be greater than 0")]
    ZeroStepCeiling,

    #[error("dealt hands hold no tiles to open with")]
    NoOpeningTile,
}

/// Table configuration
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableConfig {
    /// Number of seated actors (2..=4)
    pub actor_count: usize,

    /// Applied actions before the table is force-terminated
    pub max_steps: u64,

    /// Initial scheduling parameters
    pub params: TurnParams,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            actor_count: MIN_ACTORS,
            max_steps: DEFAULT_MAX_STEPS,
            params: TurnParams::default(),
        }
    }
}

impl TableConfig {
    #[must_use]
    pub fn new(actor_count: usize, params: TurnParams) -> Self {
        Self {
            actor_count,
            params,
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), TableConfigError> {
        if !(MIN_ACTORS..=MAX_ACTORS).contains(&self.actor_count) {
            return Err(TableConfigError::ActorCount(self.actor_count));
        }

        if self.max_steps == 0 {
            return Err(TableConfigError::ZeroStepCeiling);
        }

        Ok(())
    }
}
