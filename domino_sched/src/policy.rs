//! Scheduling disciplines for picking the next actor at a table.
//!
//! Each discipline is a unit struct implementing [`Discipline`]; [`Policy`]
//! wraps them with `enum_dispatch` so the table scheduler calls
//! `policy.next_actor(..)` without a match on every turn.
//!
//! | policy     | next actor                                                   |
//! |------------|--------------------------------------------------------------|
//! | FCFS       | `(current + 1) mod n`                                        |
//! | RR         | same as FCFS while turns are one action long                 |
//! | SJF-UNITS  | fewest tiles, then lowest id                                 |
//! | SJF-COST   | lowest pip cost, then fewest tiles, then lowest id           |
//!
//! All disciplines are total: an empty load list returns `current`.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

use crate::game::{
    ActorId, ActorLoad,
    constants::{DEFAULT_QUANTUM_MS, ROUND_ROBIN_QUANTUM_MS},
    fewest_units_actor, lowest_cost_actor,
};

#[enum_dispatch]
pub trait Discipline {
    /// Picks the actor scheduled after `current`, given every actor's load.
    fn next_actor(&self, loads: &[ActorLoad], current: ActorId) -> ActorId;
}

fn cyclic_successor(actors: usize, current: ActorId) -> ActorId {
    if actors == 0 {
        current
    } else {
        (current + 1) % actors
    }
}

/// First-come-first-served: fixed cyclic seat order.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Fcfs;

impl Discipline for Fcfs {
    fn next_actor(&self, loads: &[ActorLoad], current: ActorId) -> ActorId {
        cyclic_successor(loads.len(), current)
    }
}

/// Round-robin. The quantum is reserved for multi-action turns; with one
/// action per turn this is the same cycle as FCFS.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct RoundRobin;

impl Discipline for RoundRobin {
    fn next_actor(&self, loads: &[ActorLoad], current: ActorId) -> ActorId {
        cyclic_successor(loads.len(), current)
    }
}

/// Shortest job first by remaining tile count.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct SjfUnits;

impl Discipline for SjfUnits {
    fn next_actor(&self, loads: &[ActorLoad], current: ActorId) -> ActorId {
        fewest_units_actor(loads).unwrap_or(current)
    }
}

/// Shortest job first by remaining pip cost.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct SjfCost;

impl Discipline for SjfCost {
    fn next_actor(&self, loads: &[ActorLoad], current: ActorId) -> ActorId {
        lowest_cost_actor(loads).unwrap_or(current)
    }
}

/// The active scheduling policy of a table.
#[enum_dispatch(Discipline)]
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(into = "String", try_from = "String")]
pub enum Policy {
    Fcfs(Fcfs),
    RoundRobin(RoundRobin),
    SjfUnits(SjfUnits),
    SjfCost(SjfCost),
}

impl Policy {
    pub const ALL: [Policy; 4] = [
        Policy::Fcfs(Fcfs),
        Policy::RoundRobin(RoundRobin),
        Policy::SjfUnits(SjfUnits),
        Policy::SjfCost(SjfCost),
    ];

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Fcfs(_) => "FCFS",
            Self::RoundRobin(_) => "RR",
            Self::SjfUnits(_) => "SJF-UNITS",
            Self::SjfCost(_) => "SJF-COST",
        }
    }

    #[must_use]
    pub const fn is_round_robin(&self) -> bool {
        matches!(self, Self::RoundRobin(_))
    }

    /// Quantum the auto-tuner pairs with this policy.
    #[must_use]
    pub const fn default_quantum_ms(&self) -> u64 {
        if self.is_round_robin() {
            ROUND_ROBIN_QUANTUM_MS
        } else {
            DEFAULT_QUANTUM_MS
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::Fcfs(Fcfs)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown policy '{0}' (expected fcfs, rr, sjf-units or sjf-cost)")]
pub struct ParsePolicyError(pub String);

impl FromStr for Policy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "fcfs" => Ok(Fcfs.into()),
            "rr" | "round-robin" => Ok(RoundRobin.into()),
            "sjf-units" | "sjf-players" => Ok(SjfUnits.into()),
            "sjf-cost" | "sjf-points" => Ok(SjfCost.into()),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

impl From<Policy> for String {
    fn from(policy: Policy) -> Self {
        policy.name().to_string()
    }
}

impl TryFrom<String> for Policy {
    type Error = ParsePolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
