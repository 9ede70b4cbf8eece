//! Imbalance heuristic driving automatic policy changes.

use serde::{Deserialize, Serialize};

use crate::{
    policy::{Fcfs, Policy, RoundRobin, SjfCost, SjfUnits},
    table::TableSnapshot,
};

/// Thresholds of the auto-tuning heuristic.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HeuristicConfig {
    /// Hand size spread that calls for SJF-UNITS.
    pub unit_gap: usize,
    /// Hand cost spread that calls for SJF-COST.
    pub cost_gap: u32,
    /// Spreads at or below these count as balanced and fall back to FCFS.
    pub balanced_unit_gap: usize,
    pub balanced_cost_gap: u32,
    /// Cooldown applied while every actor keeps passing.
    pub congested_cooldown_ms: u64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            unit_gap: 3,
            cost_gap: 12,
            balanced_unit_gap: 1,
            balanced_cost_gap: 6,
            congested_cooldown_ms: 75,
        }
    }
}

impl HeuristicConfig {
    /// Proposes at most one policy change for a live table. First matching
    /// rule wins; a proposal always differs from the active policy.
    #[must_use]
    pub fn evaluate(&self, snapshot: &TableSnapshot) -> Option<Policy> {
        if snapshot.terminated || snapshot.loads.is_empty() {
            return None;
        }

        let current = snapshot.policy;
        let unit_gap = snapshot.unit_gap();
        let cost_gap = snapshot.cost_gap();
        let streak = snapshot.pass_streak;
        let stalled = streak >= snapshot.actor_count();

        let is = |policy: Policy| current == policy;
        let rr = Policy::from(RoundRobin);
        let units = Policy::from(SjfUnits);
        let cost = Policy::from(SjfCost);
        let fcfs = Policy::from(Fcfs);

        let proposal = if stalled && !is(rr) {
            Some(rr)
        } else if unit_gap >= self.unit_gap && !is(units) {
            Some(units)
        } else if cost_gap >= self.cost_gap && !is(cost) {
            Some(cost)
        } else if is(cost) && unit_gap >= self.unit_gap {
            Some(units)
        } else if is(units) && cost_gap >= self.cost_gap {
            Some(cost)
        } else if !is(fcfs)
            && unit_gap <= self.balanced_unit_gap
            && cost_gap <= self.balanced_cost_gap
            && streak == 0
        {
            Some(fcfs)
        } else if is(rr) && streak == 0 && unit_gap >= self.unit_gap {
            Some(units)
        } else {
            None
        };

        proposal.filter(|policy| *policy != current)
    }

    /// Cooldown the table should run with right now.
    #[must_use]
    pub fn desired_cooldown_ms(&self, snapshot: &TableSnapshot) -> u64 {
        if snapshot.pass_streak >= snapshot.actor_count() {
            self.congested_cooldown_ms
        } else {
            0
        }
    }
}
