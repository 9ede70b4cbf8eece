//! Periodic auto-tuner.

use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

use crate::{
    channel::PolicyChangeChannel,
    stats::StatsSink,
    table::{PolicyChangeRequest, Table, TableRegistry},
};

use super::heuristic::HeuristicConfig;

/// Default pause between evaluation passes.
pub const DEFAULT_TUNE_INTERVAL: Duration = Duration::from_millis(100);

/// Counters reported when the tuner stops.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct TunerStats {
    pub passes: u64,
    pub policy_requests: u64,
    pub cooldown_changes: u64,
}

/// Inspects every live table each interval, enqueues policy changes and
/// adjusts cooldowns directly.
pub struct AutoTuner {
    registry: Arc<TableRegistry>,
    requests: Arc<PolicyChangeChannel>,
    sink: Arc<dyn StatsSink>,
    heuristic: HeuristicConfig,
    interval: Duration,
}

impl AutoTuner {
    #[must_use]
    pub fn new(
        registry: Arc<TableRegistry>,
        requests: Arc<PolicyChangeChannel>,
        sink: Arc<dyn StatsSink>,
        heuristic: HeuristicConfig,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            requests,
            sink,
            heuristic,
            interval,
        }
    }

    /// Runs until every table terminated or the request channel closed.
    pub fn run(self) -> TunerStats {
        let mut stats = TunerStats::default();

        loop {
            let Some(live) = self.registry.iter().find(|table| !table.is_terminated()) else {
                break;
            };
            if !self.evaluate_pass(&mut stats) {
                break;
            }
            // Sleeps for the interval, waking early if that table ends.
            live.wait_terminated_timeout(self.interval);
        }

        log::debug!(
            "auto-tuner stops after {} passes: {} policy requests, {} cooldown changes",
            stats.passes,
            stats.policy_requests,
            stats.cooldown_changes
        );
        stats
    }

    /// Evaluates every live table once. Returns `false` once the request
    /// channel no longer accepts requests.
    pub fn evaluate_pass(&self, stats: &mut TunerStats) -> bool {
        stats.passes += 1;
        for table in self.registry.iter() {
            if !self.tune_table(table, stats) {
                return false;
            }
        }
        true
    }

    fn tune_table(&self, table: &Table, stats: &mut TunerStats) -> bool {
        let snapshot = table.snapshot();
        if snapshot.terminated {
            return true;
        }

        if let Some(policy) = self.heuristic.evaluate(&snapshot) {
            let request = PolicyChangeRequest {
                table: snapshot.table,
                policy: Some(policy),
                quantum_ms: Some(policy.default_quantum_ms()),
            };
            if self.requests.push(request).is_err() {
                log::debug!("auto-tuner: policy channel closed");
                return false;
            }
            log::debug!(
                "table {}: auto-tuner requests {} -> {} (unit gap {}, cost gap {}, streak {})",
                snapshot.table,
                snapshot.policy,
                policy,
                snapshot.unit_gap(),
                snapshot.cost_gap(),
                snapshot.pass_streak
            );
            stats.policy_requests += 1;
        }

        let cooldown = self.heuristic.desired_cooldown_ms(&snapshot);
        if cooldown != snapshot.cooldown_ms {
            let changed = table.update_params(|params| params.with_cooldown_ms(cooldown));
            if let Some((before, after)) = changed.filter(|(before, after)| before != after) {
                log::info!(
                    "table {}: cooldown {}ms -> {}ms",
                    snapshot.table,
                    before.cooldown_ms,
                    after.cooldown_ms
                );
                self.sink.policy_changed(snapshot.table, before, after);
                stats.cooldown_changes += 1;
            }
        }

        true
    }
}
