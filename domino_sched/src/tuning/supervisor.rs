//! Policy supervisor thread.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    channel::PolicyChangeChannel,
    stats::StatsSink,
    table::{PolicyChangeRequest, TableRegistry},
};

/// Counters reported when the supervisor stops.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SupervisorStats {
    pub applied: u64,
    /// Unknown table, terminated table, or nothing to change.
    pub ignored: u64,
}

/// Drains the policy change channel and applies each request to its table
/// under the table lock.
pub struct PolicySupervisor {
    registry: Arc<TableRegistry>,
    requests: Arc<PolicyChangeChannel>,
    sink: Arc<dyn StatsSink>,
}

impl PolicySupervisor {
    #[must_use]
    pub fn new(
        registry: Arc<TableRegistry>,
        requests: Arc<PolicyChangeChannel>,
        sink: Arc<dyn StatsSink>,
    ) -> Self {
        Self {
            registry,
            requests,
            sink,
        }
    }

    /// Runs until the channel stopped accepting requests, is drained, and
    /// every table terminated.
    pub fn run(self) -> SupervisorStats {
        let mut stats = SupervisorStats::default();
        while let Some(request) = self.requests.recv() {
            if self.apply(&request) {
                stats.applied += 1;
            } else {
                stats.ignored += 1;
            }
        }

        self.registry.wait_all_terminated();
        log::debug!(
            "policy supervisor stops: {} applied, {} ignored",
            stats.applied,
            stats.ignored
        );
        stats
    }

    /// Applies one request. Returns whether the table's parameters changed.
    pub fn apply(&self, request: &PolicyChangeRequest) -> bool {
        if request.is_empty() {
            return false;
        }
        let Some(table) = self.registry.get(request.table) else {
            log::warn!("policy change for unknown table {} ignored", request.table);
            return false;
        };

        let changed = table.update_params(|params| {
            let params = request.policy.map_or(params, |policy| params.with_policy(policy));
            request
                .quantum_ms
                .map_or(params, |quantum| params.with_quantum_ms(quantum))
        });

        match changed {
            Some((before, after)) if before != after => {
                log::info!(
                    "table {}: policy {} -> {}, quantum {}ms -> {}ms",
                    request.table,
                    before.policy,
                    after.policy,
                    before.quantum_ms,
                    after.quantum_ms
                );
                self.sink.policy_changed(request.table, before, after);
                true
            }
            Some(_) => false,
            None => {
                log::debug!(
                    "table {}: policy change after termination ignored",
                    request.table
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        channel::policy_change_channel,
        policy::{Policy, RoundRobin, SjfCost, SjfUnits},
        stats::TurnLedger,
        table::{TableConfig, TerminationReason, deal_table},
    };
    use rand::{SeedableRng, rngs::StdRng};
    use std::{thread, time::Duration};

    fn registry(tables: usize) -> Arc<TableRegistry> {
        let mut rng = StdRng::seed_from_u64(11);
        let tables = (0..tables)
            .map(|id| deal_table(id, &TableConfig::default(), &mut rng).unwrap())
            .collect();
        Arc::new(TableRegistry::new(tables))
    }

    #[test]
    fn test_apply_replaces_policy_and_quantum_together() {
        let registry = registry(1);
        let ledger = Arc::new(TurnLedger::new());
        let supervisor =
            PolicySupervisor::new(Arc::clone(&registry), Arc::new(policy_change_channel()), ledger.clone());

        let request = PolicyChangeRequest {
            table: 0,
            policy: Some(RoundRobin.into()),
            quantum_ms: Some(120),
        };
        assert!(supervisor.apply(&request));
        let params = registry.get(0).unwrap().params();
        assert_eq!(params.policy, Policy::from(RoundRobin));
        assert_eq!(params.quantum_ms, 120);

        // Same request again changes nothing.
        assert!(!supervisor.apply(&request));
        assert_eq!(ledger.params_changes().len(), 1);
    }

    #[test]
    fn test_apply_ignores_unknown_and_terminated_tables() {
        let registry = registry(1);
        let supervisor = PolicySupervisor::new(
            Arc::clone(&registry),
            Arc::new(policy_change_channel()),
            Arc::new(TurnLedger::new()),
        );

        assert!(!supervisor.apply(&PolicyChangeRequest::policy(4, SjfUnits.into())));

        registry.get(0).unwrap().lock().terminate(TerminationReason::StepCeiling);
        assert!(!supervisor.apply(&PolicyChangeRequest::policy(0, SjfUnits.into())));
        assert_eq!(registry.get(0).unwrap().params().policy, Policy::from(SjfCost));
    }

    #[test]
    fn test_supervisor_exits_after_close_and_termination() {
        let registry = registry(2);
        let requests = Arc::new(policy_change_channel());
        let supervisor = PolicySupervisor::new(
            Arc::clone(&registry),
            Arc::clone(&requests),
            Arc::new(TurnLedger::new()),
        );
        let handle = thread::spawn(move || supervisor.run());

        requests.push(PolicyChangeRequest::quantum(1, 50)).unwrap();
        requests.close();
        assert!(requests.push(PolicyChangeRequest::quantum(0, 60)).is_err());

        // Still waiting on live tables.
        thread::sleep(Duration::from_millis(30));
        assert!(!handle.is_finished());

        for table in registry.iter() {
            table.lock().terminate(TerminationReason::StepCeiling);
            table.broadcast();
        }

        let stats = handle.join().unwrap();
        assert_eq!(stats.applied, 1);
        assert_eq!(registry.get(1).unwrap().params().quantum_ms, 50);
        assert_eq!(registry.get(0).unwrap().params().quantum_ms, 200);
    }
}
