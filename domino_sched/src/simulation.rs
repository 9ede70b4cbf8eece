//! Simulation orchestrator: builds the tables, starts every thread and
//! joins them into a report.
//!
//! ## Shutdown order
//!
//! 1. Table threads exit once their table terminates.
//! 2. The action channel is closed; the authority drains it and stops.
//! 3. The auto-tuner stops on its own once every table terminated.
//! 4. The policy change channel stops accepting requests; the supervisor
//!    drains it and stops.
//!
//! A start that fails partway ends every table as aborted and runs the same
//! order over whatever was already spawned.

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    str::FromStr,
    sync::Arc,
    thread::JoinHandle,
    time::{Duration, Instant},
};
use thiserror::Error;

use crate::{
    authority::{AuthorityStats, ValidatingAuthority},
    channel::{ActionChannel, PolicyChangeChannel, action_channel, policy_change_channel},
    game::{
        TableId,
        constants::{DEFAULT_MAX_STEPS, MAX_ACTORS, MIN_ACTORS},
    },
    policy::Policy,
    stats::{NoopSink, StatsSink},
    table::{
        Outcome, PolicyChangeRequest, TableConfig, TableConfigError, TableRegistry, TableRun,
        TableSnapshot, TableThreadError, TableThreads, TerminationReason, TurnParams, deal_table,
        manager::spawn_named,
    },
    tuning::{
        AutoTuner, DEFAULT_TUNE_INTERVAL, HeuristicConfig, PolicySupervisor, SupervisorStats,
        TunerStats,
    },
};

/// Simulation errors
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("at least one table is required")]
    NoTables,

    #[error("invalid table configuration: {0}")]
    Table(#[from] TableConfigError),

    #[error(transparent)]
    Thread(#[from] TableThreadError),
}

/// Errors from operator controls on a running simulation
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ControlError {
    #[error("unknown table {0}")]
    UnknownTable(TableId),

    #[error("table {0} already finished")]
    TableFinished(TableId),

    #[error("policy changes are no longer accepted")]
    Closed,
}

/// Which tables an operator command addresses.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Target {
    #[default]
    All,
    Table(TableId),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Table(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("invalid table '{0}' (expected a table number or 'all')")]
pub struct ParseTargetError(pub String);

impl FromStr for Target {
    type Err = ParseTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") || s == "*" {
            return Ok(Self::All);
        }
        s.parse()
            .map(Self::Table)
            .map_err(|_| ParseTargetError(s.to_string()))
    }
}

/// Simulation configuration
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SimulationConfig {
    /// Number of independent tables
    pub tables: usize,

    /// Actors per table; picked at random per table (2..=4) when `None`
    pub actors: Option<usize>,

    /// Seed for dealing and actor counts; random when `None`
    pub seed: Option<u64>,

    /// Initial scheduling parameters of every table
    pub params: TurnParams,

    /// Step ceiling of every table
    pub max_steps: u64,

    /// Run the auto-tuner
    pub auto_tune: bool,

    /// Auto-tuner thresholds
    pub heuristic: HeuristicConfig,

    /// Pause between auto-tuner passes
    pub tune_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tables: 3,
            actors: None,
            seed: None,
            params: TurnParams::default(),
            max_steps: DEFAULT_MAX_STEPS,
            auto_tune: true,
            heuristic: HeuristicConfig::default(),
            tune_interval_ms: DEFAULT_TUNE_INTERVAL.as_millis() as u64,
        }
    }
}

impl SimulationConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.tables == 0 {
            return Err(SimulationError::NoTables);
        }
        let probe = TableConfig {
            actor_count: self.actors.unwrap_or(MIN_ACTORS),
            max_steps: self.max_steps,
            params: self.params,
        };
        probe.validate()?;
        Ok(())
    }

    /// Configuration of one table, drawing the actor count if not fixed.
    pub fn table_config<R: Rng + ?Sized>(&self, rng: &mut R) -> TableConfig {
        TableConfig {
            actor_count: self
                .actors
                .unwrap_or_else(|| rng.random_range(MIN_ACTORS..=MAX_ACTORS)),
            max_steps: self.max_steps,
            params: self.params,
        }
    }

    #[must_use]
    pub const fn tune_interval(&self) -> Duration {
        Duration::from_millis(self.tune_interval_ms)
    }
}

/// Tables dealt and ready to start.
pub struct Simulation {
    config: SimulationConfig,
    registry: Arc<TableRegistry>,
    sink: Arc<dyn StatsSink>,
}

impl Simulation {
    /// Deals every table without a stats sink.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        Self::with_sink(config, Arc::new(NoopSink))
    }

    /// Deals every table, reporting events to `sink` once started.
    pub fn with_sink(
        config: SimulationConfig,
        sink: Arc<dyn StatsSink>,
    ) -> Result<Self, SimulationError> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let tables = (0..config.tables)
            .map(|id| deal_table(id, &config.table_config(&mut rng), &mut rng))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            registry: Arc::new(TableRegistry::new(tables)),
            sink,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<TableRegistry> {
        &self.registry
    }

    /// Starts the authority, the supervisor, the tuner and every table.
    pub fn start(self) -> Result<SimulationHandle, SimulationError> {
        let actions = Arc::new(action_channel());
        let requests = Arc::new(policy_change_channel());

        log::info!(
            "starting {} tables: policy {}, quantum {}ms, cooldown {}ms, step ceiling {}, auto-tune {}",
            self.registry.len(),
            self.config.params.policy,
            self.config.params.quantum_ms,
            self.config.params.cooldown_ms,
            self.config.max_steps,
            if self.config.auto_tune { "on" } else { "off" }
        );

        let authority = ValidatingAuthority::new(
            Arc::clone(&self.registry),
            Arc::clone(&actions),
            Arc::clone(&self.sink),
        );
        let authority = spawn_named("authority".to_string(), move || authority.run())?;

        let supervisor = PolicySupervisor::new(
            Arc::clone(&self.registry),
            Arc::clone(&requests),
            Arc::clone(&self.sink),
        );
        let supervisor = match spawn_named("policy-supervisor".to_string(), move || supervisor.run())
        {
            Ok(supervisor) => supervisor,
            Err(err) => {
                log::error!("simulation failed to start: {err}");
                abort_start(&self.registry, &actions, &requests, Vec::new(), authority, None);
                return Err(err.into());
            }
        };

        let mut tables = Vec::with_capacity(self.registry.len());
        let tuner = match self.spawn_workers(&actions, &requests, &mut tables) {
            Ok(tuner) => tuner,
            Err(err) => {
                log::error!("simulation failed to start: {err}");
                abort_start(
                    &self.registry,
                    &actions,
                    &requests,
                    tables,
                    authority,
                    Some(supervisor),
                );
                return Err(err.into());
            }
        };

        Ok(SimulationHandle {
            control: SimulationControl {
                registry: self.registry,
                sink: self.sink,
                requests,
            },
            actions,
            tables,
            authority,
            supervisor,
            tuner,
            started: Instant::now(),
        })
    }

    /// Spawns the table threads into `tables`, then the auto-tuner when
    /// enabled. On error `tables` holds whatever was already running.
    fn spawn_workers(
        &self,
        actions: &Arc<ActionChannel>,
        requests: &Arc<PolicyChangeChannel>,
        tables: &mut Vec<TableThreads>,
    ) -> Result<Option<JoinHandle<TunerStats>>, TableThreadError> {
        for table in self.registry.iter() {
            tables.push(TableThreads::spawn(table, actions, &self.sink)?);
        }

        if !self.config.auto_tune {
            return Ok(None);
        }
        let tuner = AutoTuner::new(
            Arc::clone(&self.registry),
            Arc::clone(requests),
            Arc::clone(&self.sink),
            self.config.heuristic,
            self.config.tune_interval(),
        );
        spawn_named("auto-tuner".to_string(), move || tuner.run()).map(Some)
    }

    /// Starts the simulation and waits for every table to finish.
    pub fn run(self) -> Result<SimulationReport, SimulationError> {
        self.start()?.wait()
    }
}

/// Final state of one table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableReport {
    pub table: TableId,
    pub outcome: Option<Outcome>,
    pub proposals: u64,
    pub snapshot: TableSnapshot,
}

/// Everything a finished simulation reports.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SimulationReport {
    pub tables: Vec<TableReport>,
    pub authority: AuthorityStats,
    pub supervisor: SupervisorStats,
    pub tuner: Option<TunerStats>,
    pub elapsed_ms: u64,
}

impl SimulationReport {
    #[must_use]
    pub fn outcome(&self, table: TableId) -> Option<Outcome> {
        self.tables
            .iter()
            .find(|report| report.table == table)
            .and_then(|report| report.outcome)
    }
}

/// Operator controls of a running simulation. Cheap to clone, so a console
/// thread can keep one while the owner of the [`SimulationHandle`] waits.
#[derive(Clone)]
pub struct SimulationControl {
    registry: Arc<TableRegistry>,
    sink: Arc<dyn StatsSink>,
    requests: Arc<PolicyChangeChannel>,
}

impl SimulationControl {
    #[must_use]
    pub fn registry(&self) -> &Arc<TableRegistry> {
        &self.registry
    }

    fn targets(&self, target: Target) -> Result<Vec<TableId>, ControlError> {
        match target {
            Target::All => Ok(self.registry.iter().map(|table| table.id()).collect()),
            Target::Table(id) => self
                .registry
                .get(id)
                .map(|_| vec![id])
                .ok_or(ControlError::UnknownTable(id)),
        }
    }

    fn enqueue(&self, requests: Vec<PolicyChangeRequest>) -> Result<usize, ControlError> {
        let count = requests.len();
        for request in requests {
            self.requests.push(request).map_err(|_| ControlError::Closed)?;
        }
        Ok(count)
    }

    /// Enqueues a policy change. Returns how many requests were queued.
    pub fn request_policy(&self, target: Target, policy: Policy) -> Result<usize, ControlError> {
        let requests = self
            .targets(target)?
            .into_iter()
            .map(|table| PolicyChangeRequest::policy(table, policy))
            .collect();
        self.enqueue(requests)
    }

    /// Enqueues a quantum change. Returns how many requests were queued.
    pub fn request_quantum(&self, target: Target, quantum_ms: u64) -> Result<usize, ControlError> {
        let requests = self
            .targets(target)?
            .into_iter()
            .map(|table| PolicyChangeRequest::quantum(table, quantum_ms))
            .collect();
        self.enqueue(requests)
    }

    /// Writes the cooldown straight into the addressed tables. Returns how
    /// many tables were updated; finished tables are skipped.
    pub fn set_cooldown(&self, target: Target, cooldown_ms: u64) -> Result<usize, ControlError> {
        let mut updated = 0;
        for id in self.targets(target)? {
            let Some(table) = self.registry.get(id) else {
                continue;
            };
            match table.update_params(|params| params.with_cooldown_ms(cooldown_ms)) {
                Some((before, after)) => {
                    if before != after {
                        log::info!(
                            "table {}: cooldown {}ms -> {}ms",
                            id,
                            before.cooldown_ms,
                            after.cooldown_ms
                        );
                        self.sink.policy_changed(id, before, after);
                    }
                    updated += 1;
                }
                None if target == Target::Table(id) => {
                    return Err(ControlError::TableFinished(id));
                }
                None => {}
            }
        }
        Ok(updated)
    }

    pub fn snapshot(&self, table: TableId) -> Result<TableSnapshot, ControlError> {
        self.registry
            .get(table)
            .map(|table| table.snapshot())
            .ok_or(ControlError::UnknownTable(table))
    }

    #[must_use]
    pub fn snapshots(&self) -> Vec<TableSnapshot> {
        self.registry.snapshots()
    }

    /// Stops accepting policy and quantum requests.
    pub fn stop_policy_requests(&self) {
        self.requests.close();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.registry.all_terminated()
    }
}

/// A running simulation.
pub struct SimulationHandle {
    control: SimulationControl,
    actions: Arc<ActionChannel>,
    tables: Vec<TableThreads>,
    authority: JoinHandle<AuthorityStats>,
    supervisor: JoinHandle<SupervisorStats>,
    tuner: Option<JoinHandle<TunerStats>>,
    started: Instant,
}

impl SimulationHandle {
    /// A detached copy of the operator controls.
    #[must_use]
    pub fn control(&self) -> SimulationControl {
        self.control.clone()
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<TableRegistry> {
        self.control.registry()
    }

    pub fn request_policy(&self, target: Target, policy: Policy) -> Result<usize, ControlError> {
        self.control.request_policy(target, policy)
    }

    pub fn request_quantum(&self, target: Target, quantum_ms: u64) -> Result<usize, ControlError> {
        self.control.request_quantum(target, quantum_ms)
    }

    pub fn set_cooldown(&self, target: Target, cooldown_ms: u64) -> Result<usize, ControlError> {
        self.control.set_cooldown(target, cooldown_ms)
    }

    pub fn snapshot(&self, table: TableId) -> Result<TableSnapshot, ControlError> {
        self.control.snapshot(table)
    }

    #[must_use]
    pub fn snapshots(&self) -> Vec<TableSnapshot> {
        self.control.snapshots()
    }

    pub fn stop_policy_requests(&self) {
        self.control.stop_policy_requests();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.control.is_finished()
    }

    /// Waits for every table, then shuts the services down in order.
    pub fn wait(self) -> Result<SimulationReport, SimulationError> {
        let runs: Vec<Result<TableRun, TableThreadError>> =
            self.tables.into_iter().map(TableThreads::join).collect();

        // Every table thread exited: nothing pushes actions any more.
        self.actions.close();
        let authority = self.authority.join();

        let tuner = self.tuner.map(JoinHandle::join).transpose();

        self.control.requests.close();
        let supervisor = self.supervisor.join();

        let runs = runs.into_iter().collect::<Result<Vec<_>, _>>()?;
        let authority =
            authority.map_err(|_| TableThreadError::Panicked("authority".to_string()))?;
        let tuner = tuner.map_err(|_| TableThreadError::Panicked("auto-tuner".to_string()))?;
        let supervisor =
            supervisor.map_err(|_| TableThreadError::Panicked("policy-supervisor".to_string()))?;

        let tables = runs
            .into_iter()
            .filter_map(|run| {
                let snapshot = self.control.registry.get(run.table)?.snapshot();
                Some(TableReport {
                    table: run.table,
                    outcome: run.outcome,
                    proposals: run.proposals,
                    snapshot,
                })
            })
            .collect();

        let report = SimulationReport {
            tables,
            authority,
            supervisor,
            tuner,
            elapsed_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        log::info!(
            "simulation finished in {}ms: {} actions applied, {} stale, {} policy changes",
            report.elapsed_ms,
            report.authority.applied,
            report.authority.stale,
            report.supervisor.applied
        );
        Ok(report)
    }
}

/// Unwinds a partial start: ends every table, joins the threads that were
/// spawned and closes both channels so the services drain and exit.
fn abort_start(
    registry: &TableRegistry,
    actions: &ActionChannel,
    requests: &PolicyChangeChannel,
    tables: Vec<TableThreads>,
    authority: JoinHandle<AuthorityStats>,
    supervisor: Option<JoinHandle<SupervisorStats>>,
) {
    for table in registry.iter() {
        table.lock().terminate(TerminationReason::Aborted);
        table.broadcast();
    }
    for threads in tables {
        if let Err(err) = threads.join() {
            log::warn!("while aborting start: {err}");
        }
    }

    actions.close();
    requests.close();
    if authority.join().is_err() {
        log::warn!("while aborting start: authority panicked");
    }
    if supervisor.is_some_and(|supervisor| supervisor.join().is_err()) {
        log::warn!("while aborting start: policy supervisor panicked");
    }
}
