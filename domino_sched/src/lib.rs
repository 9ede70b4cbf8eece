//! # Domino Sched
//!
//! Multi-table domino simulator where every table is scheduled like a CPU:
//! seated actors are the processes and a pluggable policy decides who plays
//! next.
//!
//! ## Architecture
//!
//! Every table runs its own scheduler thread plus one thread per seat. All
//! tables share two services:
//!
//! - **Validating authority**: the single thread that applies proposed
//!   actions, in the order they arrive on the global action channel
//! - **Policy supervisor**: applies policy and quantum changes arriving on
//!   the policy change channel, from the operator or the auto-tuner
//!
//! Exactly one action is applied per scheduling slot. A table terminates
//! when a hand empties, when play is blocked, or at the step ceiling.
//!
//! ## Core Modules
//!
//! - [`game`]: Tiles, hands, pool, train, dealing and opening
//! - [`policy`]: FCFS, round-robin and the two shortest-job-first disciplines
//! - [`table`]: Table state, the turn protocol, seat actors and the scheduler
//! - [`channel`]: Growable blocking queues between threads
//! - [`authority`]: The validating authority
//! - [`tuning`]: Policy supervisor and auto-tuning heuristic
//! - [`simulation`]: Orchestration and the final report
//!
//! ## Example
//!
//! ```no_run
//! use domino_sched::{Simulation, SimulationConfig};
//!
//! let config = SimulationConfig {
//!     tables: 2,
//!     seed: Some(7),
//!     ..SimulationConfig::default()
//! };
//! let report = Simulation::new(config)?.run()?;
//! for table in &report.tables {
//!     println!("table {}: {:?}", table.table, table.outcome);
//! }
//! # Ok::<(), domino_sched::SimulationError>(())
//! ```

/// Action validation and application.
pub mod authority;

/// Blocking queues shared across tables.
pub mod channel;

/// Resource model.
pub mod game;

/// Scheduling disciplines.
pub mod policy;

/// Simulation orchestration.
pub mod simulation;

/// Observer hooks.
pub mod stats;

/// Tables and the turn protocol.
pub mod table;

/// Runtime policy reconfiguration.
pub mod tuning;

pub use authority::{AuthorityStats, Disposition, ValidatingAuthority};
pub use game::{ActorId, ActorLoad, TableId, Tile};
pub use policy::{Discipline, ParsePolicyError, Policy};
pub use simulation::{
    ControlError, ParseTargetError, Simulation, SimulationConfig, SimulationControl,
    SimulationError, SimulationHandle, SimulationReport, TableReport, Target,
};
pub use stats::{NoopSink, StatsSink, TurnLedger};
pub use table::{
    Outcome, PolicyChangeRequest, TableConfig, TableSnapshot, TerminationReason, TurnParams,
};
pub use tuning::HeuristicConfig;
