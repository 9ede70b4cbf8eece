//! Runtime policy reconfiguration.
//!
//! Requests travel through the policy change channel and are applied by the
//! [`PolicySupervisor`]. The [`AutoTuner`] is one producer, the operator is
//! the other.

pub mod heuristic;
pub mod supervisor;
pub mod tuner;

pub use heuristic::HeuristicConfig;
pub use supervisor::{PolicySupervisor, SupervisorStats};
pub use tuner::{AutoTuner, DEFAULT_TUNE_INTERVAL, TunerStats};
