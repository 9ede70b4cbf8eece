//! Coordination channels shared across tables.
//!
//! - [`ActionChannel`]: every seat actor of every table pushes its proposed
//!   action here; the validating authority is the only consumer.
//! - [`PolicyChangeChannel`]: operator and auto-tuner requests, drained by
//!   the policy supervisor. Closing it is the "stop accepting" transition.
//!
//! Neither channel is tied to a table lock.

pub mod errors;
pub mod queue;

pub use errors::{ChannelError, ChannelResult};
pub use queue::{GrowableQueue, PushOutcome};

use crate::table::messages::{Action, PolicyChangeRequest};

/// Initial capacity of the global action channel.
pub const ACTION_CHANNEL_CAPACITY: usize = 1024;

/// Initial capacity of the policy change channel.
pub const POLICY_CHANNEL_CAPACITY: usize = 32;

/// Proposed actions from every table, in arrival order.
pub type ActionChannel = GrowableQueue<Action>;

/// Pending policy/quantum changes.
pub type PolicyChangeChannel = GrowableQueue<PolicyChangeRequest>;

#[must_use]
pub fn action_channel() -> ActionChannel {
    GrowableQueue::with_capacity(ACTION_CHANNEL_CAPACITY)
}

#[must_use]
pub fn policy_change_channel() -> PolicyChangeChannel {
    GrowableQueue::with_capacity(POLICY_CHANNEL_CAPACITY)
}
