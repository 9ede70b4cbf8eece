//! Channel error types.

use thiserror::Error;

/// Errors returned by a [`GrowableQueue`](super::GrowableQueue).
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum ChannelError {
    /// The channel stopped accepting new items.
    #[error("channel is closed")]
    Closed,
}

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;
