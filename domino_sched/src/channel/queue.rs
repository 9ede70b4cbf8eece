//! Closable FIFO over a `crossbeam_channel`, reporting when it outgrows its
//! nominal capacity instead of rejecting a push.

use crossbeam_channel::{Receiver, Sender};
use std::{
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use super::errors::{ChannelError, ChannelResult};

/// Result of a successful push.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PushOutcome {
    Enqueued,
    /// The queue was full and doubled to the given capacity first.
    GrewTo { capacity: usize },
}

/// Multi-producer FIFO with blocking receive and an explicit close.
///
/// Pushing onto a full queue doubles its capacity; order is preserved.
/// After [`GrowableQueue::close`], pushes fail and receivers drain what is
/// left before seeing end-of-stream.
#[derive(Debug)]
pub struct GrowableQueue<T> {
    /// `None` once closed. Dropping the only sender disconnects the channel.
    sender: RwLock<Option<Sender<T>>>,
    receiver: Receiver<T>,
    capacity: AtomicUsize,
}

impl<T> GrowableQueue<T> {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender: RwLock::new(Some(sender)),
            receiver,
            capacity: AtomicUsize::new(capacity.max(1)),
        }
    }

    /// Appends `item`, growing the queue if it is full.
    pub fn push(&self, item: T) -> ChannelResult<PushOutcome> {
        let guard = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        let sender = guard.as_ref().ok_or(ChannelError::Closed)?;

        let len = sender.len();
        let grown = self
            .capacity
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cap| {
                (len >= cap).then(|| cap.saturating_mul(2))
            });
        let outcome = match grown {
            Ok(previous) => PushOutcome::GrewTo {
                capacity: previous.saturating_mul(2),
            },
            Err(_) => PushOutcome::Enqueued,
        };

        sender.send(item).map_err(|_| ChannelError::Closed)?;
        Ok(outcome)
    }

    /// Pops the oldest item without blocking.
    pub fn try_recv(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Blocks until an item is available. Returns `None` once the queue is
    /// closed and drained.
    pub fn recv(&self) -> Option<T> {
        self.receiver.recv().ok()
    }

    /// Like [`GrowableQueue::recv`] but gives up after `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Stops accepting pushes and wakes every blocked receiver.
    ///
    /// Waits for pushes already in progress, so nothing they sent is lost.
    pub fn close(&self) {
        self.sender
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Logical capacity; doubles whenever a push finds the queue full.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Acquire)
    }
}
