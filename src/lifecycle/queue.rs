//! Lifecycle event queue.
//!
//! Unbounded FIFO from any number of producers to exactly one consumer.
//! Producers never block; the consumer blocks until an event arrives.

use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;

/// A request for the lifecycle worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Re-read state. Accepted and ignored for now.
    Reload,
    /// Stop everything and exit.
    Shutdown,
}

/// Producer side plus the not-yet-claimed consumer side.
#[derive(Debug)]
pub struct LifecycleQueue {
    tx: mpsc::UnboundedSender<LifecycleEvent>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<LifecycleEvent>>>,
}

impl LifecycleQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Enqueue `event`. Never blocks.
    pub fn push(&self, event: LifecycleEvent) {
        if self.tx.send(event).is_err() {
            // Consumer dropped: the worker already ran its last event.
            tracing::trace!(?event, "Lifecycle event dropped, worker has finished");
        }
    }

    /// Claim the consumer side. Only the first call gets it.
    pub fn take_consumer(&self) -> Option<EventConsumer> {
        self.rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(|rx| EventConsumer { rx })
    }
}

impl Default for LifecycleQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// The single consumer of a [`LifecycleQueue`].
#[derive(Debug)]
pub struct EventConsumer {
    rx: mpsc::UnboundedReceiver<LifecycleEvent>,
}

impl EventConsumer {
    /// Block until the next event.
    ///
    /// Must not be called from inside an async runtime. Returns `None` only
    /// once the queue itself is gone.
    pub fn pop(&mut self) -> Option<LifecycleEvent> {
        self.rx.blocking_recv()
    }
}
