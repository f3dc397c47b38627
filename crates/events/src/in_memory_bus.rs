//! Channel-backed bus for tests and single-process runs.

use std::sync::{Mutex, MutexGuard, mpsc};

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InMemoryBusError {
    #[error("event bus lock poisoned")]
    Poisoned,
}

type Senders<M> = Vec<mpsc::Sender<M>>;

/// Fan-out over `std::sync::mpsc` channels, one sender per live subscription.
///
/// Publishing is synchronous and never blocks on a slow consumer. A sender whose
/// receiver is gone is dropped the first time a send to it fails.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    senders: Mutex<Senders<M>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Senders still registered. Dropped subscriptions count until the next publish.
    pub fn subscriber_count(&self) -> Result<usize, InMemoryBusError> {
        Ok(self.senders()?.len())
    }

    fn senders(&self) -> Result<MutexGuard<'_, Senders<M>>, InMemoryBusError> {
        self.senders.lock().map_err(|_| InMemoryBusError::Poisoned)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        self.senders()?.retain(|tx| tx.send(message.clone()).is_ok());
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        // Poisoned: the sender is dropped here, so the subscription reports disconnected.
        if let Ok(mut senders) = self.senders() {
            senders.push(tx);
        }
        Subscription::from(rx)
    }
}
