//! Pub/sub contract for committed domain events.
//!
//! Delivery is at-least-once and the bus keeps nothing: the event store is the source of
//! truth. Events are stored first and published second, so a failed publication never
//! loses an event; it can be republished from the store.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// Receiving end of [`EventBus::subscribe`].
///
/// Every subscription gets its own copy of each message published after it was created.
/// Iterating blocks on each item and ends once the bus side has gone away.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> From<Receiver<M>> for Subscription<M> {
    fn from(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }
}

impl<M> Subscription<M> {
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything already queued, without waiting for more.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

impl<M> Iterator for Subscription<M> {
    type Item = M;

    fn next(&mut self) -> Option<M> {
        self.receiver.recv().ok()
    }
}

/// Transport-agnostic event bus.
///
/// ```text
/// unit of work (append) -> EventBus::publish -> subscriptions (projections, handlers)
/// ```
///
/// Publication may fail; the caller decides how to surface it. The events are durable by
/// then, so publishing again is always safe.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;

    /// Publish `messages` in order, stopping at the first failure.
    ///
    /// Returns how many were published.
    fn publish_all<It>(&self, messages: It) -> Result<usize, Self::Error>
    where
        It: IntoIterator<Item = M>,
        Self: Sized,
    {
        let mut published = 0;
        for message in messages {
            self.publish(message)?;
            published += 1;
        }
        Ok(published)
    }
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
