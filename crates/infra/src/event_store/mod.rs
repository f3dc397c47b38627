//! Append-only event store adapters.
//!
//! [`InMemoryEventStore`] persists; [`PublishingUnitOfWork`] layers publication on top of
//! any [`EventSourcingUnitOfWork`] so that publish only ever happens after the append
//! succeeded.

pub mod in_memory;

pub use in_memory::InMemoryEventStore;

use async_trait::async_trait;
use tracing::warn;

use keel_core::{DomainEvent, ExpectedVersion};
use keel_events::EventBus;

use crate::error::PersistenceError;
use crate::ports::{EventSourcingUnitOfWork, EventStreamReader};

/// Adapter that publishes committed events to an [`EventBus`] after a successful commit.
///
/// Published events carry the positions assigned by the inner store. If publication
/// fails the events are already durable: the caller gets [`PersistenceError::Publish`]
/// and must not mark the aggregate committed from its in-memory copy; reloading is
/// always safe (at-least-once).
pub struct PublishingUnitOfWork<S, B> {
    store: S,
    bus: B,
}

impl<S, B> PublishingUnitOfWork<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

#[async_trait]
impl<S, B, P, I> EventSourcingUnitOfWork<P, I> for PublishingUnitOfWork<S, B>
where
    S: EventSourcingUnitOfWork<P, I>,
    B: EventBus<DomainEvent<P, I>>,
    P: Clone + Send + Sync + 'static,
    I: Clone + core::fmt::Debug + Send + Sync + 'static,
{
    async fn commit(
        &self,
        aggregate_id: &I,
        events: Vec<DomainEvent<P, I>>,
        expected_version: ExpectedVersion,
    ) -> Result<i64, PersistenceError> {
        let outgoing = events.clone();

        // 1) Append (durable step)
        let new_version = self
            .store
            .commit(aggregate_id, events, expected_version)
            .await?;

        // 2) Publish committed events, positions as assigned by the store
        let first = new_version - outgoing.len() as i64 + 1;
        let positioned = outgoing
            .into_iter()
            .zip(first..)
            .map(|(event, position)| event.with_position(position));
        self.bus.publish_all(positioned).map_err(|err| {
            warn!(aggregate_id = ?aggregate_id, error = ?err, "publish after commit failed");
            PersistenceError::Publish(format!("{err:?}"))
        })?;

        Ok(new_version)
    }
}

#[async_trait]
impl<S, B, P, I> EventStreamReader<P, I> for PublishingUnitOfWork<S, B>
where
    S: EventStreamReader<P, I>,
    B: Send + Sync,
    P: Send + 'static,
    I: Sync + 'static,
{
    async fn read_stream(
        &self,
        aggregate_id: &I,
        after: Option<i64>,
    ) -> Result<Vec<DomainEvent<P, I>>, PersistenceError> {
        self.store.read_stream(aggregate_id, after).await
    }

    async fn stream_version(&self, aggregate_id: &I) -> Result<i64, PersistenceError> {
        self.store.stream_version(aggregate_id).await
    }
}
