use async_trait::async_trait;

use keel_core::{AggregateId, DomainEvent, ExpectedVersion};

use crate::error::PersistenceError;

/// Transactional boundary around one or more port operations.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn commit(&mut self) -> Result<(), PersistenceError>;

    async fn rollback(&mut self) -> Result<(), PersistenceError>;
}

/// Atomically persist and publish one aggregate's pending events.
///
/// Implementations must:
/// - reject a stale `expected_version` with [`PersistenceError::Conflict`], writing nothing
/// - persist all events or none
/// - publish only after the events are durable
/// - return the post-commit version (`current + events.len()`, or the store-assigned
///   position of the last event)
#[async_trait]
pub trait EventSourcingUnitOfWork<P, I = AggregateId>: Send + Sync {
    async fn commit(
        &self,
        aggregate_id: &I,
        events: Vec<DomainEvent<P, I>>,
        expected_version: ExpectedVersion,
    ) -> Result<i64, PersistenceError>;
}
