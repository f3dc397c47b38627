use async_trait::async_trait;

use keel_core::{Entity, ExpectedVersion};

use crate::error::PersistenceError;

/// Load and save whole aggregates.
///
/// `save` treats `expected_version` as a precondition: when the stored version differs the
/// write is rejected with [`PersistenceError::Conflict`] and nothing is persisted. On
/// success the aggregate's pending events have been handed off and cleared.
#[async_trait]
pub trait AggregateRepository<A>: Send + Sync
where
    A: Entity,
{
    /// `Ok(None)` when the aggregate does not exist.
    async fn load(&self, id: &A::Id) -> Result<Option<A>, PersistenceError>;

    async fn save(
        &self,
        aggregate: &mut A,
        expected_version: ExpectedVersion,
    ) -> Result<(), PersistenceError>;
}
