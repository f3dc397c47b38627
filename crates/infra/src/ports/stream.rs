use async_trait::async_trait;

use keel_core::{AggregateId, DomainEvent, Snapshot};

use crate::error::PersistenceError;

/// Read access to persisted event streams (the replay source).
#[async_trait]
pub trait EventStreamReader<P, I = AggregateId>: Send + Sync {
    /// Events of one stream in position order, optionally only those after `after`.
    ///
    /// Returns an empty vector when the stream does not exist.
    async fn read_stream(
        &self,
        aggregate_id: &I,
        after: Option<i64>,
    ) -> Result<Vec<DomainEvent<P, I>>, PersistenceError>;

    /// Position of the last stored event, `-1` for an unknown stream.
    async fn stream_version(&self, aggregate_id: &I) -> Result<i64, PersistenceError>;
}

/// Latest-snapshot storage. Snapshots are a cache: losing one only costs replay time.
#[async_trait]
pub trait SnapshotStore<S, I = AggregateId>: Send + Sync {
    async fn load_snapshot(&self, aggregate_id: &I)
    -> Result<Option<Snapshot<S, I>>, PersistenceError>;

    async fn save_snapshot(&self, snapshot: Snapshot<S, I>) -> Result<(), PersistenceError>;
}
