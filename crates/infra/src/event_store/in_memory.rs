use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, warn};

use keel_core::{AggregateId, DomainEvent, ExpectedVersion, NO_EVENTS};

use crate::error::PersistenceError;
use crate::handlers::{HealthCheck, HealthStatus};
use crate::ports::{EventSourcingUnitOfWork, EventStreamReader};

/// In-memory append-only event store.
///
/// One stream per aggregate id. Positions start at 0, so a stream's version is the
/// position of its last event (`-1` when empty). The version check and the append
/// happen under one write lock: a conflicting commit writes nothing.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug)]
pub struct InMemoryEventStore<P, I = AggregateId> {
    streams: RwLock<HashMap<I, Vec<DomainEvent<P, I>>>>,
}

impl<P, I> InMemoryEventStore<P, I> {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[DomainEvent<P, I>]) -> i64 {
        stream.len() as i64 - 1
    }
}

impl<P, I> Default for InMemoryEventStore<P, I> {
    fn default() -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
        }
    }
}

impl<P, I> InMemoryEventStore<P, I>
where
    P: Clone,
    I: Clone + Eq + Hash + core::fmt::Debug,
{
    /// Append `events` to the stream of `aggregate_id` (synchronous core of `commit`).
    pub fn append(
        &self,
        aggregate_id: &I,
        events: Vec<DomainEvent<P, I>>,
        expected_version: ExpectedVersion,
    ) -> Result<i64, PersistenceError> {
        // All events must target the stream being written.
        if let Some((idx, e)) = events
            .iter()
            .enumerate()
            .find(|(_, e)| e.aggregate_id() != aggregate_id)
        {
            return Err(PersistenceError::InvalidAppend(format!(
                "event at index {idx} targets {:?}, not {aggregate_id:?}",
                e.aggregate_id()
            )));
        }

        let mut streams = self
            .streams
            .write()
            .map_err(|_| PersistenceError::poisoned("event store"))?;

        let current = streams
            .get(aggregate_id)
            .map_or(NO_EVENTS, |s| Self::current_version(s));

        if let Err(conflict) = expected_version.check(current) {
            warn!(aggregate_id = ?aggregate_id, %conflict, "rejecting stale commit");
            return Err(conflict.into());
        }

        if events.is_empty() {
            return Ok(current);
        }

        let count = events.len();
        let stream = streams.entry(aggregate_id.clone()).or_default();
        let mut next = current + 1;
        for event in events {
            stream.push(event.with_position(next));
            next += 1;
        }

        let new_version = current + count as i64;
        debug!(aggregate_id = ?aggregate_id, count, new_version, "events committed");
        Ok(new_version)
    }

    /// Synchronous stream read, see [`EventStreamReader::read_stream`].
    pub fn load_stream(
        &self,
        aggregate_id: &I,
        after: Option<i64>,
    ) -> Result<Vec<DomainEvent<P, I>>, PersistenceError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| PersistenceError::poisoned("event store"))?;

        let Some(stream) = streams.get(aggregate_id) else {
            return Ok(Vec::new());
        };
        let skip = after.map_or(0, |position| position.saturating_add(1).max(0) as usize);
        Ok(stream.iter().skip(skip).cloned().collect())
    }

    pub fn version_of(&self, aggregate_id: &I) -> Result<i64, PersistenceError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| PersistenceError::poisoned("event store"))?;
        Ok(streams
            .get(aggregate_id)
            .map_or(NO_EVENTS, |s| Self::current_version(s)))
    }
}

#[async_trait]
impl<P, I> EventSourcingUnitOfWork<P, I> for InMemoryEventStore<P, I>
where
    P: Clone + Send + Sync,
    I: Clone + Eq + Hash + core::fmt::Debug + Send + Sync,
{
    async fn commit(
        &self,
        aggregate_id: &I,
        events: Vec<DomainEvent<P, I>>,
        expected_version: ExpectedVersion,
    ) -> Result<i64, PersistenceError> {
        self.append(aggregate_id, events, expected_version)
    }
}

#[async_trait]
impl<P, I> EventStreamReader<P, I> for InMemoryEventStore<P, I>
where
    P: Clone + Send + Sync,
    I: Clone + Eq + Hash + core::fmt::Debug + Send + Sync,
{
    async fn read_stream(
        &self,
        aggregate_id: &I,
        after: Option<i64>,
    ) -> Result<Vec<DomainEvent<P, I>>, PersistenceError> {
        self.load_stream(aggregate_id, after)
    }

    async fn stream_version(&self, aggregate_id: &I) -> Result<i64, PersistenceError> {
        self.version_of(aggregate_id)
    }
}

#[async_trait]
impl<P, I> HealthCheck for InMemoryEventStore<P, I>
where
    P: Send + Sync,
    I: Send + Sync,
{
    fn name(&self) -> &str {
        "in-memory-event-store"
    }

    async fn check(&self) -> HealthStatus {
        if self.streams.is_poisoned() {
            HealthStatus::Unhealthy("event store lock poisoned".to_string())
        } else {
            HealthStatus::Healthy
        }
    }
}
