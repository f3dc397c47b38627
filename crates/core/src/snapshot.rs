//! Snapshots: captured aggregate state at a known stream position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::AggregateId;

/// A point-in-time snapshot of an aggregate's state.
///
/// `last_event_position` is the stream position of the last event folded into
/// `payload`; replay resumes with the events after it. `snapshot_version` is the
/// schema version of `payload`, so adapters can upcast old snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<S, I = AggregateId> {
    pub aggregate_id: I,
    pub last_event_position: i64,
    pub snapshot_version: u32,
    pub created_at: DateTime<Utc>,
    pub payload: S,
}

impl<S, I> Snapshot<S, I> {
    pub fn new(aggregate_id: I, last_event_position: i64, snapshot_version: u32, payload: S) -> Self {
        Self {
            aggregate_id,
            last_event_position,
            snapshot_version,
            created_at: Utc::now(),
            payload,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Snapshot capability: produce and restore a state payload.
///
/// Aggregates opt in by implementing this trait and returning `Some(self)` from
/// [`EventSourcedAggregate::snapshot_hooks`](crate::EventSourcedAggregate::snapshot_hooks).
pub trait SnapshotHooks {
    type State;

    fn create_snapshot(&self) -> Self::State;

    /// Replace in-memory state with `state`. Version bookkeeping is done by the caller.
    fn restore_snapshot(&mut self, state: &Self::State);
}
