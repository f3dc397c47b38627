//! In-memory snapshot storage.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use keel_core::{AggregateId, Snapshot};

use crate::error::PersistenceError;
use crate::ports::SnapshotStore;

/// Keeps the latest snapshot per aggregate. An older snapshot never replaces a newer one.
#[derive(Debug)]
pub struct InMemorySnapshotStore<S, I = AggregateId> {
    latest: RwLock<HashMap<I, Snapshot<S, I>>>,
}

impl<S, I> InMemorySnapshotStore<S, I> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S, I> Default for InMemorySnapshotStore<S, I> {
    fn default() -> Self {
        Self {
            latest: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<S, I> SnapshotStore<S, I> for InMemorySnapshotStore<S, I>
where
    S: Clone + Send + Sync,
    I: Clone + Eq + Hash + core::fmt::Debug + Send + Sync,
{
    async fn load_snapshot(
        &self,
        aggregate_id: &I,
    ) -> Result<Option<Snapshot<S, I>>, PersistenceError> {
        let latest = self
            .latest
            .read()
            .map_err(|_| PersistenceError::poisoned("snapshot store"))?;
        Ok(latest.get(aggregate_id).cloned())
    }

    async fn save_snapshot(&self, snapshot: Snapshot<S, I>) -> Result<(), PersistenceError> {
        let mut latest = self
            .latest
            .write()
            .map_err(|_| PersistenceError::poisoned("snapshot store"))?;

        if let Some(existing) = latest.get(&snapshot.aggregate_id) {
            if existing.last_event_position > snapshot.last_event_position {
                debug!(
                    aggregate_id = ?snapshot.aggregate_id,
                    kept = existing.last_event_position,
                    offered = snapshot.last_event_position,
                    "ignoring older snapshot"
                );
                return Ok(());
            }
        }

        latest.insert(snapshot.aggregate_id.clone(), snapshot);
        Ok(())
    }
}
