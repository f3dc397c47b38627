//! Aggregate repositories built on the ports.
//!
//! - [`EventSourcedRepository`]: loads by replay (snapshot + tail, or full history) and
//!   saves by committing pending events through an [`EventSourcingUnitOfWork`].
//! - [`InMemoryStateRepository`]: state-stored repository for plain aggregate roots.
//!
//! Both only clear an aggregate's pending events after the write succeeded.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use keel_core::{
    AggregateRoot, DomainError, EventSourcedAggregate, ExpectedVersion, NO_EVENTS, Snapshot,
};

use crate::error::PersistenceError;
use crate::ports::{
    AggregateRepository, EventSourcingUnitOfWork, EventStreamReader, SnapshotStore,
};

/// Tuning for [`EventSourcedRepository`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RepositoryOptions {
    /// Take a snapshot whenever a save crosses a multiple of this many events.
    /// `None` (or `0`) disables snapshotting.
    pub snapshot_every: Option<u64>,
    /// Schema version stamped on snapshots taken by the repository.
    pub snapshot_schema_version: u32,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            snapshot_every: None,
            snapshot_schema_version: 1,
        }
    }
}

impl RepositoryOptions {
    /// Whether moving from `before` to `after` crossed a snapshot boundary.
    fn snapshot_due(&self, before: i64, after: i64) -> bool {
        match self.snapshot_every {
            Some(every) if every > 0 => {
                let every = every as i64;
                after > before && (after + 1) / every > (before + 1) / every
            }
            _ => false,
        }
    }
}

/// Commit the aggregate's pending events and, only on success, mark them committed.
///
/// Returns the new stream version. With nothing pending the (empty) commit still goes to
/// the store, so a stale `expected_version` is rejected with
/// [`PersistenceError::Conflict`]; the aggregate itself is left untouched. On any error
/// the aggregate keeps its pending events and its version.
pub async fn commit_pending<A, U>(
    uow: &U,
    aggregate: &mut A,
    expected_version: ExpectedVersion,
) -> Result<i64, PersistenceError>
where
    A: EventSourcedAggregate + Send,
    A::Payload: Send + Sync,
    A::Id: Send + Sync,
    U: EventSourcingUnitOfWork<A::Payload, A::Id> + ?Sized,
{
    let aggregate_id = aggregate
        .id()
        .cloned()
        .ok_or_else(|| DomainError::invariant("cannot commit an aggregate without an id"))?;

    let pending = aggregate.domain_events();
    let has_pending = !pending.is_empty();

    let new_version = uow.commit(&aggregate_id, pending, expected_version).await?;
    if has_pending {
        aggregate.mark_events_committed(Some(new_version));
    }
    Ok(new_version)
}

type SharedSnapshots<A> = Arc<
    dyn SnapshotStore<
            <A as EventSourcedAggregate>::SnapshotState,
            <A as keel_core::Entity>::Id,
        >,
>;

/// [`AggregateRepository`] for event-sourced aggregates.
///
/// `make_aggregate` builds the empty instance that replay starts from. Snapshots are only
/// read or written for aggregates that expose [`SnapshotHooks`](keel_core::SnapshotHooks);
/// a failed snapshot write is logged and never fails the save.
pub struct EventSourcedRepository<A, St, F>
where
    A: EventSourcedAggregate,
{
    store: St,
    snapshots: Option<SharedSnapshots<A>>,
    make_aggregate: F,
    options: RepositoryOptions,
}

impl<A, St, F> EventSourcedRepository<A, St, F>
where
    A: EventSourcedAggregate,
    F: Fn(&A::Id) -> A,
{
    pub fn new(store: St, make_aggregate: F) -> Self {
        Self {
            store,
            snapshots: None,
            make_aggregate,
            options: RepositoryOptions::default(),
        }
    }

    pub fn with_snapshots(mut self, snapshots: SharedSnapshots<A>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn with_options(mut self, options: RepositoryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }
}

impl<A, St, F> EventSourcedRepository<A, St, F>
where
    A: EventSourcedAggregate + Send,
    A::Id: core::fmt::Debug + Send + Sync,
    A::SnapshotState: Send,
{
    async fn write_snapshot(&self, aggregate: &mut A) {
        let Some(snapshots) = &self.snapshots else {
            return;
        };
        let Some(aggregate_id) = aggregate.id().cloned() else {
            return;
        };
        let Some(state) = aggregate.snapshot_hooks().map(|hooks| hooks.create_snapshot()) else {
            return;
        };

        let position = aggregate.version();
        let snapshot = Snapshot::new(
            aggregate_id,
            position,
            self.options.snapshot_schema_version,
            state,
        );
        match snapshots.save_snapshot(snapshot).await {
            Ok(()) => debug!(position, "snapshot written"),
            Err(err) => warn!(position, error = %err, "snapshot write failed"),
        }
    }
}

#[async_trait]
impl<A, St, F> AggregateRepository<A> for EventSourcedRepository<A, St, F>
where
    A: EventSourcedAggregate + Send + Sync + 'static,
    A::Id: core::fmt::Debug + Send + Sync,
    A::Payload: Send + Sync,
    A::SnapshotState: Send + Sync,
    St: EventSourcingUnitOfWork<A::Payload, A::Id> + EventStreamReader<A::Payload, A::Id>,
    F: Fn(&A::Id) -> A + Send + Sync,
{
    #[instrument(skip_all, fields(aggregate_id = ?id))]
    async fn load(&self, id: &A::Id) -> Result<Option<A>, PersistenceError> {
        let mut aggregate = (self.make_aggregate)(id);
        let has_hooks = aggregate.snapshot_hooks().is_some();

        let snapshot = match &self.snapshots {
            Some(snapshots) if has_hooks => snapshots.load_snapshot(id).await?,
            _ => None,
        };

        if let Some(snapshot) = snapshot {
            let tail = self
                .store
                .read_stream(id, Some(snapshot.last_event_position))
                .await?;
            let version = tail.last().and_then(|e| e.position());
            aggregate.rehydrate_from_snapshot(&snapshot, &tail, version);
            debug!(
                snapshot_position = snapshot.last_event_position,
                tail = tail.len(),
                version = aggregate.version(),
                "loaded from snapshot"
            );
            return Ok(Some(aggregate));
        }

        let history = self.store.read_stream(id, None).await?;
        if history.is_empty() {
            debug!("stream not found");
            return Ok(None);
        }
        let version = history.last().and_then(|e| e.position());
        aggregate.rehydrate_from_history(&history, version);
        debug!(events = history.len(), version = aggregate.version(), "loaded from history");
        Ok(Some(aggregate))
    }

    #[instrument(skip_all, fields(aggregate_id = ?aggregate.id(), expected = ?expected_version))]
    async fn save(
        &self,
        aggregate: &mut A,
        expected_version: ExpectedVersion,
    ) -> Result<(), PersistenceError> {
        let before = aggregate.version();
        commit_pending(&self.store, aggregate, expected_version).await?;

        if self.options.snapshot_due(before, aggregate.version()) {
            self.write_snapshot(aggregate).await;
        }
        Ok(())
    }
}

/// State-stored [`AggregateRepository`] for aggregate roots that are not event sourced.
///
/// Each save stores a copy of the aggregate and bumps a per-aggregate version counter
/// (`-1` until the first save). Pending domain events are cleared once the copy is stored.
#[derive(Debug)]
pub struct InMemoryStateRepository<A>
where
    A: AggregateRoot,
{
    rows: RwLock<HashMap<A::Id, (i64, A)>>,
}

impl<A> InMemoryStateRepository<A>
where
    A: AggregateRoot,
{
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    pub fn version_of(&self, id: &A::Id) -> Result<i64, PersistenceError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| PersistenceError::poisoned("state repository"))?;
        Ok(rows.get(id).map_or(NO_EVENTS, |(version, _)| *version))
    }
}

impl<A> Default for InMemoryStateRepository<A>
where
    A: AggregateRoot,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<A> AggregateRepository<A> for InMemoryStateRepository<A>
where
    A: AggregateRoot + Clone + Send + Sync + 'static,
    A::Id: Send + Sync,
{
    async fn load(&self, id: &A::Id) -> Result<Option<A>, PersistenceError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| PersistenceError::poisoned("state repository"))?;
        Ok(rows.get(id).map(|(_, aggregate)| aggregate.clone()))
    }

    async fn save(
        &self,
        aggregate: &mut A,
        expected_version: ExpectedVersion,
    ) -> Result<(), PersistenceError> {
        let id = aggregate
            .id()
            .cloned()
            .ok_or_else(|| DomainError::invariant("cannot save an aggregate without an id"))?;

        let mut rows = self
            .rows
            .write()
            .map_err(|_| PersistenceError::poisoned("state repository"))?;

        let current = rows.get(&id).map_or(NO_EVENTS, |(version, _)| *version);
        if let Err(conflict) = expected_version.check(current) {
            warn!(aggregate_id = ?id, %conflict, "rejecting stale save");
            return Err(conflict.into());
        }

        aggregate.clear_domain_events();
        rows.insert(id, (current + 1, aggregate.clone()));
        Ok(())
    }
}
