use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use keel_core::{
    AggregateId, AggregateRoot, DomainEvent, Entity, EventQueue, EventSourcedAggregate,
    ExpectedVersion, Identity, Snapshot, SnapshotHooks, StreamVersion,
};
use keel_infra::InMemoryEventStore;

/// Minimal counter aggregate: the cost under test is replay, not domain logic.
struct Counter {
    identity: Identity<AggregateId>,
    total: i64,
    version: StreamVersion,
    pending: EventQueue<i64, AggregateId>,
}

impl Counter {
    fn empty(id: AggregateId) -> Self {
        Self {
            identity: Identity::new(id),
            total: 0,
            version: StreamVersion::default(),
            pending: EventQueue::new(),
        }
    }
}

impl Entity for Counter {
    type Id = AggregateId;

    fn id(&self) -> Option<&AggregateId> {
        self.identity.get()
    }
}

impl AggregateRoot for Counter {
    type Payload = i64;

    fn event_queue(&self) -> &EventQueue<i64, AggregateId> {
        &self.pending
    }

    fn event_queue_mut(&mut self) -> &mut EventQueue<i64, AggregateId> {
        &mut self.pending
    }
}

impl SnapshotHooks for Counter {
    type State = i64;

    fn create_snapshot(&self) -> i64 {
        self.total
    }

    fn restore_snapshot(&mut self, state: &i64) {
        self.total = *state;
    }
}

impl EventSourcedAggregate for Counter {
    type SnapshotState = i64;

    fn stream_version(&self) -> &StreamVersion {
        &self.version
    }

    fn stream_version_mut(&mut self) -> &mut StreamVersion {
        &mut self.version
    }

    fn apply_event(&mut self, event: &DomainEvent<i64>) {
        self.total += event.payload();
    }

    fn snapshot_hooks(&mut self) -> Option<&mut dyn SnapshotHooks<State = i64>> {
        Some(self)
    }
}

fn seeded_store(id: AggregateId, events: usize) -> InMemoryEventStore<i64> {
    let store = InMemoryEventStore::new();
    let batch = (0..events as i64)
        .map(|n| DomainEvent::new(id, "counter.added", "1.0.0", n))
        .collect();
    store
        .append(&id, batch, ExpectedVersion::no_stream())
        .expect("seed stream");
    store
}

fn bench_history_vs_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("rehydration");

    for event_count in [100usize, 1_000, 10_000] {
        let id = AggregateId::new();
        let store = seeded_store(id, event_count);
        let history = store.load_stream(&id, None).expect("load history");

        // snapshot covering all but the last 10 events
        let cut = event_count as i64 - 11;
        let mut warm = Counter::empty(id);
        warm.rehydrate_from_history(&history[..=cut as usize], None);
        let snapshot = Snapshot::new(id, cut, 1, warm.create_snapshot());
        let tail = store.load_stream(&id, Some(cut)).expect("load tail");

        group.throughput(Throughput::Elements(event_count as u64));
        group.bench_with_input(
            BenchmarkId::new("history", event_count),
            &history,
            |b, history| {
                b.iter(|| {
                    let mut counter = Counter::empty(id);
                    counter.rehydrate_from_history(black_box(history), None);
                    black_box(counter.total)
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("snapshot_plus_tail", event_count),
            &tail,
            |b, tail| {
                b.iter(|| {
                    let mut counter = Counter::empty(id);
                    counter.rehydrate_from_snapshot(black_box(&snapshot), black_box(tail), None);
                    black_box(counter.total)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_history_vs_snapshot);
criterion_main!(benches);
