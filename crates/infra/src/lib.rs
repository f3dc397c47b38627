//! Infrastructure layer: persistence ports and the in-memory reference adapters.
//!
//! Domain code depends on `keel-core` only. Application code talks to the ports in
//! [`ports`]; the adapters here implement them in memory for tests and local runs.
//!
//! Write path: aggregate records events, [`repository::commit_pending`] hands them to an
//! [`EventSourcingUnitOfWork`], and only after that succeeded are they marked committed.

pub mod error;
pub mod event_store;
pub mod handlers;
pub mod ports;
pub mod read_model;
pub mod repository;
pub mod snapshot_store;
pub mod unit_of_work;

pub use error::PersistenceError;
pub use event_store::{InMemoryEventStore, PublishingUnitOfWork};
pub use handlers::{CommandHandler, HealthCheck, HealthStatus, QueryHandler};
pub use ports::{
    AggregateRepository, EventSourcingUnitOfWork, EventStreamReader, ReadModelRepository,
    SnapshotStore, UnitOfWork,
};
pub use read_model::{InMemoryReadModelStore, ModelFilter};
pub use repository::{
    EventSourcedRepository, InMemoryStateRepository, RepositoryOptions, commit_pending,
};
pub use snapshot_store::InMemorySnapshotStore;
pub use unit_of_work::StagedUnitOfWork;
