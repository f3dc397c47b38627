//! Persistence ports consumed by application code and implemented by adapters.
//!
//! Every port is asynchronous (`async-trait`) and reports failures as
//! [`PersistenceError`](crate::PersistenceError). Optimistic-concurrency conflicts are
//! always `PersistenceError::Conflict` and never leave partial writes behind.

pub mod read_model;
pub mod repository;
pub mod stream;
pub mod unit_of_work;

pub use read_model::ReadModelRepository;
pub use repository::AggregateRepository;
pub use stream::{EventStreamReader, SnapshotStore};
pub use unit_of_work::{EventSourcingUnitOfWork, UnitOfWork};
