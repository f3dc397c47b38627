//! Event-sourced aggregate kernel.
//!
//! This crate contains **pure domain** primitives (no IO, no logging, no serialization
//! of payloads): identity, structural equality, domain events, the event-recording
//! aggregate root and its versioned, snapshot-capable extension.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod event;
pub mod event_sourced;
pub mod id;
pub mod snapshot;
pub mod value_object;
pub mod version;

pub use aggregate::{AggregateRoot, EventQueue};
pub use entity::{Entity, EntitySnapshot, Identity};
pub use error::{ConcurrencyConflict, DomainError, DomainResult};
pub use event::{DomainEvent, EventMetadata};
pub use event_sourced::EventSourcedAggregate;
pub use id::{AggregateId, EventId};
pub use snapshot::{Snapshot, SnapshotHooks};
pub use value_object::{Structural, Structure, ValueObject, deep_equals};
pub use version::{ExpectedVersion, NO_EVENTS, StreamVersion};
