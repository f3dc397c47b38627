//! Aggregate root: an entity that records domain events for one unit of work.

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::event::DomainEvent;

/// Ordered queue of *uncommitted* events for the current unit of work.
///
/// This is not an event-sourcing history: it is drained by infrastructure once the
/// events have been persisted and published. Mutation is only reachable through
/// [`AggregateRoot`]'s operations.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQueue<P, I> {
    events: Vec<DomainEvent<P, I>>,
}

impl<P, I> EventQueue<P, I> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DomainEvent<P, I>> {
        self.events.iter()
    }

    pub(crate) fn push(&mut self, event: DomainEvent<P, I>) {
        self.events.push(event);
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
    }
}

impl<P: Clone, I: Clone> EventQueue<P, I> {
    /// Defensive copy of the queued events, in recording order.
    pub fn to_vec(&self) -> Vec<DomainEvent<P, I>> {
        self.events.clone()
    }
}

impl<P, I> Default for EventQueue<P, I> {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate root interface.
///
/// Implementors embed an [`EventQueue`] and hand it out through the two accessors; the
/// provided methods hold the recording rules:
///
/// - absent events are rejected with [`DomainError::EventNotProvided`]
/// - events addressed to another aggregate (or recorded before this aggregate has an
///   id) are rejected with [`DomainError::EventAggregateMismatch`]
/// - accepted events are appended in call order
pub trait AggregateRoot: Entity {
    /// Payload type carried by this aggregate's events.
    type Payload: Clone + core::fmt::Debug;

    fn event_queue(&self) -> &EventQueue<Self::Payload, Self::Id>;

    fn event_queue_mut(&mut self) -> &mut EventQueue<Self::Payload, Self::Id>;

    /// Copy of the pending events; mutating it never affects the aggregate.
    fn domain_events(&self) -> Vec<DomainEvent<Self::Payload, Self::Id>> {
        self.event_queue().to_vec()
    }

    /// Drop all pending events. Infrastructure calls this after persist + publish.
    fn clear_domain_events(&mut self) {
        self.event_queue_mut().clear();
    }

    /// Check that `event` may be recorded by this aggregate.
    fn ensure_recordable(
        &self,
        event: Option<&DomainEvent<Self::Payload, Self::Id>>,
    ) -> DomainResult<()> {
        let event = event.ok_or(DomainError::EventNotProvided)?;
        match self.id() {
            Some(id) if id == event.aggregate_id() => Ok(()),
            other => Err(DomainError::aggregate_mismatch(other, event.aggregate_id())),
        }
    }

    /// Append an event to the pending queue. Meant to be called from business methods.
    fn add_domain_event(
        &mut self,
        event: impl Into<Option<DomainEvent<Self::Payload, Self::Id>>>,
    ) -> DomainResult<()>
    where
        Self: Sized,
    {
        let event = event.into();
        self.ensure_recordable(event.as_ref())?;
        if let Some(event) = event {
            self.event_queue_mut().push(event);
        }
        Ok(())
    }
}
