//! Entity trait: identity + continuity across state changes.

use core::any::Any;
use core::fmt::Debug;
use core::hash::Hash;

use serde::{Deserialize, Serialize};

/// Entity marker + minimal interface.
///
/// Equality is identity-based: two entities are the same only when both carry an
/// identifier and the identifiers are equal. An entity without an id is never equal
/// to anything, itself included.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + Hash + Debug;

    /// Returns the entity identifier, if one has been assigned.
    fn id(&self) -> Option<&Self::Id>;

    /// Identity comparison against another entity sharing the same id type.
    fn equals<O>(&self, other: Option<&O>) -> bool
    where
        O: Entity<Id = Self::Id> + ?Sized,
    {
        let Some(other) = other else {
            return false;
        };
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Plain `{id}` view of the entity.
    fn to_snapshot(&self) -> EntitySnapshot<Self::Id> {
        EntitySnapshot {
            id: self.id().cloned(),
        }
    }
}

/// Serializable identity view produced by [`Entity::to_snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot<I> {
    pub id: Option<I>,
}

/// The identity primitive: an optional identifier fixed at construction.
///
/// Embed this in domain types that need entity semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity<I> {
    id: Option<I>,
}

impl<I> Identity<I> {
    pub fn new(id: I) -> Self {
        Self { id: Some(id) }
    }

    /// An entity that has not been assigned an identifier (yet).
    pub fn unassigned() -> Self {
        Self { id: None }
    }

    pub fn get(&self) -> Option<&I> {
        self.id.as_ref()
    }

    pub fn is_assigned(&self) -> bool {
        self.id.is_some()
    }
}

impl<I: 'static> Identity<I> {
    /// Runtime type-guard for the bare identity primitive: true only when `value` is an
    /// `Identity<I>` itself.
    ///
    /// Domain types that embed an `Identity` (and implement [`Entity`] through it) are
    /// different types and return `false`. Code handling those should use an
    /// `E: Entity` bound instead.
    pub fn is_entity(value: &dyn Any) -> bool {
        value.is::<Self>()
    }
}

impl<I> From<Option<I>> for Identity<I> {
    fn from(id: Option<I>) -> Self {
        Self { id }
    }
}

impl<I> Entity for Identity<I>
where
    I: Clone + Eq + Hash + Debug,
{
    type Id = I;

    fn id(&self) -> Option<&I> {
        self.id.as_ref()
    }
}

// Not `Eq`: an unassigned identity is unequal to itself.
impl<I> PartialEq for Identity<I>
where
    I: Clone + Eq + Hash + Debug,
{
    fn eq(&self, other: &Self) -> bool {
        self.equals(Some(other))
    }
}
