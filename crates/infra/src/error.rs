//! Persistence error model shared by every port.

use thiserror::Error;

use keel_core::{ConcurrencyConflict, DomainError};

/// Port operation error.
///
/// These are **infrastructure errors** as opposed to domain errors, with one bridge
/// variant so handlers can propagate both with `?`.
///
/// ## Optimistic concurrency
///
/// A stale expected version is always reported as [`PersistenceError::Conflict`], and
/// only after the adapter made sure nothing was written. Callers may reload and retry
/// the load-mutate-save cycle; nothing in this crate retries on its own.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Conflict(#[from] ConcurrencyConflict),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    /// Publication failed *after* a successful append (events are durable).
    #[error("event publication failed: {0}")]
    Publish(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("unit of work already completed")]
    AlreadyCompleted,
}

impl PersistenceError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub(crate) fn poisoned(what: &str) -> Self {
        Self::Storage(format!("{what} lock poisoned"))
    }
}
