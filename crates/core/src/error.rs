//! Domain error model.

use thiserror::Error;

use crate::version::ExpectedVersion;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, caller-visible failures (validation,
/// invariants, event bookkeeping). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An aggregate was asked to record an event that was not supplied.
    #[error("domain event not provided")]
    EventNotProvided,

    /// An event targets a different aggregate than the one recording it.
    #[error("event aggregate mismatch (aggregate: {expected}, event: {actual})")]
    EventAggregateMismatch { expected: String, actual: String },

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Build a mismatch error from the aggregate's id (possibly unset) and the event's id.
    pub fn aggregate_mismatch(
        expected: Option<&impl core::fmt::Debug>,
        actual: &impl core::fmt::Debug,
    ) -> Self {
        Self::EventAggregateMismatch {
            expected: expected.map_or_else(|| "<unset>".to_string(), |id| format!("{id:?}")),
            actual: format!("{actual:?}"),
        }
    }

    /// True for the two event-rejection variants raised by `add_domain_event`.
    pub fn is_event_rejection(&self) -> bool {
        matches!(
            self,
            Self::EventNotProvided | Self::EventAggregateMismatch { .. }
        )
    }
}

/// Optimistic concurrency check failure.
///
/// The kernel never raises this on its own; persistence ports return it (wrapped in their
/// own error type) when the stored stream version differs from the caller's expectation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("optimistic concurrency check failed (expected: {expected:?}, actual: {actual})")]
pub struct ConcurrencyConflict {
    pub expected: ExpectedVersion,
    pub actual: i64,
}
