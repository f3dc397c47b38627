//! Stream versions and optimistic concurrency expectations.

use serde::{Deserialize, Serialize};

use crate::error::ConcurrencyConflict;

/// Version of a stream that has no committed events.
pub const NO_EVENTS: i64 = -1;

/// Last known *persisted* position of an event-sourced aggregate.
///
/// Starts at [`NO_EVENTS`]. Only the kernel's replay and commit paths can move it;
/// domain code reads it through [`StreamVersion::get`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct StreamVersion(i64);

impl StreamVersion {
    pub fn new() -> Self {
        Self(NO_EVENTS)
    }

    pub fn get(&self) -> i64 {
        self.0
    }

    /// +1, used once per replayed event.
    pub(crate) fn increment(&mut self) {
        self.0 += 1;
    }

    pub(crate) fn set(&mut self, position: i64) {
        self.0 = position;
    }

    pub(crate) fn advance(&mut self, count: usize) {
        self.0 += count as i64;
    }
}

impl Default for StreamVersion {
    fn default() -> Self {
        Self::new()
    }
}

/// Optimistic concurrency expectation for an aggregate stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectedVersion {
    /// Skip version checking (useful for idempotent commands, migrations, etc.).
    Any,
    /// Require the stream to be at an exact version (`-1` = no events yet).
    Exact(i64),
}

impl ExpectedVersion {
    /// The stream must not exist yet.
    pub const fn no_stream() -> Self {
        Self::Exact(NO_EVENTS)
    }

    pub fn matches(self, actual: i64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: i64) -> Result<(), ConcurrencyConflict> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(ConcurrencyConflict {
                expected: self,
                actual,
            })
        }
    }
}

impl From<Option<i64>> for ExpectedVersion {
    fn from(value: Option<i64>) -> Self {
        value.map_or(ExpectedVersion::Any, ExpectedVersion::Exact)
    }
}
