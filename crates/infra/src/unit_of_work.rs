//! Generic staged unit of work.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::PersistenceError;
use crate::ports::UnitOfWork;

type Apply = Box<dyn FnOnce() -> Result<(), PersistenceError> + Send>;
type Compensate = Box<dyn FnOnce() -> Result<(), PersistenceError> + Send>;

struct StagedOp {
    apply: Apply,
    compensate: Option<Compensate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    Committed,
    /// A commit failed and the applied operations were compensated.
    Failed,
    RolledBack,
}

/// Unit of work that buffers operations and runs them, in staging order, on commit.
///
/// Each operation may carry a compensation. When an operation fails during commit, the
/// operations already applied are compensated in reverse order and the error is returned;
/// the unit then only accepts `rollback` (a no-op, everything was undone). Operations
/// staged without a compensation cannot be undone, so commit is only all-or-nothing when
/// every operation but the last has one.
///
/// Rollback before commit discards everything staged. Once committed or rolled back the
/// unit is spent: staging or completing again fails with
/// [`PersistenceError::AlreadyCompleted`].
pub struct StagedUnitOfWork {
    staged: Vec<StagedOp>,
    phase: Phase,
}

impl StagedUnitOfWork {
    pub fn new() -> Self {
        Self {
            staged: Vec::new(),
            phase: Phase::Open,
        }
    }

    /// Stage an operation that needs no undo (or is the last to run).
    pub fn stage(
        &mut self,
        apply: impl FnOnce() -> Result<(), PersistenceError> + Send + 'static,
    ) -> Result<(), PersistenceError> {
        self.push(Box::new(apply), None)
    }

    /// Stage an operation together with the action that reverts it.
    pub fn stage_with_compensation(
        &mut self,
        apply: impl FnOnce() -> Result<(), PersistenceError> + Send + 'static,
        compensate: impl FnOnce() -> Result<(), PersistenceError> + Send + 'static,
    ) -> Result<(), PersistenceError> {
        self.push(Box::new(apply), Some(Box::new(compensate)))
    }

    pub fn staged(&self) -> usize {
        self.staged.len()
    }

    pub fn is_completed(&self) -> bool {
        self.phase != Phase::Open
    }

    fn push(&mut self, apply: Apply, compensate: Option<Compensate>) -> Result<(), PersistenceError> {
        self.ensure_open()?;
        self.staged.push(StagedOp { apply, compensate });
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), PersistenceError> {
        match self.phase {
            Phase::Open => Ok(()),
            Phase::Committed | Phase::Failed | Phase::RolledBack => {
                Err(PersistenceError::AlreadyCompleted)
            }
        }
    }
}

/// Undo applied operations, newest first. Compensation errors are logged, not returned.
fn compensate_all(applied: Vec<Option<Compensate>>) {
    for (idx, compensate) in applied.into_iter().enumerate().rev() {
        match compensate {
            Some(compensate) => {
                if let Err(err) = compensate() {
                    warn!(op = idx, error = %err, "compensation failed");
                }
            }
            None => warn!(op = idx, "applied operation has no compensation"),
        }
    }
}

impl Default for StagedUnitOfWork {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for StagedUnitOfWork {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StagedUnitOfWork")
            .field("staged", &self.staged.len())
            .field("phase", &self.phase)
            .finish()
    }
}

#[async_trait]
impl UnitOfWork for StagedUnitOfWork {
    async fn commit(&mut self) -> Result<(), PersistenceError> {
        self.ensure_open()?;

        let ops = std::mem::take(&mut self.staged);
        debug!(ops = ops.len(), "committing unit of work");

        let mut applied = Vec::with_capacity(ops.len());
        for StagedOp { apply, compensate } in ops {
            if let Err(err) = apply() {
                warn!(failed_at = applied.len(), error = %err, "commit failed, compensating");
                compensate_all(applied);
                self.phase = Phase::Failed;
                return Err(err);
            }
            applied.push(compensate);
        }

        self.phase = Phase::Committed;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), PersistenceError> {
        match self.phase {
            Phase::Open => {
                debug!(discarded = self.staged.len(), "rolling back unit of work");
                self.staged.clear();
            }
            // the failed commit already undid its work
            Phase::Failed => {}
            Phase::Committed | Phase::RolledBack => return Err(PersistenceError::AlreadyCompleted),
        }
        self.phase = Phase::RolledBack;
        Ok(())
    }
}
