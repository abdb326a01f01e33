use std::collections::TryReserveError;

use thiserror::Error;

use crate::RowHandle;

/// Errors that can occur when operating an [`ObjectPool`][crate::ObjectPool].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The pool could not obtain backing storage for a new block.
    ///
    /// The pool is left exactly as it was before the failed operation.
    #[error("could not obtain backing storage for a block of {rows} rows")]
    OutOfMemory {
        /// Row count of the block that could not be created.
        rows: usize,

        /// The underlying allocation failure.
        #[source]
        source: TryReserveError,
    },

    /// The handle does not refer to a live row of this pool.
    ///
    /// The pool is left unchanged; releasing or accessing through an invalid handle never
    /// corrupts pool bookkeeping.
    #[error("invalid handle {handle:?}: {problem}")]
    InvalidHandle {
        /// The rejected handle.
        handle: RowHandle,

        /// Why the handle was rejected.
        problem: HandleProblem,
    },
}

/// Describes why a [`RowHandle`] was rejected by a pool.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum HandleProblem {
    /// The handle was issued by a different pool.
    #[error("the handle was issued by a different pool")]
    ForeignPool,

    /// The handle points at a block or row that does not exist in this pool.
    #[error("the handle points outside of the pool's blocks")]
    OutOfBounds,

    /// The row is free: the handle was already released.
    #[error("the row is not live, the handle was already released")]
    NotLive,

    /// The row was released and handed out again since the handle was issued.
    #[error("the row has been reused since the handle was issued")]
    Stale,
}

impl Error {
    pub(crate) fn invalid_handle(handle: RowHandle, problem: HandleProblem) -> Self {
        Self::InvalidHandle { handle, problem }
    }

    /// If this is an [`Error::InvalidHandle`], returns why the handle was rejected.
    #[must_use]
    pub fn handle_problem(&self) -> Option<HandleProblem> {
        match self {
            Self::InvalidHandle { problem, .. } => Some(*problem),
            Self::OutOfMemory { .. } => None,
        }
    }
}

/// A specialized `Result` type for object pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::RowCoordinates;

    assert_impl_all!(Error: Send, Sync, Debug);
    assert_impl_all!(HandleProblem: Send, Sync, Copy, Debug);

    fn some_handle() -> RowHandle {
        RowHandle::new(1, RowCoordinates::from_parts(0, 2), 5)
    }

    #[test]
    fn invalid_handle_reports_problem() {
        let error = Error::invalid_handle(some_handle(), HandleProblem::Stale);

        assert_eq!(error.handle_problem(), Some(HandleProblem::Stale));

        let message = error.to_string();
        assert!(message.contains("reused"), "{message}");
    }

    #[test]
    fn out_of_memory_has_source() {
        let source = Vec::<u64>::new()
            .try_reserve_exact(usize::MAX)
            .expect_err("reserving usize::MAX elements must fail");

        let error = Error::OutOfMemory { rows: 42, source };

        assert_eq!(error.handle_problem(), None);
        assert!(std::error::Error::source(&error).is_some());
        assert!(error.to_string().contains("42 rows"));
    }
}
