use crate::RowCoordinates;

/// Identifies a row acquired from an [`ObjectPool`][crate::ObjectPool].
///
/// A handle is a plain value: it can be copied freely and stays the same size regardless
/// of the payload type. It does not borrow the pool, so it remains usable across growth events
/// that append new blocks.
///
/// Each handle remembers the pool that issued it and the generation of the row at the time of
/// acquisition. The pool uses this to reject handles that come from another pool, that were
/// already released or that refer to a row which has since been handed out again.
///
/// # Examples
///
/// ```
/// use object_pool::ObjectPool;
///
/// let mut pool = ObjectPool::<u64>::builder().build();
///
/// let handle = pool.acquire()?;
/// let copy = handle;
///
/// pool.release(handle)?;
///
/// // The copy refers to a row that is no longer live.
/// assert!(pool.release(copy).is_err());
/// # Ok::<(), object_pool::Error>(())
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RowHandle {
    /// Ensures this handle can only be used with the pool it came from.
    pool_id: u64,

    coordinates: RowCoordinates,

    /// Generation of the row when the handle was issued. Rows bump their generation
    /// on every release, which invalidates all copies of earlier handles. Rows whose
    /// generation is exhausted are retired, so a value is never issued twice.
    generation: u64,
}

impl RowHandle {
    #[must_use]
    pub(crate) fn new(pool_id: u64, coordinates: RowCoordinates, generation: u64) -> Self {
        Self {
            pool_id,
            coordinates,
            generation,
        }
    }

    #[must_use]
    pub(crate) fn pool_id(&self) -> u64 {
        self.pool_id
    }

    /// The location of the row within the pool.
    #[must_use]
    #[inline]
    pub fn coordinates(&self) -> RowCoordinates {
        self.coordinates
    }

    #[must_use]
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(RowHandle: Send, Sync, Copy, Eq, std::hash::Hash, std::fmt::Debug);

    #[test]
    fn exposes_parts() {
        let handle = RowHandle::new(9, RowCoordinates::from_parts(1, 4), 3);

        assert_eq!(handle.pool_id(), 9);
        assert_eq!(handle.coordinates(), RowCoordinates::from_parts(1, 4));
        assert_eq!(handle.generation(), 3);
    }

    #[test]
    fn generation_distinguishes_handles() {
        let coordinates = RowCoordinates::from_parts(0, 0);

        assert_ne!(
            RowHandle::new(1, coordinates, 0),
            RowHandle::new(1, coordinates, 1)
        );
    }
}
