use std::any::type_name;
use std::fmt;
use std::num::NonZero;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use tracing::{debug, trace, warn};

use crate::{
    AllocationBlock, DropPolicy, Error, GrowthPolicy, GrowthSchedule, HandleProblem,
    ObjectPoolBuilder, PoolStats, Reset, Result, RowCoordinates, RowHandle,
};

/// Global counter for generating unique pool IDs.
static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a unique pool ID.
fn generate_pool_id() -> u64 {
    POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A pool of fixed-size rows that hands out reusable storage for values of type `T`.
///
/// The pool owns an ordered sequence of blocks, each holding a fixed number of rows. Consumers
/// [`acquire()`](Self::acquire) a row, use its payload through [`get()`](Self::get) and
/// [`get_mut()`](Self::get_mut), and eventually [`release()`](Self::release) it. Released rows are
/// reset and handed out again by later acquisitions, so steady-state use performs no heap
/// allocation at all.
///
/// # Free row search
///
/// The pool keeps a cursor pointing at the row that the next acquisition will be served from.
/// After each acquisition the cursor moves to the next free row using a next-fit scan: forward
/// from the acquired row to the end of the last block, then wrapping around from the first block
/// back to the acquired row. Only when an acquisition finds no free row anywhere does the pool
/// append a new block, sized according to its [`GrowthPolicy`].
///
/// # Stable storage
///
/// Blocks are never resized, moved or removed while the pool exists. A payload therefore stays
/// at the same address from acquisition until release, even when the pool grows in between.
///
/// # Examples
///
/// ```rust
/// use new_zealand::nz;
/// use object_pool::ObjectPool;
///
/// let mut pool = ObjectPool::<String>::builder()
///     .initial_block_size(nz!(2))
///     .reset_with(String::clear)
///     .build();
///
/// let greeting = pool.acquire()?;
/// pool.get_mut(greeting)?.push_str("Hello");
///
/// assert_eq!(pool.get(greeting)?, "Hello");
/// assert_eq!(pool.len(), 1);
///
/// pool.release(greeting)?;
/// assert!(pool.is_empty());
/// # Ok::<(), object_pool::Error>(())
/// ```
///
/// # Thread safety
///
/// The pool is single-threaded. It is neither [`Send`] nor [`Sync`] because the reset callback
/// is not required to be thread-safe. Callers that need to share a pool must provide their own
/// mutual exclusion around a pool that is confined to one thread.
pub struct ObjectPool<T> {
    /// We need to uniquely identify each pool to ensure that handles are not returned to the
    /// wrong pool. If the pool ID does not match when a handle is used, the operation fails.
    pool_id: u64,

    /// Blocks in creation order. Only ever appended to.
    blocks: Vec<AllocationBlock<T>>,

    reset: Reset<T>,

    growth: GrowthSchedule,

    /// The row the next acquisition is served from, if it is free. If it is live, the pool
    /// was completely full after the previous acquisition and the next acquisition must
    /// search again (and possibly grow).
    cursor: RowCoordinates,

    drop_policy: DropPolicy,

    /// Number of live rows. We track this explicitly to avoid repeatedly
    /// summing across blocks when calculating the length.
    length: usize,
}

impl<T> ObjectPool<T> {
    /// Creates a builder for configuring and constructing an [`ObjectPool`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use new_zealand::nz;
    /// use object_pool::ObjectPool;
    ///
    /// let pool = ObjectPool::<u64>::builder()
    ///     .initial_block_size(nz!(32))
    ///     .build();
    ///
    /// assert_eq!(pool.len(), 0);
    /// assert_eq!(pool.capacity(), 32);
    /// ```
    #[inline]
    pub fn builder() -> ObjectPoolBuilder<T>
    where
        T: Default,
    {
        ObjectPoolBuilder::new(T::default)
    }

    /// Creates a builder for a pool whose payloads are created by `factory`.
    ///
    /// Use this for payload types that do not implement [`Default`], or whose empty state is
    /// not their default value. Without a reset callback, released payloads are replaced by a
    /// fresh value from `factory`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Instant;
    ///
    /// use object_pool::ObjectPool;
    ///
    /// struct Sample {
    ///     taken_at: Instant,
    ///     value: f64,
    /// }
    ///
    /// let mut pool = ObjectPool::builder_with_factory(|| Sample {
    ///     taken_at: Instant::now(),
    ///     value: 0.0,
    /// })
    /// .build();
    ///
    /// let sample = pool.acquire_with(|sample| sample.value = 1.5)?;
    /// assert!(pool.get(sample)?.taken_at <= Instant::now());
    /// # Ok::<(), object_pool::Error>(())
    /// ```
    #[inline]
    pub fn builder_with_factory(factory: fn() -> T) -> ObjectPoolBuilder<T> {
        ObjectPoolBuilder::new(factory)
    }

    /// Creates a pool whose first block has `initial_block_size` rows, resetting payloads
    /// through `reset_fn`. Other settings use their defaults.
    ///
    /// # Panics
    ///
    /// Panics if the storage for the initial block cannot be obtained.
    ///
    /// # Example
    ///
    /// ```rust
    /// use new_zealand::nz;
    /// use object_pool::ObjectPool;
    ///
    /// let pool = ObjectPool::new(nz!(4), |payload: &mut [u8; 16]| payload.fill(0));
    /// assert_eq!(pool.capacity(), 4);
    /// ```
    #[must_use]
    pub fn new(initial_block_size: NonZero<usize>, reset_fn: impl Fn(&mut T) + 'static) -> Self
    where
        T: Default,
    {
        Self::builder()
            .initial_block_size(initial_block_size)
            .reset_with(reset_fn)
            .build()
    }

    pub(crate) fn new_inner(
        initial_block_size: NonZero<usize>,
        reset: Reset<T>,
        growth_policy: GrowthPolicy,
        drop_policy: DropPolicy,
    ) -> Result<Self> {
        let mut blocks = Vec::new();
        blocks
            .try_reserve(1)
            .map_err(|source| Error::OutOfMemory {
                rows: initial_block_size.get(),
                source,
            })?;

        blocks.push(AllocationBlock::new(initial_block_size, &reset)?);

        let pool_id = generate_pool_id();

        debug!(
            pool_id,
            item_type = type_name::<T>(),
            initial_block_size = initial_block_size.get(),
            ?growth_policy,
            "created object pool"
        );

        Ok(Self {
            pool_id,
            blocks,
            reset,
            growth: GrowthSchedule::new(growth_policy, initial_block_size),
            cursor: RowCoordinates::from_parts(0, 0),
            drop_policy,
            length: 0,
        })
    }

    /// The number of rows currently handed out to consumers.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        debug_assert_eq!(
            self.length,
            self.blocks.iter().map(AllocationBlock::len).sum::<usize>()
        );

        self.length
    }

    /// Whether no rows are currently handed out.
    ///
    /// An empty pool still holds all the blocks it has ever created.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The number of rows across all blocks, live or free.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        // Overflow here would imply capacity is greater than virtual memory - impossible.
        self.blocks
            .iter()
            .map(AllocationBlock::capacity)
            .fold(0, usize::wrapping_add)
    }

    /// The number of blocks the pool has created.
    #[must_use]
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// The row count of each block, in creation order.
    ///
    /// # Example
    ///
    /// ```rust
    /// use new_zealand::nz;
    /// use object_pool::ObjectPool;
    ///
    /// let mut pool = ObjectPool::<u8>::builder()
    ///     .initial_block_size(nz!(2))
    ///     .build();
    ///
    /// for _ in 0..5 {
    ///     pool.acquire()?;
    /// }
    ///
    /// assert_eq!(pool.block_capacities().collect::<Vec<_>>(), [2, 2, 4]);
    /// # Ok::<(), object_pool::Error>(())
    /// ```
    pub fn block_capacities(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks.iter().map(AllocationBlock::capacity)
    }

    /// The row count of the block that the next growth event will create.
    #[must_use]
    #[inline]
    pub fn next_block_size(&self) -> NonZero<usize> {
        self.growth.next_block_size()
    }

    /// The growth policy the pool was created with.
    #[must_use]
    #[inline]
    pub fn growth_policy(&self) -> GrowthPolicy {
        self.growth.policy()
    }

    /// The row the next free-row search starts from.
    ///
    /// The cursor is a search position, not a reservation: it does not imply whether the row
    /// is free or live.
    #[must_use]
    #[inline]
    pub fn cursor(&self) -> RowCoordinates {
        self.cursor
    }

    /// Summarizes the storage currently held by the pool.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats::new(
            self.block_count(),
            self.capacity(),
            self.len(),
            size_of::<T>(),
            AllocationBlock::<T>::ROW_SIZE,
        )
    }

    /// Acquires a free row and returns a handle to it.
    ///
    /// The payload of the row is in its reset state. Acquisition itself never invokes the
    /// reset callback.
    ///
    /// If every row of every block is live, the pool first appends a new block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the pool needs to grow but the storage for the new block
    /// cannot be obtained. The pool is left unchanged in that case.
    ///
    /// # Panics
    ///
    /// Panics if the pool bookkeeping is found to be inconsistent, which indicates a defect in the
    /// pool itself rather than in the caller.
    ///
    /// # Example
    ///
    /// ```rust
    /// use new_zealand::nz;
    /// use object_pool::ObjectPool;
    ///
    /// let mut pool = ObjectPool::<u32>::builder()
    ///     .initial_block_size(nz!(1))
    ///     .build();
    ///
    /// let first = pool.acquire()?;
    /// assert_eq!(pool.block_count(), 1);
    ///
    /// // The only row is live, so the pool grows.
    /// let second = pool.acquire()?;
    /// assert_eq!(pool.block_count(), 2);
    /// assert_ne!(first, second);
    /// # Ok::<(), object_pool::Error>(())
    /// ```
    pub fn acquire(&mut self) -> Result<RowHandle> {
        let target = if self.is_free(self.cursor) {
            self.cursor
        } else {
            match self.next_free_after(self.cursor) {
                Some(coordinates) => coordinates,
                None => self.grow()?,
            }
        };

        let generation = self
            .blocks
            .get_mut(target.block_index())
            .expect("free row search only returns coordinates of existing blocks")
            .mark_live(target.row_index());

        // This can never overflow since that would mean the pool is greater than virtual memory.
        self.length = self.length.wrapping_add(1);

        // If nothing is free, the cursor stays on the live row we just handed out and the next
        // acquisition searches again. Growth is deferred until a row is actually needed.
        self.cursor = self.next_free_after(target).unwrap_or(target);

        trace!(
            pool_id = self.pool_id,
            block = target.block_index(),
            row = target.row_index(),
            generation,
            "acquired row"
        );

        Ok(RowHandle::new(self.pool_id, target, generation))
    }

    /// Acquires a free row and lets `f` populate its payload before returning the handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the pool needs to grow but the storage for the new block
    /// cannot be obtained. `f` is not called in that case.
    ///
    /// # Example
    ///
    /// ```rust
    /// use object_pool::ObjectPool;
    ///
    /// let mut pool = ObjectPool::<(u32, u32)>::builder().build();
    ///
    /// let point = pool.acquire_with(|payload| *payload = (3, 4))?;
    /// assert_eq!(*pool.get(point)?, (3, 4));
    /// # Ok::<(), object_pool::Error>(())
    /// ```
    pub fn acquire_with(&mut self, f: impl FnOnce(&mut T)) -> Result<RowHandle> {
        let handle = self.acquire()?;

        let payload = self
            .blocks
            .get_mut(handle.coordinates().block_index())
            .and_then(|block| {
                block
                    .payload_mut(handle.coordinates().row_index(), handle.generation())
                    .ok()
            })
            .expect("we just acquired this row, so it must be live");

        f(payload);

        Ok(handle)
    }

    /// Returns a shared reference to the payload of a live row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`] if the handle was issued by a different pool or its row is
    /// no longer live under this handle.
    pub fn get(&self, handle: RowHandle) -> Result<&T> {
        self.check_origin(handle)?;

        let coordinates = handle.coordinates();

        self.blocks
            .get(coordinates.block_index())
            .ok_or(HandleProblem::OutOfBounds)
            .and_then(|block| block.payload(coordinates.row_index(), handle.generation()))
            .map_err(|problem| Error::invalid_handle(handle, problem))
    }

    /// Returns an exclusive reference to the payload of a live row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`] if the handle was issued by a different pool or its row is
    /// no longer live under this handle.
    pub fn get_mut(&mut self, handle: RowHandle) -> Result<&mut T> {
        self.check_origin(handle)?;

        let coordinates = handle.coordinates();

        self.blocks
            .get_mut(coordinates.block_index())
            .ok_or(HandleProblem::OutOfBounds)
            .and_then(|block| block.payload_mut(coordinates.row_index(), handle.generation()))
            .map_err(|problem| Error::invalid_handle(handle, problem))
    }

    /// Whether the handle refers to a live row of this pool.
    #[must_use]
    pub fn contains(&self, handle: RowHandle) -> bool {
        self.get(handle).is_ok()
    }

    /// Returns a row to the pool.
    ///
    /// The payload is passed through the reset callback and the row becomes available to later
    /// acquisitions. Every copy of the handle stops being valid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`] if the handle was issued by a different pool, was already
    /// released, or refers to a row that has since been handed out again. The pool is left
    /// unchanged and the reset callback is not invoked in that case.
    ///
    /// # Example
    ///
    /// ```rust
    /// use object_pool::{HandleProblem, ObjectPool};
    ///
    /// let mut pool = ObjectPool::<u64>::builder().build();
    ///
    /// let handle = pool.acquire()?;
    /// pool.release(handle)?;
    ///
    /// let error = pool.release(handle).unwrap_err();
    /// assert_eq!(error.handle_problem(), Some(HandleProblem::NotLive));
    /// # Ok::<(), object_pool::Error>(())
    /// ```
    pub fn release(&mut self, handle: RowHandle) -> Result<()> {
        let outcome = self.check_origin(handle).and_then(|()| {
            let coordinates = handle.coordinates();

            self.blocks
                .get_mut(coordinates.block_index())
                .ok_or(HandleProblem::OutOfBounds)
                .and_then(|block| {
                    block.release(coordinates.row_index(), handle.generation(), &self.reset)
                })
                .map_err(|problem| Error::invalid_handle(handle, problem))
        });

        if let Err(error) = outcome {
            warn!(pool_id = self.pool_id, %error, "rejected row release");
            return Err(error);
        }

        // Cannot wrap around because we just released a live row.
        self.length = self.length.wrapping_sub(1);

        trace!(
            pool_id = self.pool_id,
            block = handle.coordinates().block_index(),
            row = handle.coordinates().row_index(),
            "released row"
        );

        Ok(())
    }

    fn check_origin(&self, handle: RowHandle) -> Result<()> {
        if handle.pool_id() == self.pool_id {
            Ok(())
        } else {
            Err(Error::invalid_handle(handle, HandleProblem::ForeignPool))
        }
    }

    fn is_free(&self, coordinates: RowCoordinates) -> bool {
        self.blocks
            .get(coordinates.block_index())
            .is_some_and(|block| block.is_free(coordinates.row_index()))
    }

    /// Next-fit search for a free row other than `from`.
    ///
    /// Scans forward from the row after `from` to the end of the last block, then wraps around
    /// and scans from the first block up to (excluding) `from`.
    fn next_free_after(&self, from: RowCoordinates) -> Option<RowCoordinates> {
        let forward = self
            .blocks
            .iter()
            .enumerate()
            .skip(from.block_index())
            .find_map(|(block_index, block)| {
                let start = if block_index == from.block_index() {
                    // Cannot overflow because row_index is within the block.
                    from.row_index().wrapping_add(1)
                } else {
                    0
                };

                block
                    .first_free(start..block.capacity())
                    .map(|row_index| RowCoordinates::from_parts(block_index, row_index))
            });

        forward.or_else(|| {
            self.blocks
                .iter()
                .enumerate()
                .take(from.block_index().saturating_add(1))
                .find_map(|(block_index, block)| {
                    let end = if block_index == from.block_index() {
                        from.row_index()
                    } else {
                        block.capacity()
                    };

                    block
                        .first_free(0..end)
                        .map(|row_index| RowCoordinates::from_parts(block_index, row_index))
                })
        })
    }

    /// Appends a new block and returns the coordinates of its first row.
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use.
    fn grow(&mut self) -> Result<RowCoordinates> {
        let rows = self.growth.next_block_size();

        self.blocks
            .try_reserve(1)
            .map_err(|source| Error::OutOfMemory {
                rows: rows.get(),
                source,
            })?;

        let block = AllocationBlock::new(rows, &self.reset)?;
        self.blocks.push(block);
        self.growth.advance();

        // This can never wrap around because we just added a block, so len() is at least 1.
        let block_index = self.blocks.len().wrapping_sub(1);

        debug!(
            pool_id = self.pool_id,
            block_index,
            rows = rows.get(),
            next_block_size = self.growth.next_block_size().get(),
            "grew object pool"
        );

        Ok(RowCoordinates::from_parts(block_index, 0))
    }

    #[cfg(test)]
    pub(crate) fn integrity_check(&self) {
        for block in &self.blocks {
            block.integrity_check();
        }

        assert!(
            self.blocks.get(self.cursor.block_index()).is_some_and(|block| {
                self.cursor.row_index() < block.capacity()
            }),
            "cursor {:?} points outside of the pool",
            self.cursor
        );

        assert_eq!(
            self.length,
            self.blocks.iter().map(AllocationBlock::len).sum::<usize>()
        );
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("pool_id", &self.pool_id)
            .field("block_count", &self.blocks.len())
            .field("length", &self.length)
            .field("cursor", &self.cursor)
            .field("growth", &self.growth)
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

impl<T> Drop for ObjectPool<T> {
    fn drop(&mut self) {
        debug!(
            pool_id = self.pool_id,
            block_count = self.blocks.len(),
            live_rows = self.length,
            "dropping object pool"
        );

        // The blocks themselves are released after this returns, even if we panic here.
        //
        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if !thread::panicking() && matches!(self.drop_policy, DropPolicy::MustNotDropLiveRows) {
            assert!(
                self.length == 0,
                "dropped an ObjectPool with {} live rows - this is forbidden by DropPolicy::MustNotDropLiveRows",
                self.length
            );
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::rc::Rc;

    use new_zealand::nz;
    use static_assertions::assert_not_impl_any;

    use super::*;

    assert_not_impl_any!(ObjectPool<u32>: Send, Sync);

    fn pool_of(initial: NonZero<usize>) -> ObjectPool<u64> {
        ObjectPool::builder().initial_block_size(initial).build()
    }

    #[test]
    fn smoke_test() {
        let mut pool = pool_of(nz!(4));

        assert_eq!(pool.len(), 0);
        assert!(pool.is_empty());

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let c = pool.acquire().unwrap();

        *pool.get_mut(a).unwrap() = 1;
        *pool.get_mut(b).unwrap() = 2;
        *pool.get_mut(c).unwrap() = 3;

        assert_eq!(pool.len(), 3);
        assert!(!pool.is_empty());

        pool.release(b).unwrap();

        let d = pool.acquire_with(|payload| *payload = 4).unwrap();

        assert_eq!(*pool.get(a).unwrap(), 1);
        assert_eq!(*pool.get(c).unwrap(), 3);
        assert_eq!(*pool.get(d).unwrap(), 4);

        pool.integrity_check();
    }

    #[test]
    fn cursor_follows_next_fit() {
        let mut pool = pool_of(nz!(4));

        assert_eq!(pool.cursor(), RowCoordinates::from_parts(0, 0));

        let a = pool.acquire().unwrap();
        assert_eq!(a.coordinates(), RowCoordinates::from_parts(0, 0));
        assert_eq!(pool.cursor(), RowCoordinates::from_parts(0, 1));

        let b = pool.acquire().unwrap();
        assert_eq!(b.coordinates(), RowCoordinates::from_parts(0, 1));
        assert_eq!(pool.cursor(), RowCoordinates::from_parts(0, 2));

        // Releasing a row behind the cursor does not move the cursor.
        pool.release(a).unwrap();
        assert_eq!(pool.cursor(), RowCoordinates::from_parts(0, 2));

        let c = pool.acquire().unwrap();
        assert_eq!(c.coordinates(), RowCoordinates::from_parts(0, 2));

        let d = pool.acquire().unwrap();
        assert_eq!(d.coordinates(), RowCoordinates::from_parts(0, 3));

        // The forward scan found nothing, so the search wrapped around to the released row.
        assert_eq!(pool.cursor(), RowCoordinates::from_parts(0, 0));

        let e = pool.acquire().unwrap();
        assert_eq!(e.coordinates(), RowCoordinates::from_parts(0, 0));
        assert_eq!(pool.block_count(), 1);

        pool.integrity_check();
    }

    #[test]
    fn full_pool_keeps_cursor_until_next_acquire() {
        let mut pool = pool_of(nz!(2));

        _ = pool.acquire().unwrap();
        let last = pool.acquire().unwrap();

        // Nothing is free but the pool has not grown yet.
        assert_eq!(pool.block_count(), 1);
        assert_eq!(pool.cursor(), last.coordinates());

        let grown = pool.acquire().unwrap();
        assert_eq!(pool.block_count(), 2);
        assert_eq!(grown.coordinates(), RowCoordinates::from_parts(1, 0));
        assert_eq!(pool.cursor(), RowCoordinates::from_parts(1, 1));
    }

    #[test]
    fn wraparound_prefers_earlier_blocks_after_forward_scan() {
        let mut pool = pool_of(nz!(2));

        let handles: Vec<_> = (0..4).map(|_| pool.acquire().unwrap()).collect();
        assert_eq!(pool.block_capacities().collect::<Vec<_>>(), [2, 2]);

        // Free a row in the first block while the cursor is at the end of the second block.
        pool.release(handles[1]).unwrap();

        let reused = pool.acquire().unwrap();
        assert_eq!(reused.coordinates(), RowCoordinates::from_parts(0, 1));
        assert_eq!(pool.block_count(), 2);
    }

    #[test]
    fn growth_sequence_repeat_initial() {
        let mut pool = pool_of(nz!(3));

        for _ in 0..(3 + 3 + 6 + 12 + 1) {
            _ = pool.acquire().unwrap();
        }

        assert_eq!(
            pool.block_capacities().collect::<Vec<_>>(),
            [3, 3, 6, 12, 24]
        );
        assert_eq!(pool.next_block_size().get(), 48);
    }

    #[test]
    fn growth_sequence_doubling() {
        let mut pool = ObjectPool::<u64>::builder()
            .initial_block_size(nz!(3))
            .growth_policy(GrowthPolicy::Doubling)
            .build();

        for _ in 0..(3 + 6 + 12 + 1) {
            _ = pool.acquire().unwrap();
        }

        assert_eq!(pool.block_capacities().collect::<Vec<_>>(), [3, 6, 12, 24]);
    }

    #[test]
    fn reset_runs_at_creation_and_release_only() {
        let calls = Rc::new(Cell::new(0_usize));

        let mut pool = ObjectPool::new(nz!(3), {
            let calls = Rc::clone(&calls);
            move |payload: &mut u64| {
                calls.set(calls.get() + 1);
                *payload = 0;
            }
        });

        assert_eq!(calls.get(), 3);

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_eq!(calls.get(), 3);

        pool.release(a).unwrap();
        assert_eq!(calls.get(), 4);

        // Growth resets every row of the new block.
        _ = pool.acquire().unwrap();
        _ = pool.acquire().unwrap();
        _ = pool.acquire().unwrap();
        assert_eq!(pool.block_count(), 2);
        assert_eq!(calls.get(), 7);

        // Rejected releases do not reset.
        assert!(pool.release(a).is_err());
        assert_eq!(calls.get(), 7);

        pool.release(b).unwrap();
        assert_eq!(calls.get(), 8);
    }

    #[test]
    fn released_payload_is_reset_before_reuse() {
        let mut pool = pool_of(nz!(1));

        let handle = pool.acquire_with(|payload| *payload = 42).unwrap();
        pool.release(handle).unwrap();

        let handle = pool.acquire().unwrap();
        assert_eq!(*pool.get(handle).unwrap(), 0);
    }

    #[test]
    fn live_handles_are_unique() {
        let mut pool = pool_of(nz!(2));

        let mut live = Vec::new();

        for round in 0..50 {
            live.push(pool.acquire().unwrap());

            if round % 3 == 0 {
                let released = live.remove(0);
                pool.release(released).unwrap();
            }

            let coordinates: HashSet<_> = live.iter().map(RowHandle::coordinates).collect();
            assert_eq!(coordinates.len(), live.len());
        }

        assert_eq!(pool.len(), live.len());
        pool.integrity_check();
    }

    #[test]
    fn payload_address_is_stable_across_growth() {
        let mut pool = pool_of(nz!(1));

        let first = pool.acquire_with(|payload| *payload = 7).unwrap();
        let before = std::ptr::from_ref(pool.get(first).unwrap());

        for _ in 0..20 {
            _ = pool.acquire().unwrap();
        }

        let after = std::ptr::from_ref(pool.get(first).unwrap());
        assert_eq!(before, after);
        assert_eq!(*pool.get(first).unwrap(), 7);
    }

    #[test]
    fn double_release_is_rejected() {
        let mut pool = pool_of(nz!(2));

        let handle = pool.acquire().unwrap();
        pool.release(handle).unwrap();

        let error = pool.release(handle).unwrap_err();
        assert_eq!(error.handle_problem(), Some(HandleProblem::NotLive));
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn stale_handle_is_rejected_after_reuse() {
        let mut pool = pool_of(nz!(1));

        let stale = pool.acquire().unwrap();
        pool.release(stale).unwrap();

        let fresh = pool.acquire().unwrap();
        assert_eq!(stale.coordinates(), fresh.coordinates());

        let error = pool.release(stale).unwrap_err();
        assert_eq!(error.handle_problem(), Some(HandleProblem::Stale));
        assert!(pool.get(stale).is_err());
        assert!(pool.contains(fresh));
        assert!(!pool.contains(stale));

        // The fresh handle still works after the rejected release.
        pool.release(fresh).unwrap();
    }

    #[test]
    fn foreign_handle_is_rejected() {
        let mut pool_a = pool_of(nz!(1));
        let mut pool_b = pool_of(nz!(1));

        let handle = pool_a.acquire().unwrap();
        let _other = pool_b.acquire().unwrap();

        let error = pool_b.release(handle).unwrap_err();
        assert_eq!(error.handle_problem(), Some(HandleProblem::ForeignPool));
        assert!(pool_b.get_mut(handle).is_err());
        assert_eq!(pool_b.len(), 1);
    }

    #[test]
    fn out_of_bounds_handle_is_rejected() {
        let mut pool = pool_of(nz!(1));

        let forged = RowHandle::new(pool.pool_id, RowCoordinates::from_parts(5, 0), 0);

        let error = pool.release(forged).unwrap_err();
        assert_eq!(error.handle_problem(), Some(HandleProblem::OutOfBounds));
    }

    #[test]
    fn exhausted_row_is_retired_and_stale_handle_stays_rejected() {
        let mut pool = pool_of(nz!(1));

        let stale = pool.acquire().unwrap();
        pool.release(stale).unwrap();

        pool.blocks[0].exhaust_generation(0);

        let last = pool.acquire().unwrap();
        assert_eq!(last.coordinates(), stale.coordinates());
        pool.release(last).unwrap();

        // The retired row is skipped, so the pool grows instead of reissuing it.
        let fresh = pool.acquire().unwrap();
        assert_eq!(fresh.coordinates(), RowCoordinates::from_parts(1, 0));
        assert_eq!(pool.block_count(), 2);

        for handle in [stale, last] {
            let error = pool.release(handle).unwrap_err();
            assert_eq!(error.handle_problem(), Some(HandleProblem::NotLive));
            assert!(!pool.contains(handle));
        }

        assert_eq!(pool.len(), 1);
        pool.integrity_check();
    }

    #[test]
    fn failed_growth_leaves_pool_unchanged() {
        let mut pool = pool_of(nz!(2));

        let first = pool.acquire_with(|payload| *payload = 1).unwrap();
        let second = pool.acquire().unwrap();

        // The next block cannot possibly be allocated.
        pool.growth = GrowthSchedule::new(
            GrowthPolicy::RepeatInitial,
            NonZero::new(usize::MAX).unwrap(),
        );

        let cursor = pool.cursor();
        let mut callback_ran = false;

        let result = pool.acquire_with(|_| callback_ran = true);

        assert!(matches!(
            result,
            Err(Error::OutOfMemory {
                rows: usize::MAX,
                ..
            })
        ));
        assert!(!callback_ran);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.block_count(), 1);
        assert_eq!(pool.cursor(), cursor);
        assert_eq!(pool.next_block_size().get(), usize::MAX);
        assert_eq!(*pool.get(first).unwrap(), 1);
        pool.integrity_check();

        // The pool keeps working once a row is free again.
        pool.release(second).unwrap();
        let reused = pool.acquire().unwrap();
        assert_eq!(reused.coordinates(), second.coordinates());
    }

    #[test]
    fn stats_reflect_storage() {
        let mut pool = pool_of(nz!(2));

        for _ in 0..3 {
            _ = pool.acquire().unwrap();
        }

        let stats = pool.stats();
        assert_eq!(stats.block_count(), 2);
        assert_eq!(stats.total_rows(), 4);
        assert_eq!(stats.live_rows(), 3);
        assert_eq!(stats.item_size(), size_of::<u64>());
        assert_eq!(stats.row_size(), AllocationBlock::<u64>::ROW_SIZE);
        assert_eq!(stats.storage_bytes(), 4 * AllocationBlock::<u64>::ROW_SIZE);
    }

    #[test]
    fn drop_with_no_live_rows_does_not_panic_if_policy_must_not_drop() {
        let mut pool = ObjectPool::<u64>::builder()
            .drop_policy(DropPolicy::MustNotDropLiveRows)
            .build();

        let handle = pool.acquire().unwrap();
        pool.release(handle).unwrap();

        drop(pool);
    }

    #[test]
    #[should_panic]
    fn drop_with_live_rows_panics_if_policy_must_not_drop() {
        let mut pool = ObjectPool::<u64>::builder()
            .drop_policy(DropPolicy::MustNotDropLiveRows)
            .build();

        _ = pool.acquire().unwrap();

        drop(pool);
    }

    #[test]
    fn drop_with_live_rows_is_fine_by_default() {
        let mut pool = pool_of(nz!(2));

        _ = pool.acquire().unwrap();
        _ = pool.acquire().unwrap();
        _ = pool.acquire().unwrap();

        drop(pool);
    }

    #[test]
    fn debug_output_names_type() {
        let pool = pool_of(nz!(1));
        let output = format!("{pool:?}");

        assert!(output.contains("ObjectPool"));
        assert!(output.contains("block_count"));
    }
}
