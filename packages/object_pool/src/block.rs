use std::iter;
use std::num::NonZero;
use std::ops::Range;

use crate::{Error, HandleProblem, Reset, Result};

/// Fixed-capacity storage for a contiguous run of rows.
///
/// Blocks are never resized. When a pool runs out of free rows it appends a new block
/// instead, so the payload of a row never moves for as long as the block exists.
#[derive(Debug)]
pub(crate) struct AllocationBlock<T> {
    /// Boxed slice rather than `Vec` because the row count is fixed at creation.
    rows: Box<[Row<T>]>,

    /// Number of live rows, so that pool statistics do not need to scan every row.
    live_count: usize,
}

/// A tagged slot: one payload plus the bookkeeping that says whether it is handed out.
#[derive(Debug)]
struct Row<T> {
    liveness: Liveness,

    /// Bumped on every release so that earlier handles to this row stop validating.
    generation: u64,

    payload: T,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Liveness {
    Free,
    Live,

    /// The generation counter is exhausted. The row is never handed out again, so no
    /// generation value can ever be reissued to a second consumer.
    Retired,
}

impl<T> Row<T> {
    fn is_free(&self) -> bool {
        self.liveness == Liveness::Free
    }

    fn check(&self, generation: u64) -> std::result::Result<(), HandleProblem> {
        match self.liveness {
            Liveness::Free | Liveness::Retired => Err(HandleProblem::NotLive),
            Liveness::Live if self.generation != generation => Err(HandleProblem::Stale),
            Liveness::Live => Ok(()),
        }
    }
}

impl<T> AllocationBlock<T> {
    /// Size in bytes of one row: the payload plus its liveness and generation bookkeeping.
    pub(crate) const ROW_SIZE: usize = size_of::<Row<T>>();

    /// Creates a block of `capacity` rows. Every row is free and its payload was created
    /// through `reset`.
    pub(crate) fn new(capacity: NonZero<usize>, reset: &Reset<T>) -> Result<Self> {
        let mut rows = Vec::new();

        rows.try_reserve_exact(capacity.get())
            .map_err(|source| Error::OutOfMemory {
                rows: capacity.get(),
                source,
            })?;

        rows.extend(
            iter::repeat_with(|| Row {
                liveness: Liveness::Free,
                generation: 0,
                payload: reset.create(),
            })
            .take(capacity.get()),
        );

        Ok(Self {
            rows: rows.into_boxed_slice(),
            live_count: 0,
        })
    }

    #[must_use]
    pub(crate) fn capacity(&self) -> usize {
        self.rows.len()
    }

    /// Number of live rows in the block.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Only feeds debug assertions and statistics.
    pub(crate) fn len(&self) -> usize {
        self.live_count
    }

    #[must_use]
    pub(crate) fn is_free(&self, row_index: usize) -> bool {
        self.rows.get(row_index).is_some_and(Row::is_free)
    }

    /// Returns the index of the first free row within `range`, if any.
    ///
    /// The end of the range is clamped to the block capacity.
    #[must_use]
    pub(crate) fn first_free(&self, range: Range<usize>) -> Option<usize> {
        let start = range.start;
        let end = range.end.min(self.capacity());

        self.rows
            .get(start..end)?
            .iter()
            .position(Row::is_free)
            // Cannot overflow because the result is a row index within the block.
            .map(|offset| start.wrapping_add(offset))
    }

    /// Marks a free row as live and returns its current generation.
    ///
    /// # Panics
    ///
    /// Panics if the row is out of bounds or already live. Either means the pool
    /// has lost track of its own bookkeeping.
    pub(crate) fn mark_live(&mut self, row_index: usize) -> u64 {
        let capacity = self.capacity();

        let row = self.rows.get_mut(row_index).unwrap_or_else(|| {
            panic!("row {row_index} is out of bounds in block of capacity {capacity}")
        });

        assert!(
            row.is_free(),
            "mark_live({row_index}) row was already live in block of capacity {capacity}"
        );

        row.liveness = Liveness::Live;

        // Cannot overflow because live_count never exceeds the row count.
        self.live_count = self.live_count.wrapping_add(1);

        row.generation
    }

    pub(crate) fn payload(
        &self,
        row_index: usize,
        generation: u64,
    ) -> std::result::Result<&T, HandleProblem> {
        let row = self
            .rows
            .get(row_index)
            .ok_or(HandleProblem::OutOfBounds)?;

        row.check(generation)?;
        Ok(&row.payload)
    }

    pub(crate) fn payload_mut(
        &mut self,
        row_index: usize,
        generation: u64,
    ) -> std::result::Result<&mut T, HandleProblem> {
        let row = self
            .rows
            .get_mut(row_index)
            .ok_or(HandleProblem::OutOfBounds)?;

        row.check(generation)?;
        Ok(&mut row.payload)
    }

    /// Resets the payload of a live row and marks the row free.
    ///
    /// A row whose generation counter is exhausted is retired instead of freed.
    /// The row is left untouched if `generation` does not identify its current live period.
    pub(crate) fn release(
        &mut self,
        row_index: usize,
        generation: u64,
        reset: &Reset<T>,
    ) -> std::result::Result<(), HandleProblem> {
        let row = self
            .rows
            .get_mut(row_index)
            .ok_or(HandleProblem::OutOfBounds)?;

        row.check(generation)?;

        reset.apply(&mut row.payload);

        match row.generation.checked_add(1) {
            Some(next) => {
                row.generation = next;
                row.liveness = Liveness::Free;
            }
            None => row.liveness = Liveness::Retired,
        }

        // Cannot wrap around because we just verified the row was live.
        self.live_count = self.live_count.wrapping_sub(1);

        Ok(())
    }

    /// Fast-forwards the generation counter of a row to its last value.
    #[cfg(test)]
    pub(crate) fn exhaust_generation(&mut self, row_index: usize) {
        self.rows
            .get_mut(row_index)
            .expect("test addresses an existing row")
            .generation = u64::MAX;
    }

    #[cfg(test)]
    pub(crate) fn integrity_check(&self) {
        let observed_live = self
            .rows
            .iter()
            .filter(|row| row.liveness == Liveness::Live)
            .count();

        assert_eq!(
            self.live_count,
            observed_live,
            "live_count {} does not match observed live rows {} in block of capacity {}",
            self.live_count,
            observed_live,
            self.capacity()
        );
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
    use std::rc::Rc;

    use new_zealand::nz;

    use super::*;

    fn counting_reset(calls: &Rc<Cell<usize>>) -> Reset<u32> {
        let calls = Rc::clone(calls);

        Reset::with(move |payload: &mut u32| {
            calls.set(calls.get() + 1);
            *payload = 0;
        })
    }

    #[test]
    fn new_block_is_reset_and_free() {
        let calls = Rc::new(Cell::new(0));
        let block = AllocationBlock::new(nz!(5), &counting_reset(&calls)).unwrap();

        assert_eq!(calls.get(), 5);
        assert_eq!(block.capacity(), 5);
        assert_eq!(block.len(), 0);

        for row in 0..5 {
            assert!(block.is_free(row));
        }

        block.integrity_check();
    }

    #[test]
    fn first_free_respects_range() {
        let mut block = AllocationBlock::new(nz!(4), &Reset::<u32>::to_default()).unwrap();

        _ = block.mark_live(0);
        _ = block.mark_live(2);

        assert_eq!(block.first_free(0..4), Some(1));
        assert_eq!(block.first_free(2..4), Some(3));
        assert_eq!(block.first_free(0..1), None);
        assert_eq!(block.first_free(2..3), None);
        assert_eq!(block.first_free(4..4), None);

        // The end is clamped to capacity.
        assert_eq!(block.first_free(3..100), Some(3));
    }

    #[test]
    fn first_free_on_inverted_range_is_none() {
        let block = AllocationBlock::new(nz!(4), &Reset::<u32>::to_default()).unwrap();

        assert_eq!(block.first_free(Range { start: 3, end: 1 }), None);
    }

    #[test]
    fn mark_live_then_release() {
        let calls = Rc::new(Cell::new(0));
        let reset = counting_reset(&calls);
        let mut block = AllocationBlock::new(nz!(2), &reset).unwrap();
        calls.set(0);

        let generation = block.mark_live(1);
        assert!(!block.is_free(1));
        assert_eq!(block.len(), 1);

        *block.payload_mut(1, generation).unwrap() = 99;
        assert_eq!(*block.payload(1, generation).unwrap(), 99);

        // Acquisition does not reset.
        assert_eq!(calls.get(), 0);

        block.release(1, generation, &reset).unwrap();
        assert!(block.is_free(1));
        assert_eq!(block.len(), 0);
        assert_eq!(calls.get(), 1);

        block.integrity_check();
    }

    #[test]
    fn release_bumps_generation() {
        let reset = Reset::<u32>::to_default();
        let mut block = AllocationBlock::new(nz!(1), &reset).unwrap();

        let first = block.mark_live(0);
        block.release(0, first, &reset).unwrap();

        let second = block.mark_live(0);
        assert_ne!(first, second);

        assert_eq!(
            block.release(0, first, &reset),
            Err(HandleProblem::Stale)
        );
        assert_eq!(block.payload(0, first), Err(HandleProblem::Stale));

        block.release(0, second, &reset).unwrap();
    }

    #[test]
    fn exhausted_generation_retires_row() {
        let reset = Reset::<u32>::to_default();
        let mut block = AllocationBlock::new(nz!(2), &reset).unwrap();

        let stale = block.mark_live(0);
        block.release(0, stale, &reset).unwrap();

        block.exhaust_generation(0);

        let last = block.mark_live(0);
        assert_eq!(last, u64::MAX);
        block.release(0, last, &reset).unwrap();

        // The row can no longer be handed out, so no earlier generation is ever reissued.
        assert!(!block.is_free(0));
        assert_eq!(block.first_free(0..2), Some(1));
        assert_eq!(block.len(), 0);

        assert_eq!(block.release(0, stale, &reset), Err(HandleProblem::NotLive));
        assert_eq!(block.release(0, last, &reset), Err(HandleProblem::NotLive));
        assert_eq!(block.payload(0, 0), Err(HandleProblem::NotLive));

        block.integrity_check();
    }

    #[test]
    fn double_release_is_rejected() {
        let calls = Rc::new(Cell::new(0));
        let reset = counting_reset(&calls);
        let mut block = AllocationBlock::new(nz!(1), &reset).unwrap();

        let generation = block.mark_live(0);
        block.release(0, generation, &reset).unwrap();
        let calls_after_release = calls.get();

        assert_eq!(
            block.release(0, generation, &reset),
            Err(HandleProblem::NotLive)
        );

        // A rejected release must not run the reset callback.
        assert_eq!(calls.get(), calls_after_release);
        assert_eq!(block.len(), 0);
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let reset = Reset::<u32>::to_default();
        let mut block = AllocationBlock::new(nz!(1), &reset).unwrap();

        assert_eq!(block.payload(1, 0), Err(HandleProblem::OutOfBounds));
        assert_eq!(block.payload_mut(1, 0), Err(HandleProblem::OutOfBounds));
        assert_eq!(
            block.release(1, 0, &reset),
            Err(HandleProblem::OutOfBounds)
        );
    }

    #[test]
    #[should_panic]
    fn mark_live_twice_panics() {
        let mut block = AllocationBlock::new(nz!(1), &Reset::<u32>::to_default()).unwrap();

        _ = block.mark_live(0);
        _ = block.mark_live(0);
    }

    #[test]
    #[should_panic]
    fn mark_live_out_of_bounds_panics() {
        let mut block = AllocationBlock::new(nz!(1), &Reset::<u32>::to_default()).unwrap();

        _ = block.mark_live(1);
    }

    #[test]
    fn payload_addresses_are_stable() {
        let reset = Reset::<u64>::to_default();
        let mut block = AllocationBlock::new(nz!(3), &reset).unwrap();

        let generation = block.mark_live(2);
        let before = std::ptr::from_ref(block.payload(2, generation).unwrap());

        _ = block.mark_live(0);
        _ = block.mark_live(1);

        let after = std::ptr::from_ref(block.payload(2, generation).unwrap());
        assert_eq!(before, after);
    }

    #[test]
    fn row_size_includes_bookkeeping() {
        assert!(AllocationBlock::<u64>::ROW_SIZE > size_of::<u64>());
    }

    #[test]
    fn huge_block_reports_out_of_memory() {
        let result = AllocationBlock::new(
            NonZero::new(usize::MAX).unwrap(),
            &Reset::<u64>::to_default(),
        );

        assert!(matches!(
            result,
            Err(Error::OutOfMemory {
                rows: usize::MAX,
                ..
            })
        ));
    }
}
