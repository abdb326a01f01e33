/// A point-in-time summary of the storage held by an [`ObjectPool`][crate::ObjectPool].
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use object_pool::ObjectPool;
///
/// let mut pool = ObjectPool::<u64>::builder()
///     .initial_block_size(nz!(4))
///     .build();
///
/// let _handle = pool.acquire()?;
///
/// let stats = pool.stats();
/// assert_eq!(stats.block_count(), 1);
/// assert_eq!(stats.total_rows(), 4);
/// assert_eq!(stats.live_rows(), 1);
/// assert_eq!(stats.item_size(), 8);
/// # Ok::<(), object_pool::Error>(())
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PoolStats {
    block_count: usize,
    total_rows: usize,
    live_rows: usize,
    item_size: usize,
    row_size: usize,
}

impl PoolStats {
    #[must_use]
    pub(crate) fn new(
        block_count: usize,
        total_rows: usize,
        live_rows: usize,
        item_size: usize,
        row_size: usize,
    ) -> Self {
        Self {
            block_count,
            total_rows,
            live_rows,
            item_size,
            row_size,
        }
    }

    /// Number of blocks the pool has created.
    #[must_use]
    #[inline]
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Number of rows across all blocks, live or free.
    #[must_use]
    #[inline]
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Number of rows currently handed out to consumers.
    #[must_use]
    #[inline]
    pub fn live_rows(&self) -> usize {
        self.live_rows
    }

    /// Byte size of one payload.
    #[must_use]
    #[inline]
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Byte size of one row, which is the payload plus its bookkeeping.
    #[must_use]
    #[inline]
    pub fn row_size(&self) -> usize {
        self.row_size
    }

    /// Bytes of row storage held by all blocks.
    #[must_use]
    #[inline]
    pub fn storage_bytes(&self) -> usize {
        // Cannot overflow because the storage exists in memory.
        self.total_rows.wrapping_mul(self.row_size)
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(PoolStats: Send, Sync, Copy, std::fmt::Debug);

    #[test]
    fn storage_bytes_is_rows_times_row_size() {
        let stats = PoolStats::new(2, 12, 3, 8, 16);

        assert_eq!(stats.block_count(), 2);
        assert_eq!(stats.total_rows(), 12);
        assert_eq!(stats.live_rows(), 3);
        assert_eq!(stats.item_size(), 8);
        assert_eq!(stats.row_size(), 16);
        assert_eq!(stats.storage_bytes(), 192);
    }
}
