/// Location of a row within an [`ObjectPool`][crate::ObjectPool].
///
/// Blocks are numbered in creation order and never reordered, so coordinates
/// remain meaningful for the whole lifetime of the pool.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RowCoordinates {
    /// The index of the block containing this row.
    block_index: usize,
    /// The index within the block where this row is stored.
    row_index: usize,
}

impl RowCoordinates {
    #[must_use]
    pub(crate) fn from_parts(block_index: usize, row_index: usize) -> Self {
        Self {
            block_index,
            row_index,
        }
    }

    /// Returns the index of the block containing this row.
    #[must_use]
    #[inline]
    pub fn block_index(&self) -> usize {
        self.block_index
    }

    /// Returns the index within the block where this row is stored.
    #[must_use]
    #[inline]
    pub fn row_index(&self) -> usize {
        self.row_index
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(RowCoordinates: Send, Sync, Copy, std::fmt::Debug);

    #[test]
    fn parts_round_trip() {
        let coordinates = RowCoordinates::from_parts(3, 17);

        assert_eq!(coordinates.block_index(), 3);
        assert_eq!(coordinates.row_index(), 17);
    }

    #[test]
    fn equality_considers_both_parts() {
        assert_eq!(
            RowCoordinates::from_parts(1, 2),
            RowCoordinates::from_parts(1, 2)
        );
        assert_ne!(
            RowCoordinates::from_parts(1, 2),
            RowCoordinates::from_parts(2, 1)
        );
    }
}
