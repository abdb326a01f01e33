use std::any::type_name;
use std::fmt;
use std::num::NonZero;

use new_zealand::nz;

use crate::{DropPolicy, GrowthPolicy, ObjectPool, Reset, Result};

/// Row count of the first block when the caller does not specify one.
pub(crate) const DEFAULT_INITIAL_BLOCK_SIZE: NonZero<usize> = nz!(8);

/// Builder for creating an instance of [`ObjectPool`].
///
/// Created through [`ObjectPool::builder()`], which creates payloads with `T::default()`, or
/// [`ObjectPool::builder_with_factory()`] for payload types without a [`Default`] impl.
///
/// All settings are optional:
///
/// * the initial block size defaults to 8 rows;
/// * released payloads are replaced with a fresh value from the factory unless a reset
///   callback is supplied;
/// * growth follows [`GrowthPolicy::RepeatInitial`];
/// * live rows are discarded on drop ([`DropPolicy::MayDropLiveRows`]).
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use object_pool::{GrowthPolicy, ObjectPool};
///
/// #[derive(Default)]
/// struct Node {
///     value: Option<u64>,
///     next: Option<usize>,
/// }
///
/// let pool = ObjectPool::<Node>::builder()
///     .initial_block_size(nz!(16))
///     .reset_with(|node: &mut Node| {
///         node.value = None;
///         node.next = None;
///     })
///     .growth_policy(GrowthPolicy::Doubling)
///     .build();
///
/// assert_eq!(pool.capacity(), 16);
/// ```
#[must_use]
pub struct ObjectPoolBuilder<T> {
    initial_block_size: NonZero<usize>,
    factory: fn() -> T,
    reset_fn: Option<Box<dyn Fn(&mut T)>>,
    growth_policy: GrowthPolicy,
    drop_policy: DropPolicy,
}

impl<T> ObjectPoolBuilder<T> {
    #[inline]
    pub(crate) fn new(factory: fn() -> T) -> Self {
        Self {
            initial_block_size: DEFAULT_INITIAL_BLOCK_SIZE,
            factory,
            reset_fn: None,
            growth_policy: GrowthPolicy::default(),
            drop_policy: DropPolicy::default(),
        }
    }

    /// Sets the row count of the first block, created together with the pool.
    ///
    /// # Examples
    ///
    /// ```
    /// use new_zealand::nz;
    /// use object_pool::ObjectPool;
    ///
    /// let pool = ObjectPool::<u32>::builder().initial_block_size(nz!(2)).build();
    /// assert_eq!(pool.capacity(), 2);
    /// ```
    #[inline]
    pub fn initial_block_size(mut self, rows: NonZero<usize>) -> Self {
        self.initial_block_size = rows;
        self
    }

    /// Sets the callback that returns a payload to its empty state.
    ///
    /// The callback runs once for every row when its block is created, on top of the factory
    /// value, and once on every release. It never runs on acquisition.
    ///
    /// # Examples
    ///
    /// ```
    /// use object_pool::ObjectPool;
    ///
    /// // Keep the vector allocation around for the next consumer.
    /// let pool = ObjectPool::<Vec<u8>>::builder()
    ///     .reset_with(Vec::clear)
    ///     .build();
    /// ```
    #[inline]
    pub fn reset_with(mut self, reset_fn: impl Fn(&mut T) + 'static) -> Self {
        self.reset_fn = Some(Box::new(reset_fn));
        self
    }

    /// Sets the [growth policy][GrowthPolicy], which decides the size of each block that is
    /// appended when the pool runs out of free rows.
    #[inline]
    pub fn growth_policy(mut self, policy: GrowthPolicy) -> Self {
        self.growth_policy = policy;
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how
    /// to treat rows that are still live when the pool is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use object_pool::{DropPolicy, ObjectPool};
    ///
    /// let pool = ObjectPool::<u32>::builder()
    ///     .drop_policy(DropPolicy::MustNotDropLiveRows)
    ///     .build();
    /// ```
    #[inline]
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if the storage for the initial block cannot be obtained. Use
    /// [`try_build()`](Self::try_build) to handle this case instead.
    #[must_use]
    #[inline]
    pub fn build(self) -> ObjectPool<T> {
        self.try_build().expect(
            "we do not intend to handle allocation failure as a real possibility - OOM results in panic",
        )
    }

    /// Builds the pool with the specified configuration, reporting storage exhaustion
    /// as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`][crate::Error::OutOfMemory] if the storage for the
    /// initial block cannot be obtained.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use object_pool::ObjectPool;
    ///
    /// let result = ObjectPool::<u64>::builder()
    ///     .initial_block_size(NonZero::new(usize::MAX).unwrap())
    ///     .try_build();
    ///
    /// assert!(result.is_err());
    /// ```
    #[inline]
    pub fn try_build(self) -> Result<ObjectPool<T>> {
        ObjectPool::new_inner(
            self.initial_block_size,
            Reset::new(self.factory, self.reset_fn),
            self.growth_policy,
            self.drop_policy,
        )
    }
}

impl<T> fmt::Debug for ObjectPoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("initial_block_size", &self.initial_block_size)
            .field("reset_fn", &self.reset_fn.is_some())
            .field("growth_policy", &self.growth_policy)
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_not_impl_any;

    use super::*;
    use crate::Error;

    // The reset callback is not required to be thread-safe.
    assert_not_impl_any!(ObjectPoolBuilder<u32>: Send, Sync);

    #[test]
    fn builder_new_creates_default_state() {
        let builder = ObjectPool::<u32>::builder();

        assert_eq!(builder.initial_block_size, DEFAULT_INITIAL_BLOCK_SIZE);
        assert_eq!(builder.growth_policy, GrowthPolicy::RepeatInitial);
        assert_eq!(builder.drop_policy, DropPolicy::MayDropLiveRows);
    }

    #[test]
    fn initial_block_size_sets_capacity() {
        let pool = ObjectPool::<u32>::builder()
            .initial_block_size(nz!(3))
            .build();

        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.block_count(), 1);
    }

    #[test]
    fn growth_policy_sets_policy_correctly() {
        let builder = ObjectPool::<u32>::builder().growth_policy(GrowthPolicy::Doubling);
        assert_eq!(builder.growth_policy, GrowthPolicy::Doubling);

        let pool = builder.build();
        assert_eq!(pool.growth_policy(), GrowthPolicy::Doubling);
    }

    #[test]
    fn drop_policy_sets_policy_correctly() {
        let builder = ObjectPool::<u32>::builder().drop_policy(DropPolicy::MustNotDropLiveRows);
        assert_eq!(builder.drop_policy, DropPolicy::MustNotDropLiveRows);

        let builder = builder.drop_policy(DropPolicy::MayDropLiveRows);
        assert_eq!(builder.drop_policy, DropPolicy::MayDropLiveRows);
    }

    #[test]
    fn reset_with_is_applied_at_creation() {
        let mut pool = ObjectPool::<u32>::builder()
            .initial_block_size(nz!(2))
            .reset_with(|payload: &mut u32| *payload = 77)
            .build();

        let handle = pool.acquire().unwrap();
        assert_eq!(*pool.get(handle).unwrap(), 77);
    }

    #[test]
    fn builder_chain_order_independence() {
        let pool1 = ObjectPool::<u64>::builder()
            .initial_block_size(nz!(5))
            .growth_policy(GrowthPolicy::Doubling)
            .build();

        let pool2 = ObjectPool::<u64>::builder()
            .growth_policy(GrowthPolicy::Doubling)
            .initial_block_size(nz!(5))
            .build();

        assert_eq!(pool1.capacity(), pool2.capacity());
        assert_eq!(pool1.next_block_size(), pool2.next_block_size());
    }

    #[test]
    fn try_build_reports_out_of_memory() {
        let result = ObjectPool::<u64>::builder()
            .initial_block_size(NonZero::new(usize::MAX).unwrap())
            .try_build();

        assert!(matches!(result, Err(Error::OutOfMemory { .. })));
    }

    #[test]
    #[should_panic]
    fn build_panics_on_out_of_memory() {
        let _pool = ObjectPool::<u64>::builder()
            .initial_block_size(NonZero::new(usize::MAX).unwrap())
            .build();
    }

    #[test]
    fn factory_serves_types_without_default() {
        #[derive(Debug, PartialEq)]
        struct Slot(u16);

        let mut pool = ObjectPool::builder_with_factory(|| Slot(5))
            .initial_block_size(nz!(1))
            .build();

        let handle = pool.acquire().unwrap();
        pool.get_mut(handle).unwrap().0 = 9;
        pool.release(handle).unwrap();

        // Without a reset callback, the released payload is replaced by a factory value.
        let handle = pool.acquire().unwrap();
        assert_eq!(*pool.get(handle).unwrap(), Slot(5));
    }

    #[test]
    fn builder_is_debug() {
        let builder = ObjectPool::<u32>::builder();
        let debug_output = format!("{builder:?}");
        assert!(debug_output.contains("ObjectPoolBuilder"));
        assert!(debug_output.contains("initial_block_size"));
    }
}
