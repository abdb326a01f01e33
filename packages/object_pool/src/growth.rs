use std::num::NonZero;

use new_zealand::nz;

/// Determines the row count of each block the pool appends when it runs out of free rows.
///
/// The very first block always has the initial block size `S` given at pool creation.
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use object_pool::{GrowthPolicy, ObjectPool};
///
/// let pool = ObjectPool::<u64>::builder()
///     .initial_block_size(nz!(4))
///     .growth_policy(GrowthPolicy::Doubling)
///     .build();
///
/// assert_eq!(pool.next_block_size().get(), 8);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum GrowthPolicy {
    /// Block sizes follow `S, S, 2S, 4S, 8S, ...`.
    ///
    /// The first growth repeats the initial size and doubling only starts afterwards.
    /// This is the default and matches the block sequence of established consumers.
    #[default]
    RepeatInitial,

    /// Block sizes follow `S, 2S, 4S, 8S, ...`.
    Doubling,
}

/// Hands out the size of the next block according to a [`GrowthPolicy`].
#[derive(Debug)]
pub(crate) struct GrowthSchedule {
    policy: GrowthPolicy,
    next_block_size: NonZero<usize>,
}

impl GrowthSchedule {
    /// Creates the schedule for a pool whose first block has `initial_block_size` rows.
    #[must_use]
    pub(crate) fn new(policy: GrowthPolicy, initial_block_size: NonZero<usize>) -> Self {
        let next_block_size = match policy {
            GrowthPolicy::RepeatInitial => initial_block_size,
            GrowthPolicy::Doubling => double(initial_block_size),
        };

        Self {
            policy,
            next_block_size,
        }
    }

    #[must_use]
    pub(crate) fn policy(&self) -> GrowthPolicy {
        self.policy
    }

    /// The row count of the block that the next growth event will create.
    #[must_use]
    pub(crate) fn next_block_size(&self) -> NonZero<usize> {
        self.next_block_size
    }

    /// Records that a block of [`next_block_size()`](Self::next_block_size) rows was created.
    pub(crate) fn advance(&mut self) {
        self.next_block_size = double(self.next_block_size);
    }
}

// Saturates instead of overflowing; a pool that large has failed to allocate long before.
fn double(size: NonZero<usize>) -> NonZero<usize> {
    size.saturating_mul(nz!(2))
}

#[cfg(test)]
#[allow(
    clippy::arithmetic_side_effects,
    clippy::integer_division,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use super::*;

    fn sequence(policy: GrowthPolicy, initial: NonZero<usize>, count: usize) -> Vec<usize> {
        let mut schedule = GrowthSchedule::new(policy, initial);

        let mut sizes = vec![initial.get()];

        for _ in 0..count {
            sizes.push(schedule.next_block_size().get());
            schedule.advance();
        }

        sizes
    }

    #[test]
    fn repeat_initial_issues_initial_size_twice() {
        assert_eq!(
            sequence(GrowthPolicy::RepeatInitial, nz!(3), 4),
            vec![3, 3, 6, 12, 24]
        );
    }

    #[test]
    fn doubling_doubles_from_the_start() {
        assert_eq!(
            sequence(GrowthPolicy::Doubling, nz!(3), 4),
            vec![3, 6, 12, 24, 48]
        );
    }

    #[test]
    fn default_is_repeat_initial() {
        assert_eq!(GrowthPolicy::default(), GrowthPolicy::RepeatInitial);
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        let huge = NonZero::new(usize::MAX / 2 + 1).unwrap();
        let mut schedule = GrowthSchedule::new(GrowthPolicy::Doubling, huge);

        assert_eq!(schedule.next_block_size().get(), usize::MAX);

        schedule.advance();
        assert_eq!(schedule.next_block_size().get(), usize::MAX);
    }

    #[test]
    fn remembers_policy() {
        let schedule = GrowthSchedule::new(GrowthPolicy::Doubling, nz!(1));
        assert_eq!(schedule.policy(), GrowthPolicy::Doubling);
    }
}
