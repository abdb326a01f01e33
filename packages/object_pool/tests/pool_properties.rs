//! Behavioral properties of `ObjectPool`, exercised purely through the public API.
#![allow(
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing,
    clippy::integer_division,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]

use std::cell::Cell;
use std::collections::HashSet;
use std::num::NonZero;

use new_zealand::nz;
use object_pool::{GrowthPolicy, HandleProblem, ObjectPool, RowHandle};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

thread_local! {
    static TRACKED_DROPS: Cell<usize> = const { Cell::new(0) };
}

/// Counts how many instances have been dropped on the current thread.
#[derive(Default)]
struct Tracked {
    value: u64,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        TRACKED_DROPS.with(|drops| drops.set(drops.get() + 1));
    }
}

fn tracked_drops() -> usize {
    TRACKED_DROPS.with(Cell::get)
}

fn pool_of(initial: NonZero<usize>) -> ObjectPool<u64> {
    ObjectPool::builder().initial_block_size(initial).build()
}

#[test]
fn initial_two_grows_only_on_third_acquire() {
    let mut pool = pool_of(nz!(2));

    let a = pool.acquire().unwrap();
    let b = pool.acquire().unwrap();
    assert_eq!(pool.block_count(), 1);
    assert_ne!(a.coordinates(), b.coordinates());

    let c = pool.acquire().unwrap();
    assert_eq!(pool.block_capacities().collect::<Vec<_>>(), [2, 2]);
    assert_eq!(c.coordinates().block_index(), 1);
    assert_eq!(c.coordinates().row_index(), 0);
}

#[test]
fn initial_one_reuses_released_row_without_growing() {
    let mut pool = pool_of(nz!(1));

    let first = pool.acquire().unwrap();
    pool.release(first).unwrap();

    let second = pool.acquire().unwrap();
    assert_eq!(first.coordinates(), second.coordinates());
    assert_eq!(pool.block_count(), 1);
}

#[test]
fn released_row_is_reused_before_growing() {
    let mut pool = pool_of(nz!(4));

    let handles: Vec<_> = (0..4).map(|_| pool.acquire().unwrap()).collect();
    pool.release(handles[1]).unwrap();

    let reused = pool.acquire().unwrap();
    assert_eq!(reused.coordinates(), handles[1].coordinates());
    assert_eq!(pool.block_count(), 1);
}

#[test]
fn full_pool_wraps_around_to_released_row() {
    let mut pool = pool_of(nz!(2));

    // Blocks of 2, 2 and 4 rows, every row live.
    let handles: Vec<_> = (0..8).map(|_| pool.acquire().unwrap()).collect();
    assert_eq!(pool.block_capacities().collect::<Vec<_>>(), [2, 2, 4]);

    pool.release(handles[1]).unwrap();

    let reused = pool.acquire().unwrap();
    assert_eq!(reused.coordinates(), handles[1].coordinates());
    assert_eq!(reused.coordinates().block_index(), 0);
    assert_eq!(reused.coordinates().row_index(), 1);
    assert_eq!(pool.block_count(), 3);
}

#[test]
fn capacity_never_grows_while_rows_are_free() {
    let mut pool = pool_of(nz!(4));
    let mut live = Vec::new();

    for round in 0..200 {
        let capacity_before = pool.capacity();
        let had_free_row = pool.len() < capacity_before;

        live.push(pool.acquire().unwrap());

        if had_free_row {
            assert_eq!(pool.capacity(), capacity_before, "round {round} grew needlessly");
        } else {
            assert!(pool.capacity() > capacity_before);
        }

        if round % 2 == 1 {
            pool.release(live.swap_remove(0)).unwrap();
        }
    }
}

#[test]
fn block_sizes_follow_repeat_initial_policy() {
    let mut pool = pool_of(nz!(5));

    for _ in 0..(5 + 5 + 10 + 20 + 1) {
        _ = pool.acquire().unwrap();
    }

    assert_eq!(
        pool.block_capacities().collect::<Vec<_>>(),
        [5, 5, 10, 20, 40]
    );
}

#[test]
fn block_sizes_follow_doubling_policy() {
    let mut pool = ObjectPool::<u64>::builder()
        .initial_block_size(nz!(5))
        .growth_policy(GrowthPolicy::Doubling)
        .build();

    for _ in 0..(5 + 10 + 20 + 1) {
        _ = pool.acquire().unwrap();
    }

    assert_eq!(pool.block_capacities().collect::<Vec<_>>(), [5, 10, 20, 40]);
}

#[test]
fn random_churn_keeps_live_rows_unique() {
    let mut rng = SmallRng::seed_from_u64(0x0b1e_c7);
    let mut pool = pool_of(nz!(3));
    let mut live: Vec<(RowHandle, u64)> = Vec::new();

    for step in 0..5_000_u64 {
        if live.is_empty() || rng.random_bool(0.6) {
            let handle = pool.acquire_with(|payload| *payload = step).unwrap();
            live.push((handle, step));
        } else {
            let index = rng.random_range(0..live.len());
            let (handle, expected) = live.swap_remove(index);

            assert_eq!(*pool.get(handle).unwrap(), expected);
            pool.release(handle).unwrap();
        }

        assert_eq!(pool.len(), live.len());
    }

    let distinct: HashSet<_> = live.iter().map(|(handle, _)| handle.coordinates()).collect();
    assert_eq!(distinct.len(), live.len());

    // Payloads were never overwritten by another consumer.
    for (handle, expected) in &live {
        assert_eq!(*pool.get(*handle).unwrap(), *expected);
    }
}

#[test]
fn released_rows_come_back_reset() {
    let mut pool = ObjectPool::<Vec<u32>>::builder()
        .initial_block_size(nz!(2))
        .reset_with(Vec::clear)
        .build();

    let handles: Vec<_> = (0..2)
        .map(|i| pool.acquire_with(|payload| payload.extend([i, i + 1])).unwrap())
        .collect();

    for handle in handles {
        pool.release(handle).unwrap();
    }

    for _ in 0..2 {
        let handle = pool.acquire().unwrap();
        assert!(pool.get(handle).unwrap().is_empty());
    }

    assert_eq!(pool.block_count(), 1);
}

#[test]
fn invalid_releases_leave_pool_untouched() {
    let mut pool = pool_of(nz!(2));
    let mut other = pool_of(nz!(2));

    let kept = pool.acquire_with(|payload| *payload = 11).unwrap();
    let released = pool.acquire().unwrap();
    pool.release(released).unwrap();

    let foreign = other.acquire().unwrap();

    let cursor = pool.cursor();
    let stats_before = pool.stats();

    assert_eq!(
        pool.release(released).unwrap_err().handle_problem(),
        Some(HandleProblem::NotLive)
    );
    assert_eq!(
        pool.release(foreign).unwrap_err().handle_problem(),
        Some(HandleProblem::ForeignPool)
    );

    assert_eq!(pool.cursor(), cursor);
    assert_eq!(pool.stats(), stats_before);
    assert_eq!(*pool.get(kept).unwrap(), 11);
}

#[test]
fn dropping_pool_drops_every_row_once() {
    let drops_before = tracked_drops();

    {
        let mut pool = ObjectPool::<Tracked>::builder()
            .initial_block_size(nz!(2))
            // Mutating in place avoids creating and dropping replacement values.
            .reset_with(|payload: &mut Tracked| payload.value = 0)
            .build();

        let handles: Vec<_> = (0..5)
            .map(|i| pool.acquire_with(|payload| payload.value = i).unwrap())
            .collect();

        pool.release(handles[0]).unwrap();
        pool.release(handles[3]).unwrap();

        assert_eq!(pool.capacity(), 8);
        assert_eq!(pool.get(handles[1]).unwrap().value, 1);
        assert_eq!(tracked_drops(), drops_before);
    }

    // Every row, live or free, is dropped exactly once with the pool.
    assert_eq!(tracked_drops() - drops_before, 8);
}
