//! Basic usage example for `ObjectPool`.
//!
//! This example demonstrates how rows are acquired, reused after release and how the pool
//! grows block by block once every row is live.

use new_zealand::nz;
use object_pool::{ObjectPool, RowHandle};

#[derive(Debug, Default)]
struct Order {
    id: u64,
    quantity: u32,
    note: String,
}

fn main() -> Result<(), object_pool::Error> {
    let mut pool = ObjectPool::<Order>::builder()
        .initial_block_size(nz!(2))
        .reset_with(|order: &mut Order| {
            order.id = 0;
            order.quantity = 0;
            // Keep the string allocation for the next consumer.
            order.note.clear();
        })
        .build();

    println!(
        "Created pool with {} blocks and capacity {}",
        pool.block_count(),
        pool.capacity()
    );

    let mut orders: Vec<RowHandle> = Vec::new();

    // Blocks of 2, 2 and 4 rows: eight orders fill the pool exactly.
    for id in 1..=8 {
        let handle = pool.acquire_with(|order| {
            order.id = id;
            order.quantity = 10;
            order.note.push_str("express");
        })?;

        println!(
            "Order {id} stored at {:?}; blocks: {:?}",
            handle.coordinates(),
            pool.block_capacities().collect::<Vec<_>>()
        );

        orders.push(handle);
    }

    // Every row is live, so the next-fit search wraps around to the first block and finds
    // the released row of the second order instead of growing the pool.
    let second = orders.remove(1);
    pool.release(second)?;

    let blocks_before = pool.block_count();
    let replacement = pool.acquire()?;
    println!(
        "Replacement order reuses {:?} (released row was {:?}), blocks {} -> {}, payload after reset: {:?}",
        replacement.coordinates(),
        second.coordinates(),
        blocks_before,
        pool.block_count(),
        pool.get(replacement)?
    );

    // Releasing the same handle twice is detected instead of corrupting the pool.
    match pool.release(second) {
        Ok(()) => println!("Unexpectedly released twice"),
        Err(error) => println!("Second release rejected: {error}"),
    }

    let stats = pool.stats();
    println!(
        "Pool has {} live rows out of {} in {} blocks ({} bytes of row storage)",
        stats.live_rows(),
        stats.total_rows(),
        stats.block_count(),
        stats.storage_bytes()
    );

    Ok(())
}
