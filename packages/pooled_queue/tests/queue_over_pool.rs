//! Queue behavior observed through the node pool it is stored in.
#![allow(
    clippy::arithmetic_side_effects,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]

use std::rc::Rc;

use new_zealand::nz;
use pooled_queue::{PooledQueue, node_pool};

#[test]
fn pool_grows_once_then_serves_steady_state() {
    let mut pool = node_pool::<u64>(nz!(4));
    let mut queue = PooledQueue::new();

    // Backlog of 6 needs a second block of 4.
    for value in 0..6 {
        queue.push(&mut pool, value).unwrap();
    }

    assert_eq!(pool.block_capacities().collect::<Vec<_>>(), [4, 4]);

    for value in 6..1_000 {
        queue.push(&mut pool, value).unwrap();
        assert_eq!(queue.unshift(&mut pool).unwrap(), Some(value - 6));
    }

    assert_eq!(pool.block_count(), 2);
    assert_eq!(queue.len(), 6);
}

#[test]
fn free_drops_queued_values() {
    let mut pool = node_pool::<Rc<()>>(nz!(2));
    let mut queue = PooledQueue::new();
    let tracker = Rc::new(());

    for _ in 0..3 {
        queue.push(&mut pool, Rc::clone(&tracker)).unwrap();
    }

    assert_eq!(Rc::strong_count(&tracker), 4);

    queue.free(&mut pool).unwrap();

    assert_eq!(Rc::strong_count(&tracker), 1);
    assert!(pool.is_empty());
}

#[test]
fn dropping_pool_drops_values_of_unfreed_queues() {
    let mut pool = node_pool::<Rc<()>>(nz!(2));
    let mut queue = PooledQueue::new();
    let tracker = Rc::new(());

    queue.push(&mut pool, Rc::clone(&tracker)).unwrap();
    queue.push(&mut pool, Rc::clone(&tracker)).unwrap();

    drop(queue);
    assert_eq!(pool.len(), 2);

    drop(pool);
    assert_eq!(Rc::strong_count(&tracker), 1);
}
