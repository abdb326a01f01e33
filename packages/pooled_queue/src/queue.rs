use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use object_pool::{Result, RowHandle};
use tracing::debug;

use crate::NodePool;

/// A singly linked FIFO queue whose nodes live in a [`NodePool`].
///
/// The queue itself only stores handles to its first and last node. Every operation that
/// touches nodes takes the pool as a parameter, so one pool can serve any number of queues and
/// pushing onto a queue reuses the storage of values previously taken off it.
///
/// Dropping a queue without calling [`free()`](Self::free) leaves its nodes live in the pool
/// until the pool itself is dropped.
///
/// # Examples
///
/// ```rust
/// use pooled_queue::{PooledQueue, default_node_pool};
///
/// let mut pool = default_node_pool();
/// let mut queue = PooledQueue::new();
///
/// queue.push(&mut pool, "first")?;
/// queue.push(&mut pool, "second")?;
///
/// assert_eq!(queue.len(), 2);
/// assert_eq!(queue.unshift(&mut pool)?, Some("first"));
/// assert_eq!(queue.peek(&pool)?, Some(&"second"));
///
/// queue.free(&mut pool)?;
/// assert!(pool.is_empty());
/// # Ok::<(), object_pool::Error>(())
/// ```
pub struct PooledQueue<V> {
    first: Option<RowHandle>,
    last: Option<RowHandle>,
    length: usize,

    _values: PhantomData<V>,
}

impl<V> PooledQueue<V> {
    /// Creates an empty queue. No nodes are acquired until the first push.
    #[must_use]
    pub fn new() -> Self {
        Self {
            first: None,
            last: None,
            length: 0,
            _values: PhantomData,
        }
    }

    /// The number of values in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the queue holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Appends a value to the back of the queue, storing it in a node acquired from `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`][object_pool::Error::OutOfMemory] if the pool needs to grow
    /// but cannot. Returns [`Error::InvalidHandle`][object_pool::Error::InvalidHandle] if the
    /// queue's nodes do not live in `pool`. The queue is unchanged in both cases and `value`
    /// is dropped.
    pub fn push(&mut self, pool: &mut NodePool<V>, value: V) -> Result<()> {
        if let Some(last) = self.last {
            // Nothing is acquired from a pool that does not hold the rest of the queue.
            pool.get(last)?;
        }

        let handle = pool.acquire_with(|node| node.value = Some(value))?;

        match self.last {
            Some(last) => {
                pool.get_mut(last)
                    .expect("tail was validated above and acquiring never invalidates live rows")
                    .next = Some(handle);
            }
            None => self.first = Some(handle),
        }

        self.last = Some(handle);

        // Cannot overflow because every value occupies a live row of the pool.
        self.length = self.length.wrapping_add(1);

        Ok(())
    }

    /// Removes the value at the front of the queue and returns it, releasing its node back
    /// to `pool`.
    ///
    /// Returns `None` if the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`][object_pool::Error::InvalidHandle] if the queue's nodes
    /// do not live in `pool`. The queue is unchanged in that case.
    pub fn unshift(&mut self, pool: &mut NodePool<V>) -> Result<Option<V>> {
        let Some(first) = self.first else {
            return Ok(None);
        };

        let node = pool.get_mut(first)?;
        let value = node
            .value
            .take()
            .expect("every node reachable from a queue holds a value");
        let next = node.next.take();

        pool.release(first)
            .expect("the node was accessed through this handle just above");

        self.first = next;

        if next.is_none() {
            self.last = None;
        }

        // Cannot underflow because the queue had a first node.
        self.length = self.length.wrapping_sub(1);

        Ok(Some(value))
    }

    /// Returns a reference to the value at the front of the queue without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`][object_pool::Error::InvalidHandle] if the queue's nodes
    /// do not live in `pool`.
    pub fn peek<'p>(&self, pool: &'p NodePool<V>) -> Result<Option<&'p V>> {
        self.first
            .map(|first| {
                pool.get(first).map(|node| {
                    node.value
                        .as_ref()
                        .expect("every node reachable from a queue holds a value")
                })
            })
            .transpose()
    }

    /// Releases every node of the queue back to `pool`, dropping the values still queued.
    ///
    /// The queue is empty afterwards and can be pushed onto again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`][object_pool::Error::InvalidHandle] if the queue's nodes
    /// do not live in `pool`. The queue still holds every node that was not released, so the
    /// call can be repeated with the right pool.
    pub fn free(&mut self, pool: &mut NodePool<V>) -> Result<()> {
        let mut released: usize = 0;

        while let Some(first) = self.first {
            let next = pool.get(first)?.next;

            pool.release(first)
                .expect("the node was accessed through this handle just above");

            self.first = next;

            if next.is_none() {
                self.last = None;
            }

            // Cannot underflow because the queue had a first node.
            self.length = self.length.wrapping_sub(1);
            // Cannot overflow because every node was a live row of the pool.
            released = released.wrapping_add(1);
        }

        debug_assert_eq!(self.length, 0);

        debug!(
            value_type = type_name::<V>(),
            released, "released queue nodes"
        );

        Ok(())
    }
}

impl<V> Default for PooledQueue<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for PooledQueue<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("first", &self.first)
            .field("last", &self.last)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::arithmetic_side_effects,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use new_zealand::nz;
    use object_pool::HandleProblem;

    use super::*;
    use crate::node_pool;

    #[test]
    fn new_queue_is_empty() {
        let mut pool = node_pool::<u32>(nz!(2));
        let mut queue = PooledQueue::new();

        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.peek(&pool).unwrap(), None);
        assert_eq!(queue.unshift(&mut pool).unwrap(), None);
        assert!(pool.is_empty());
    }

    #[test]
    fn values_come_out_in_push_order() {
        let mut pool = node_pool::<u32>(nz!(2));
        let mut queue = PooledQueue::new();

        for value in 1..=5 {
            queue.push(&mut pool, value).unwrap();
        }

        assert_eq!(queue.len(), 5);
        assert_eq!(pool.len(), 5);

        for expected in 1..=5 {
            assert_eq!(queue.peek(&pool).unwrap(), Some(&expected));
            assert_eq!(queue.unshift(&mut pool).unwrap(), Some(expected));
        }

        assert!(queue.is_empty());
        assert!(pool.is_empty());
    }

    #[test]
    fn emptied_queue_accepts_new_values() {
        let mut pool = node_pool::<u32>(nz!(1));
        let mut queue = PooledQueue::new();

        queue.push(&mut pool, 1).unwrap();
        assert_eq!(queue.unshift(&mut pool).unwrap(), Some(1));

        queue.push(&mut pool, 2).unwrap();
        queue.push(&mut pool, 3).unwrap();

        assert_eq!(queue.unshift(&mut pool).unwrap(), Some(2));
        assert_eq!(queue.unshift(&mut pool).unwrap(), Some(3));
        assert_eq!(queue.unshift(&mut pool).unwrap(), None);
    }

    #[test]
    fn unshift_reuses_nodes_without_growing() {
        let mut pool = node_pool::<u32>(nz!(2));
        let mut queue = PooledQueue::new();

        for value in 0..100 {
            queue.push(&mut pool, value).unwrap();
            queue.push(&mut pool, value + 1).unwrap();
            queue.unshift(&mut pool).unwrap();
            queue.unshift(&mut pool).unwrap();
        }

        assert_eq!(pool.block_count(), 1);
    }

    #[test]
    fn free_releases_every_node() {
        let mut pool = node_pool::<String>(nz!(2));
        let mut queue = PooledQueue::new();

        for value in ["a", "b", "c"] {
            queue.push(&mut pool, value.to_owned()).unwrap();
        }

        assert_eq!(pool.len(), 3);

        queue.free(&mut pool).unwrap();
        assert!(pool.is_empty());
    }

    #[test]
    fn queues_can_share_a_pool() {
        let mut pool = node_pool::<u32>(nz!(4));
        let mut odd = PooledQueue::new();
        let mut even = PooledQueue::new();

        for value in 0..10 {
            if value % 2 == 0 {
                even.push(&mut pool, value).unwrap();
            } else {
                odd.push(&mut pool, value).unwrap();
            }
        }

        assert_eq!(pool.len(), 10);
        assert_eq!(even.unshift(&mut pool).unwrap(), Some(0));
        assert_eq!(odd.unshift(&mut pool).unwrap(), Some(1));

        even.free(&mut pool).unwrap();
        odd.free(&mut pool).unwrap();
        assert!(pool.is_empty());
    }

    #[test]
    fn push_into_wrong_pool_is_rejected() {
        let mut pool = node_pool::<u32>(nz!(2));
        let mut other = node_pool::<u32>(nz!(2));
        let mut queue = PooledQueue::new();

        queue.push(&mut pool, 1).unwrap();

        let error = queue.push(&mut other, 2).unwrap_err();
        assert_eq!(error.handle_problem(), Some(HandleProblem::ForeignPool));

        assert!(other.is_empty());
        assert_eq!(queue.len(), 1);

        let error = queue.unshift(&mut other).unwrap_err();
        assert_eq!(error.handle_problem(), Some(HandleProblem::ForeignPool));
        assert_eq!(queue.unshift(&mut pool).unwrap(), Some(1));
    }

    #[test]
    fn free_with_wrong_pool_keeps_nodes_reachable() {
        let mut pool = node_pool::<u32>(nz!(2));
        let mut other = node_pool::<u32>(nz!(2));
        let mut queue = PooledQueue::new();

        queue.push(&mut pool, 1).unwrap();
        queue.push(&mut pool, 2).unwrap();

        let error = queue.free(&mut other).unwrap_err();
        assert_eq!(error.handle_problem(), Some(HandleProblem::ForeignPool));

        assert_eq!(queue.len(), 2);
        assert_eq!(pool.len(), 2);
        assert_eq!(queue.peek(&pool).unwrap(), Some(&1));

        queue.free(&mut pool).unwrap();

        assert!(queue.is_empty());
        assert!(pool.is_empty());
    }

    #[test]
    fn freed_queue_can_be_reused() {
        let mut pool = node_pool::<u32>(nz!(2));
        let mut queue = PooledQueue::new();

        queue.push(&mut pool, 1).unwrap();
        queue.free(&mut pool).unwrap();

        assert_eq!(queue.peek(&pool).unwrap(), None);

        queue.push(&mut pool, 2).unwrap();
        assert_eq!(queue.unshift(&mut pool).unwrap(), Some(2));
        assert!(pool.is_empty());
    }

    #[test]
    fn debug_output_names_type() {
        let queue = PooledQueue::<u32>::default();
        let output = format!("{queue:?}");

        assert!(output.contains("PooledQueue"));
        assert!(output.contains("length"));
    }
}
