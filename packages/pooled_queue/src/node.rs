use std::any::type_name;
use std::fmt;
use std::num::NonZero;

use new_zealand::nz;
use object_pool::{ObjectPool, RowHandle};

/// Node pool size used by [`default_node_pool()`].
pub const DEFAULT_NODE_POOL_SIZE: NonZero<usize> = nz!(8);

/// One link of a [`PooledQueue`][crate::PooledQueue], stored in a row of a [`NodePool`].
///
/// Nodes are an implementation detail of the queue. They are public only so that the
/// [`NodePool`] type can be named by callers that own the pool.
pub struct QueueNode<V> {
    pub(crate) value: Option<V>,
    pub(crate) next: Option<RowHandle>,
}

impl<V> QueueNode<V> {
    fn clear(&mut self) {
        self.value = None;
        self.next = None;
    }
}

// Manual impl so that `V` does not need to implement `Default`.
impl<V> Default for QueueNode<V> {
    fn default() -> Self {
        Self {
            value: None,
            next: None,
        }
    }
}

impl<V> fmt::Debug for QueueNode<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("has_value", &self.value.is_some())
            .field("next", &self.next)
            .finish()
    }
}

/// The pool that stores the nodes of one or more [`PooledQueue`][crate::PooledQueue] instances.
pub type NodePool<V> = ObjectPool<QueueNode<V>>;

/// Creates a node pool whose first block holds `initial_block_size` nodes.
///
/// Released nodes drop their value and forget their successor.
///
/// # Panics
///
/// Panics if the storage for the initial block cannot be obtained.
///
/// # Example
///
/// ```rust
/// use new_zealand::nz;
/// use pooled_queue::node_pool;
///
/// let pool = node_pool::<String>(nz!(32));
/// assert_eq!(pool.capacity(), 32);
/// ```
#[must_use]
pub fn node_pool<V: 'static>(initial_block_size: NonZero<usize>) -> NodePool<V> {
    ObjectPool::builder()
        .initial_block_size(initial_block_size)
        .reset_with(QueueNode::clear)
        .build()
}

/// Creates a node pool of [`DEFAULT_NODE_POOL_SIZE`] nodes.
#[must_use]
pub fn default_node_pool<V: 'static>() -> NodePool<V> {
    node_pool(DEFAULT_NODE_POOL_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_pool_uses_requested_size() {
        let pool = node_pool::<u32>(nz!(3));

        assert_eq!(pool.capacity(), 3);
        assert!(pool.is_empty());
    }

    #[test]
    fn default_node_pool_uses_default_size() {
        let pool = default_node_pool::<u32>();

        assert_eq!(pool.capacity(), DEFAULT_NODE_POOL_SIZE.get());
    }

    #[test]
    fn released_node_is_cleared() {
        let mut pool = node_pool::<String>(nz!(2));

        let other = pool.acquire().unwrap();
        let handle = pool
            .acquire_with(|node| {
                node.value = Some("payload".to_owned());
                node.next = Some(other);
            })
            .unwrap();

        pool.release(handle).unwrap();
        pool.release(other).unwrap();

        let reused = pool.acquire().unwrap();
        let node = pool.get(reused).unwrap();
        assert!(node.value.is_none());
        assert!(node.next.is_none());
    }

    #[test]
    fn debug_does_not_require_debug_value() {
        struct NotDebug;

        let node = QueueNode::<NotDebug>::default();
        let output = format!("{node:?}");

        assert!(output.contains("has_value"));
    }
}
