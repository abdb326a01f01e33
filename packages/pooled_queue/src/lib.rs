//! A FIFO queue whose nodes are stored in an [`object_pool::ObjectPool`].
//!
//! Linked lists allocate one node per element, which makes them a classic consumer of an
//! object pool. [`PooledQueue`] keeps its nodes in a caller-owned [`NodePool`], so values that
//! are pushed and unshifted at high frequency reuse the same rows instead of allocating.
//!
//! The pool is always passed explicitly. One pool can serve many queues holding the same
//! value type.
//!
//! # Examples
//!
//! ```rust
//! use new_zealand::nz;
//! use pooled_queue::{PooledQueue, node_pool};
//!
//! let mut pool = node_pool::<u64>(nz!(16));
//! let mut jobs = PooledQueue::new();
//!
//! for job in 0..3 {
//!     jobs.push(&mut pool, job)?;
//! }
//!
//! while let Some(job) = jobs.unshift(&mut pool)? {
//!     println!("processing job {job}");
//! }
//!
//! assert!(pool.is_empty());
//! # Ok::<(), object_pool::Error>(())
//! ```

mod node;
mod queue;

pub use node::*;
pub use queue::*;
