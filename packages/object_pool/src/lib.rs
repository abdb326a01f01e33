//! A slab-backed object pool for homogeneous, fixed-size records.
//!
//! This crate provides [`ObjectPool`], which hands out reusable rows of storage for values of
//! one type. It is meant for short-lived objects that are created and discarded at high frequency,
//! such as linked list nodes, where per-object heap allocation would dominate the cost.
//!
//! # Key Features
//!
//! - **Slab storage**: Rows live in large blocks that are allocated once and reused forever
//! - **Next-fit reuse**: Free rows are found by resuming the search where the last one ended
//! - **Geometric growth**: When full, the pool appends a block sized by its [`GrowthPolicy`]
//! - **Stable storage**: Blocks never move, so payloads keep their address until released
//! - **Reset contract**: A caller-supplied callback returns payloads to their empty state
//! - **Checked handles**: [`RowHandle`] values detect double release, stale and foreign use
//! - **Typed errors**: Storage exhaustion and invalid handles are reported via [`Error`]
//!
//! # Row lifecycle
//!
//! Every row of a new block is passed through the reset callback and starts out free.
//! [`ObjectPool::acquire()`] marks a free row live and returns a handle to it.
//! [`ObjectPool::release()`] passes the payload through the reset callback again and marks
//! the row free, making it available for later acquisitions. Acquisition never resets.
//!
//! # Examples
//!
//! ```rust
//! use new_zealand::nz;
//! use object_pool::ObjectPool;
//!
//! #[derive(Default)]
//! struct Particle {
//!     position: (f32, f32),
//!     velocity: (f32, f32),
//! }
//!
//! let mut pool = ObjectPool::<Particle>::builder()
//!     .initial_block_size(nz!(64))
//!     .build();
//!
//! let particle = pool.acquire_with(|p| p.velocity = (1.0, 0.5))?;
//!
//! let p = pool.get_mut(particle)?;
//! p.position.0 += p.velocity.0;
//!
//! pool.release(particle)?;
//!
//! // The released row is reused instead of allocating a new one.
//! let again = pool.acquire()?;
//! assert_eq!(pool.block_count(), 1);
//! assert_eq!(pool.get(again)?.velocity, (0.0, 0.0));
//! # Ok::<(), object_pool::Error>(())
//! ```
//!
//! # Logging
//!
//! The pool emits [`tracing`](https://docs.rs/tracing) events: `debug` for pool creation,
//! growth and drop, `trace` for every acquisition and release, and `warn` for rejected releases.
//! No subscriber is installed by this crate.

mod block;
mod builder;
mod coordinates;
mod drop_policy;
mod error;
mod growth;
mod handle;
mod pool;
mod reset;
mod stats;

pub(crate) use block::*;
pub use builder::*;
pub use coordinates::*;
pub use drop_policy::*;
pub use error::*;
pub use growth::GrowthPolicy;
pub(crate) use growth::GrowthSchedule;
pub use handle::*;
pub use pool::ObjectPool;
pub(crate) use reset::*;
pub use stats::*;
