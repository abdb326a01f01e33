/// Determines what happens to rows that are still live when the pool is dropped.
///
/// By default, live rows are silently discarded together with the rest of the pool storage.
///
/// # Examples
///
/// ```
/// use object_pool::{DropPolicy, ObjectPool};
///
/// // The drop policy is set at pool creation time.
/// let pool = ObjectPool::<u32>::builder()
///     .drop_policy(DropPolicy::MustNotDropLiveRows)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool will discard live rows when the pool is dropped. This is the default.
    #[default]
    MayDropLiveRows,

    /// The pool will panic if it still has live rows when it is dropped.
    ///
    /// Useful when every acquired row is expected to be released by its consumer, so that a
    /// forgotten release surfaces as a loud failure instead of silently vanishing storage.
    MustNotDropLiveRows,
}
