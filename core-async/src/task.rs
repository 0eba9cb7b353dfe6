//! Task spawning and execution abstractions.
//!
//! - `spawn`: Returns a `JoinHandle<T>` that can be awaited
//! - `JoinSet`: A set of spawned tasks that can be awaited in completion order,
//!   which is what the download scheduler uses to "wait for any" in-flight
//!   transfer
//! - `spawn_blocking`: For CPU-intensive operations, uses the blocking pool
//!
//! # Examples
//!
//! ```rust
//! use core_async::task::JoinSet;
//!
//! # core_async::runtime::block_on(async {
//! let mut set = JoinSet::new();
//! set.spawn(async { 1 });
//! set.spawn(async { 2 });
//!
//! let mut total = 0;
//! while let Some(result) = set.join_next().await {
//!     total += result.unwrap();
//! }
//! assert_eq!(total, 3);
//! # });
//! ```

pub use tokio::task::{spawn_blocking, yield_now, JoinError, JoinHandle, JoinSet};

/// Spawns a new asynchronous task on the current runtime.
///
/// The spawned task may run on a different thread, so both the future and
/// its output must be `Send + 'static`.
///
/// # Examples
///
/// ```rust
/// use core_async::task::spawn;
///
/// # core_async::runtime::block_on(async {
/// let handle = spawn(async { 42 });
/// assert_eq!(handle.await.unwrap(), 42);
/// # });
/// ```
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
