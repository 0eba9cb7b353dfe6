//! Runtime abstraction layer for the offline scene core.
//!
//! All `core-*` and `bridge-*` crates should depend on this crate instead of
//! reaching for Tokio directly. Keeping the executor behind one facade means
//! the sync engine only ever names `core_async::task`, `core_async::sync` and
//! `core_async::time`, and the host decides which runtime drives them.
//!
//! # Modules
//!
//! - `task`: Task spawning, join sets and cooperative yielding
//! - `time`: Sleep, timeouts and monotonic instants
//! - `sync`: Semaphores, locks, channels and cancellation tokens
//! - `runtime`: Blocking entry points for tests and binaries
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::CancellationToken;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example(cancel: CancellationToken) {
//!     core_async::select! {
//!         _ = cancel.cancelled() => {}
//!         _ = sleep(Duration::from_millis(10)) => {}
//!     }
//! }
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};

/// Waits on multiple concurrent branches, returning when the first completes.
pub use tokio::select;
