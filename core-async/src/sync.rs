//! Synchronization primitives.
//!
//! All primitives are async-aware `tokio::sync` types: they are `Send + Sync`
//! and never block an executor thread while waiting.
//!
//! `CancellationToken` comes from `tokio-util` and is the cancellation signal
//! handed to long-running operations such as a scene sync. Cancelling a token
//! wakes every `cancelled()` future derived from it or from its children.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::Semaphore;
//! use std::sync::Arc;
//!
//! # core_async::runtime::block_on(async {
//! let slots = Arc::new(Semaphore::new(2));
//! let first = slots.clone().acquire_owned().await.unwrap();
//! let _second = slots.clone().acquire_owned().await.unwrap();
//! assert_eq!(slots.available_permits(), 0);
//!
//! drop(first);
//! assert_eq!(slots.available_permits(), 1);
//! # });
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, AcquireError, Mutex, MutexGuard, Notify,
    OwnedSemaphorePermit, RwLock, RwLockReadGuard, RwLockWriteGuard, Semaphore, SemaphorePermit,
    TryAcquireError, TryLockError,
};

pub use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};
