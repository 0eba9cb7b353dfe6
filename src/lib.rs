//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-offline`, `core-runtime`). Host applications can
//! depend on `offline-workspace` and enable `desktop-shims` to get the reqwest
//! HTTP client and tokio-backed scene storage wired in by default.

#[cfg(feature = "desktop-shims")]
pub use core_offline;
#[cfg(feature = "desktop-shims")]
pub use core_runtime;
