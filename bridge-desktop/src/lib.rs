//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides production-ready implementations of the bridge traits
//! the offline scene core needs:
//! - `HttpClient` using `reqwest`
//! - `OfflineStorage` / `OfflineDirectory` using `tokio::fs`, one directory per scene
//! - `NetworkMonitor` using a TCP reachability probe
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, TokioOfflineStorage};
//! use bridge_traits::{HttpClient, OfflineStorage};
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let storage = TokioOfflineStorage::new(TokioOfflineStorage::default_root());
//!
//!     // Use in core configuration
//! }
//! ```

mod directory;
mod http;
mod network;

pub use directory::{TokioDirectory, TokioOfflineStorage, PARTIAL_SUFFIX};
pub use http::ReqwestHttpClient;
pub use network::DesktopNetworkMonitor;
