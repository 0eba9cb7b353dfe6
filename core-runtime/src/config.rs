//! # Offline Configuration Module
//!
//! Provides configuration management for the offline scene core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an
//! `OfflineConfig` instance that holds the host bridges and the sync settings.
//! It enforces fail-fast validation so a bad base URL or a missing bridge is
//! reported at startup rather than in the middle of a sync.
//!
//! ## Required Settings
//!
//! - `base_url` - Absolute URL scene directories are resolved against
//!
//! ## Bridges (with platform defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest)
//! - `OfflineStorage` - Scene directories (desktop default: tokio fs under `storage_root`)
//! - `NetworkMonitor` - Connectivity detection (optional; absent means "assume online")
//!
//! Without the `desktop-shims` feature, `HttpClient` and `OfflineStorage`
//! must be injected.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::OfflineConfig;
//!
//! let config = OfflineConfig::builder()
//!     .base_url("https://scenes.example.com/offline/")
//!     .storage_root("/path/to/offline")
//!     .max_concurrent_downloads(8)
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use crate::events::EventBus;
use bridge_traits::{HttpClient, NetworkMonitor, OfflineStorage};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default number of file downloads in flight per sync.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 8;

/// Upper bound accepted for `max_concurrent_downloads`.
pub const MAX_CONCURRENT_DOWNLOADS_LIMIT: usize = 64;

/// Default minimum spacing between two progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for the offline scene core.
///
/// Use [`OfflineConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct OfflineConfig {
    /// Remote root; scene `s` lives under `{base_url}/s/`
    pub base_url: Url,

    /// Root of the default storage, if it was used
    pub storage_root: Option<PathBuf>,

    /// Maximum number of file downloads in flight
    pub max_concurrent_downloads: usize,

    /// Minimum spacing between throttled progress reports
    pub progress_interval: Duration,

    /// Per-request timeout passed to the HTTP client
    pub request_timeout: Option<Duration>,

    /// HTTP client for manifest and file fetches
    pub http_client: Arc<dyn HttpClient>,

    /// Storage that owns the scene directories
    pub storage: Arc<dyn OfflineStorage>,

    /// Network connectivity monitor (optional)
    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    /// Bus that scene status is mirrored onto (optional)
    pub event_bus: Option<EventBus>,
}

impl std::fmt::Debug for OfflineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineConfig")
            .field("base_url", &self.base_url.as_str())
            .field("storage_root", &self.storage_root)
            .field("max_concurrent_downloads", &self.max_concurrent_downloads)
            .field("progress_interval", &self.progress_interval)
            .field("request_timeout", &self.request_timeout)
            .field("http_client", &"HttpClient { ... }")
            .field("storage", &"OfflineStorage { ... }")
            .field(
                "network_monitor",
                &self
                    .network_monitor
                    .as_ref()
                    .map(|_| "NetworkMonitor { ... }"),
            )
            .field("event_bus", &self.event_bus)
            .finish()
    }
}

impl OfflineConfig {
    /// Creates a new builder for constructing an `OfflineConfig`.
    pub fn builder() -> OfflineConfigBuilder {
        OfflineConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The base URL can carry path segments and uses http(s)
    /// - The concurrency bound is within 1..=64
    /// - The progress interval is not zero
    pub fn validate(&self) -> Result<()> {
        validate_base_url(&self.base_url)?;

        if self.max_concurrent_downloads == 0 {
            return Err(Error::Config(
                "max_concurrent_downloads must be at least 1".to_string(),
            ));
        }

        if self.max_concurrent_downloads > MAX_CONCURRENT_DOWNLOADS_LIMIT {
            return Err(Error::Config(format!(
                "max_concurrent_downloads exceeds maximum of {}",
                MAX_CONCURRENT_DOWNLOADS_LIMIT
            )));
        }

        if self.progress_interval.is_zero() {
            return Err(Error::Config(
                "progress_interval must be greater than 0ms".to_string(),
            ));
        }

        if matches!(self.request_timeout, Some(timeout) if timeout.is_zero()) {
            return Err(Error::Config(
                "request_timeout must be greater than 0ms when set".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_base_url(url: &Url) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot carry path segments"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query and fragment belong to the access key, not the base URL"));
    }
    Ok(())
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    validate_base_url(&url)?;
    Ok(url)
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to fetch manifests and files. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Mobile: inject the platform HTTP stack (URLSession/OkHttp). \
                 Web: inject a fetch-based client."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn storage_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "OfflineStorage".to_string(),
        message: "OfflineStorage implementation is required to keep scene files. \
                 Desktop: enable the 'desktop-shims' feature to use the default TokioOfflineStorage. \
                 Mobile: inject sandboxed app storage. \
                 Web: inject OPFS-backed storage."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Option<Duration>) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = match timeout {
        Some(timeout) => ReqwestHttpClient::with_timeout(timeout),
        None => ReqwestHttpClient::new(),
    }
    .map_err(|e| Error::Internal(format!("Failed to initialize default HttpClient: {}", e)))?;

    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Option<Duration>) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_storage(
    storage_root: Option<PathBuf>,
) -> Result<(Arc<dyn OfflineStorage>, Option<PathBuf>)> {
    use bridge_desktop::TokioOfflineStorage;

    let root = storage_root.unwrap_or_else(TokioOfflineStorage::default_root);
    let storage: Arc<dyn OfflineStorage> = Arc::new(TokioOfflineStorage::new(root.clone()));
    Ok((storage, Some(root)))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_storage(
    _storage_root: Option<PathBuf>,
) -> Result<(Arc<dyn OfflineStorage>, Option<PathBuf>)> {
    Err(storage_missing_error())
}

/// Builder for constructing [`OfflineConfig`] instances.
///
/// Call [`build()`](OfflineConfigBuilder::build) to validate and create the
/// final config.
#[derive(Default)]
pub struct OfflineConfigBuilder {
    base_url: Option<String>,
    storage_root: Option<PathBuf>,
    max_concurrent_downloads: Option<usize>,
    progress_interval: Option<Duration>,
    request_timeout: Option<Duration>,
    http_client: Option<Arc<dyn HttpClient>>,
    storage: Option<Arc<dyn OfflineStorage>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    event_bus: Option<EventBus>,
}

impl OfflineConfigBuilder {
    /// Sets the remote base URL (required).
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::OfflineConfig;
    ///
    /// let builder = OfflineConfig::builder()
    ///     .base_url("https://scenes.example.com/offline/");
    /// ```
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the directory the default storage keeps scenes in.
    ///
    /// Ignored when a custom storage is injected.
    pub fn storage_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.storage_root = Some(path.into());
        self
    }

    /// Sets how many file downloads may be in flight at once.
    ///
    /// Default: 8
    pub fn max_concurrent_downloads(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = Some(max);
        self
    }

    /// Sets the minimum spacing between throttled progress reports.
    ///
    /// Default: 100ms
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = Some(interval);
        self
    }

    /// Sets a per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the storage implementation.
    ///
    /// If not provided, the desktop default (tokio fs-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn storage(mut self, storage: Arc<dyn OfflineStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the network monitor implementation (optional).
    ///
    /// Without one, every sync assumes the device is online.
    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Mirrors every scene's status onto an event bus.
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Builds the final `OfflineConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(OfflineConfig)` on success, or an error if:
    /// - The base URL is missing or not an absolute http(s) URL
    /// - Required bridges are missing and no desktop default is available
    /// - Numeric settings are out of range
    pub fn build(self) -> Result<OfflineConfig> {
        let raw_url = self.base_url.ok_or_else(|| {
            Error::Config("Base URL is required. Use .base_url() to set it.".to_string())
        })?;
        let base_url = parse_base_url(&raw_url)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(self.request_timeout)?,
        };

        let (storage, storage_root) = match self.storage {
            Some(storage) => (storage, self.storage_root),
            None => provide_default_storage(self.storage_root)?,
        };

        let config = OfflineConfig {
            base_url,
            storage_root,
            max_concurrent_downloads: self
                .max_concurrent_downloads
                .unwrap_or(DEFAULT_MAX_CONCURRENT_DOWNLOADS),
            progress_interval: self.progress_interval.unwrap_or(DEFAULT_PROGRESS_INTERVAL),
            request_timeout: self.request_timeout,
            http_client,
            storage,
            network_monitor: self.network_monitor,
            event_bus: self.event_bus,
        };

        config.validate()?;

        Ok(config)
    }
}
