//! # Offline Context
//!
//! Registry of the scenes mirrored under one storage root. Built from an
//! [`OfflineConfig`]; every scene shares the context's HTTP client, request
//! formatter and network monitor.
//!
//! ```ignore
//! let config = OfflineConfig::builder()
//!     .base_url("https://assets.example.com/scenes")
//!     .build()?;
//! let context = OfflineContext::open(&config).await?;
//! let scene = context.add_scene("factory-hall").await?;
//! let ok = scene.sync(&CancellationToken::new(), sas_token).await;
//! ```

use bridge_traits::{OfflineDirectory, OfflineStorage};
use core_async::sync::RwLock;
use core_runtime::config::OfflineConfig;
use core_runtime::events::EventBus;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::manifest::{SceneManifest, MANIFEST_FILENAME};
use crate::reporter::{EventBusReporter, ReporterSet, SceneStatus, StatusReporter};
use crate::request::{RequestFormatter, SasRequestFormatter};
use crate::scene::{OfflineScene, SyncEngine};

/// State reachable from scenes through a weak reference.
pub(crate) struct ContextShared {
    scenes: RwLock<HashMap<String, Arc<OfflineScene>>>,
    reporter: RwLock<Option<Arc<dyn StatusReporter>>>,
    event_bus: Option<EventBus>,
}

impl ContextShared {
    /// Drop a deleted scene and announce it.
    pub(crate) async fn forget_scene(&self, id: &str) {
        self.scenes.write().await.remove(id);

        let mut report = ReporterSet::new();
        report.push_opt(self.reporter.read().await.clone());
        if let Some(bus) = &self.event_bus {
            report = report.with(Arc::new(EventBusReporter::new(bus.clone(), id)));
        }
        report.status(SceneStatus::Deleted);
    }
}

/// Entry point for hosts: owns the bridges and the known scenes.
pub struct OfflineContext {
    shared: Arc<ContextShared>,
    engine: Arc<SyncEngine>,
    storage: Arc<dyn OfflineStorage>,
}

impl OfflineContext {
    /// Context using the shared-access-signature URL scheme.
    pub fn new(config: &OfflineConfig) -> Self {
        let formatter = SasRequestFormatter::new(config.base_url.clone())
            .with_timeout(config.request_timeout);
        Self::with_request_formatter(config, Arc::new(formatter))
    }

    pub fn with_request_formatter(
        config: &OfflineConfig,
        formatter: Arc<dyn RequestFormatter>,
    ) -> Self {
        let engine = SyncEngine {
            http: Arc::clone(&config.http_client),
            formatter,
            network_monitor: config.network_monitor.clone(),
            max_concurrent: config.max_concurrent_downloads,
            progress_interval: config.progress_interval,
        };

        Self {
            shared: Arc::new(ContextShared {
                scenes: RwLock::new(HashMap::new()),
                reporter: RwLock::new(None),
                event_bus: config.event_bus.clone(),
            }),
            engine: Arc::new(engine),
            storage: Arc::clone(&config.storage),
        }
    }

    /// [`new`](Self::new) followed by [`load`](Self::load).
    pub async fn open(config: &OfflineConfig) -> Result<Self> {
        let context = Self::new(config);
        context.load().await?;
        Ok(context)
    }

    /// Open every scene directory already present in storage.
    ///
    /// Returns the ids of the scenes now known, sorted.
    pub async fn load(&self) -> Result<Vec<String>> {
        let names = self
            .storage
            .directories()
            .await
            .map_err(|e| SyncError::storage("list scenes failed", e))?;

        for name in &names {
            self.add_scene(name).await?;
        }

        info!(count = names.len(), "Offline scenes loaded");
        Ok(self.scene_ids().await)
    }

    pub async fn scene(&self, id: &str) -> Option<Arc<OfflineScene>> {
        self.shared.scenes.read().await.get(id).cloned()
    }

    pub async fn scene_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.shared.scenes.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Open the scene, creating its directory on first use.
    pub async fn add_scene(&self, id: &str) -> Result<Arc<OfflineScene>> {
        let mut scenes = self.shared.scenes.write().await;
        if let Some(scene) = scenes.get(id) {
            return Ok(Arc::clone(scene));
        }

        let dir = self
            .storage
            .directory(id)
            .await
            .map_err(|e| SyncError::storage(&format!("open scene {} failed", id), e))?;
        let manifest = load_manifest(dir.as_ref()).await?;
        debug!(scene_id = id, files = manifest.len(), "Scene opened");

        let bus_reporter = self.shared.event_bus.as_ref().map(|bus| {
            Arc::new(EventBusReporter::new(bus.clone(), id)) as Arc<dyn StatusReporter>
        });
        let scene = Arc::new(OfflineScene::new(
            dir,
            manifest,
            Arc::clone(&self.engine),
            bus_reporter,
            Arc::downgrade(&self.shared),
        ));
        scenes.insert(id.to_string(), Arc::clone(&scene));
        Ok(scene)
    }

    /// Delete a known scene and its files.
    pub async fn delete_scene(&self, id: &str) -> Result<()> {
        let scene = self
            .scene(id)
            .await
            .ok_or_else(|| SyncError::SceneNotFound {
                scene_id: id.to_string(),
            })?;
        scene.delete().await
    }

    /// Reporter for context-level events such as `scene deleted`.
    pub async fn set_reporter(&self, reporter: Option<Arc<dyn StatusReporter>>) {
        *self.shared.reporter.write().await = reporter;
    }

    pub fn event_bus(&self) -> Option<&EventBus> {
        self.shared.event_bus.as_ref()
    }
}

/// Last committed manifest of `dir`; empty when missing or unreadable as JSON.
async fn load_manifest(dir: &dyn OfflineDirectory) -> Result<SceneManifest> {
    let raw = dir
        .read(MANIFEST_FILENAME)
        .await
        .map_err(|e| SyncError::storage("read manifest failed", e))?;

    match raw {
        None => Ok(SceneManifest::empty()),
        Some(bytes) => match SceneManifest::parse(bytes) {
            Ok(manifest) => Ok(manifest),
            Err(e) => {
                warn!(directory = dir.name(), error = %e, "Ignoring unreadable manifest");
                Ok(SceneManifest::empty())
            }
        },
    }
}
