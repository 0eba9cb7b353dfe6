//! # Offline Scene
//!
//! One scene = one storage directory plus the manifest last committed into
//! it. [`OfflineScene::sync`] runs the full state machine:
//!
//! ```text
//! offline-check ─► synchronizing ─► { aborted | error | synchronized }
//!        │
//!        └─► offline
//! ```
//!
//! Every failure inside `synchronizing` is reported and turned into `false`;
//! use [`OfflineScene::sync_detailed`] for the typed outcome.

use bridge_traits::{HttpClient, NetworkMonitor, OfflineDirectory, RetryPolicy};
use core_async::sync::{CancellationToken, Mutex, RwLock};
use core_async::time::Duration;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info, instrument, warn};

use crate::commit;
use crate::context::ContextShared;
use crate::error::{Result, SyncError};
use crate::manifest::{SceneManifest, MANIFEST_FILENAME};
use crate::reporter::{ReporterSet, SceneStatus, StatusReporter};
use crate::request::RequestFormatter;
use crate::scanner::scan_existing;
use crate::scheduler::Downloader;

/// Result of a successful sync pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub files_downloaded: usize,
    pub files_skipped: usize,
    pub files_deleted: usize,
    pub bytes_downloaded: u64,
    /// Total byte size of the committed manifest
    pub total_bytes: u64,
}

/// Bridges and limits shared by every scene of a context.
pub(crate) struct SyncEngine {
    pub http: Arc<dyn HttpClient>,
    pub formatter: Arc<dyn RequestFormatter>,
    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,
    pub max_concurrent: usize,
    pub progress_interval: Duration,
}

impl SyncEngine {
    /// Without a monitor the host is assumed online.
    async fn is_online(&self) -> bool {
        match &self.network_monitor {
            Some(monitor) => monitor.is_connected().await,
            None => true,
        }
    }
}

/// Handle to one locally mirrored scene.
pub struct OfflineScene {
    dir: Arc<dyn OfflineDirectory>,
    manifest: RwLock<Arc<SceneManifest>>,
    reporter: RwLock<Option<Arc<dyn StatusReporter>>>,
    bus_reporter: Option<Arc<dyn StatusReporter>>,
    engine: Arc<SyncEngine>,
    context: Weak<ContextShared>,
    sync_lock: Mutex<()>,
}

impl OfflineScene {
    pub(crate) fn new(
        dir: Arc<dyn OfflineDirectory>,
        manifest: SceneManifest,
        engine: Arc<SyncEngine>,
        bus_reporter: Option<Arc<dyn StatusReporter>>,
        context: Weak<ContextShared>,
    ) -> Self {
        Self {
            dir,
            manifest: RwLock::new(Arc::new(manifest)),
            reporter: RwLock::new(None),
            bus_reporter,
            engine,
            context,
            sync_lock: Mutex::new(()),
        }
    }

    /// Scene identifier, which is also the directory name.
    pub fn id(&self) -> &str {
        self.dir.name()
    }

    /// Last committed manifest.
    pub async fn manifest(&self) -> Arc<SceneManifest> {
        Arc::clone(&*self.manifest.read().await)
    }

    pub async fn set_reporter(&self, reporter: Option<Arc<dyn StatusReporter>>) {
        *self.reporter.write().await = reporter;
    }

    /// True while a sync or delete holds the scene.
    pub fn is_busy(&self) -> bool {
        self.sync_lock.try_lock().is_err()
    }

    /// Bring the directory in line with the remote manifest.
    ///
    /// Returns `true` only when the new manifest was committed. Failures are
    /// delivered through the reporter.
    pub async fn sync(&self, cancel: &CancellationToken, access_key: &str) -> bool {
        self.sync_detailed(cancel, access_key).await.is_ok()
    }

    /// Same as [`sync`](Self::sync) but returns the typed outcome.
    #[instrument(skip(self, cancel, access_key), fields(scene_id = %self.id()))]
    pub async fn sync_detailed(
        &self,
        cancel: &CancellationToken,
        access_key: &str,
    ) -> Result<SyncSummary> {
        let report = self.reporters().await;

        let _guard = match self.sync_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                let err = SyncError::SyncInProgress {
                    scene_id: self.id().to_string(),
                };
                report.status(SceneStatus::Error);
                report.error(&err.to_string());
                return Err(err);
            }
        };

        if !self.engine.is_online().await {
            report.status(SceneStatus::Offline);
            report.error(crate::error::OFFLINE_MESSAGE);
            return Err(SyncError::Offline);
        }

        report.status(SceneStatus::Synchronizing);
        match self.run_sync(cancel, access_key, &report).await {
            Ok(summary) => {
                report.status(SceneStatus::Synchronized);
                info!(
                    downloaded = summary.files_downloaded,
                    skipped = summary.files_skipped,
                    deleted = summary.files_deleted,
                    bytes = summary.bytes_downloaded,
                    total_bytes = summary.total_bytes,
                    "Scene synchronized"
                );
                Ok(summary)
            }
            Err(err) if err.is_aborted() => {
                warn!("Scene sync aborted");
                report.status(SceneStatus::Aborted);
                Err(err)
            }
            Err(err) => {
                warn!(error = %err, "Scene sync failed");
                report.status(SceneStatus::Error);
                report.error(&err.to_string());
                Err(err)
            }
        }
    }

    async fn run_sync(
        &self,
        cancel: &CancellationToken,
        access_key: &str,
        report: &ReporterSet,
    ) -> Result<SyncSummary> {
        report.info("fetching manifest");
        let previous = self.manifest().await;
        let (remote, existing) = futures::future::try_join(
            self.fetch_manifest(cancel, access_key),
            scan_existing(self.dir.as_ref(), &previous),
        )
        .await?;

        if cancel.is_cancelled() {
            return Err(SyncError::Aborted);
        }
        debug!(
            files = remote.len(),
            total_bytes = remote.total_byte_size(),
            existing = existing.len(),
            "Remote manifest fetched"
        );

        report.info("fetching new files");
        let downloader = Downloader {
            http: Arc::clone(&self.engine.http),
            dir: Arc::clone(&self.dir),
            formatter: Arc::clone(&self.engine.formatter),
            max_concurrent: self.engine.max_concurrent,
            progress_interval: self.engine.progress_interval,
        };
        let stats = downloader
            .run(&remote, &existing, access_key, cancel, report)
            .await?;

        commit::write_marker(self.dir.as_ref(), &remote).await?;
        let remote = Arc::new(remote);
        *self.manifest.write().await = Arc::clone(&remote);

        report.info("cleanup");
        let files_deleted = commit::remove_orphans(self.dir.as_ref(), &existing, &remote).await?;

        Ok(SyncSummary {
            files_downloaded: stats.files_downloaded,
            files_skipped: stats.files_skipped,
            files_deleted,
            bytes_downloaded: stats.bytes_downloaded,
            total_bytes: remote.total_byte_size(),
        })
    }

    async fn fetch_manifest(
        &self,
        cancel: &CancellationToken,
        access_key: &str,
    ) -> Result<SceneManifest> {
        let request = self
            .engine
            .formatter
            .request(self.id(), MANIFEST_FILENAME, access_key)?;
        debug!(url = %request.redacted_url(), "Fetching manifest");

        let response = core_async::select! {
            biased;
            _ = cancel.cancelled() => return Err(SyncError::Aborted),
            response = self.engine.http.execute_with_retry(request, RetryPolicy::no_retry()) => response,
        }
        .map_err(|e| SyncError::Network(format!("{}: {}", MANIFEST_FILENAME, e)))?;

        if !response.is_success() {
            return Err(SyncError::ManifestFetchFailed {
                status: response.status,
                reason: response.status_text(),
            });
        }

        SceneManifest::parse(response.body)
    }

    /// Remove the scene directory and forget the committed manifest.
    ///
    /// The owning context, if still alive, drops the scene and reports
    /// `scene deleted`.
    #[instrument(skip(self), fields(scene_id = %self.id()))]
    pub async fn delete(&self) -> Result<()> {
        let report = self.reporters().await;
        let _guard = self
            .sync_lock
            .try_lock()
            .map_err(|_| SyncError::SyncInProgress {
                scene_id: self.id().to_string(),
            })?;

        report.status(SceneStatus::Deleting);
        if let Err(e) = self.dir.delete().await {
            let err = SyncError::storage("delete failed", e);
            report.status(SceneStatus::Error);
            report.error(&err.to_string());
            return Err(err);
        }
        *self.manifest.write().await = Arc::new(SceneManifest::empty());

        if let Some(context) = self.context.upgrade() {
            context.forget_scene(self.id()).await;
        }
        info!("Scene deleted");
        Ok(())
    }

    async fn reporters(&self) -> ReporterSet {
        let mut set = ReporterSet::new();
        set.push_opt(self.reporter.read().await.clone());
        set.push_opt(self.bus_reporter.clone());
        set
    }
}

impl fmt::Debug for OfflineScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfflineScene")
            .field("id", &self.id())
            .field("busy", &self.is_busy())
            .finish()
    }
}
