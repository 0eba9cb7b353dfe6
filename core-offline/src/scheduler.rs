//! # Diff & Download Scheduler
//!
//! Walks the remote manifest in order. Entries already present locally only
//! count towards progress; missing ones are fetched by spawned tasks, at most
//! `max_concurrent` at a time.
//!
//! Each task owns a semaphore permit for its whole lifetime. When no permit is
//! free the scheduler waits for *any* in-flight task to finish (`join_next`),
//! which both frees a slot and surfaces that task's failure early. Memory is
//! O(max_concurrent), not O(files).

use bridge_traits::{HttpClient, HttpRequest, OfflineDirectory, RetryPolicy};
use core_async::sync::{CancellationToken, OwnedSemaphorePermit, Semaphore, TryAcquireError};
use core_async::task::{JoinError, JoinSet};
use core_async::time::Duration;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::error::{Result, SyncError};
use crate::manifest::SceneManifest;
use crate::progress::ProgressThrottle;
use crate::reporter::StatusReporter;
use crate::request::RequestFormatter;
use crate::scanner::ExistingFiles;

/// Outcome of the download phase.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadStats {
    pub files_downloaded: usize,
    pub files_skipped: usize,
    /// Body bytes actually received
    pub bytes_downloaded: u64,
    /// Manifest bytes satisfied, skipped plus downloaded
    pub bytes_done: u64,
}

type Joined = std::result::Result<Result<u64>, JoinError>;

pub(crate) struct Downloader {
    pub http: Arc<dyn HttpClient>,
    pub dir: Arc<dyn OfflineDirectory>,
    pub formatter: Arc<dyn RequestFormatter>,
    pub max_concurrent: usize,
    pub progress_interval: Duration,
}

struct FileJob {
    http: Arc<dyn HttpClient>,
    dir: Arc<dyn OfflineDirectory>,
    request: HttpRequest,
    name: String,
    size: u64,
    cancel: CancellationToken,
    completed: Arc<AtomicU64>,
}

impl Downloader {
    /// Download every remote file missing from `existing`.
    ///
    /// Returns only after all spawned downloads have finished. On failure the
    /// remaining downloads are aborted and awaited before the error is
    /// returned, so nothing writes to the directory afterwards.
    pub async fn run(
        &self,
        remote: &SceneManifest,
        existing: &ExistingFiles,
        access_key: &str,
        cancel: &CancellationToken,
        reporter: &dyn StatusReporter,
    ) -> Result<DownloadStats> {
        let mut in_flight = JoinSet::new();
        let result = self
            .schedule(&mut in_flight, remote, existing, access_key, cancel, reporter)
            .await;
        if result.is_err() {
            in_flight.shutdown().await;
        }
        result
    }

    async fn schedule(
        &self,
        in_flight: &mut JoinSet<Result<u64>>,
        remote: &SceneManifest,
        existing: &ExistingFiles,
        access_key: &str,
        cancel: &CancellationToken,
        reporter: &dyn StatusReporter,
    ) -> Result<DownloadStats> {
        let total = remote.total_byte_size();
        let slots = Arc::new(Semaphore::new(self.max_concurrent.max(1)));
        let completed = Arc::new(AtomicU64::new(0));
        let mut satisfied: u64 = 0;
        let mut stats = DownloadStats::default();
        let mut throttle = ProgressThrottle::new(self.progress_interval);

        reporter.progress(Some(0), Some(total));

        for entry in remote.files() {
            if cancel.is_cancelled() {
                return Err(SyncError::Aborted);
            }

            if existing.contains(&entry.name) {
                satisfied += entry.size;
                stats.files_skipped += 1;
            } else {
                let request = self
                    .formatter
                    .request(self.dir.name(), &entry.name, access_key)?;
                let permit = claim_slot(&slots, in_flight, &mut stats).await?;
                let job = FileJob {
                    http: Arc::clone(&self.http),
                    dir: Arc::clone(&self.dir),
                    request,
                    name: entry.name.clone(),
                    size: entry.size,
                    cancel: cancel.clone(),
                    completed: Arc::clone(&completed),
                };
                in_flight.spawn(fetch_file(job, permit));
            }

            while let Some(joined) = in_flight.try_join_next() {
                record(joined, &mut stats)?;
            }

            if throttle.ready() {
                let done = satisfied + completed.load(Ordering::Acquire);
                reporter.progress(Some(done), Some(total));
            }
        }

        // Barrier: every download must settle before anything is committed
        while let Some(joined) = in_flight.join_next().await {
            record(joined, &mut stats)?;
        }

        let done = satisfied + completed.load(Ordering::Acquire);
        reporter.progress(Some(done), Some(total));
        reporter.progress(None, None);

        stats.bytes_done = done;
        debug!(
            directory = self.dir.name(),
            downloaded = stats.files_downloaded,
            skipped = stats.files_skipped,
            bytes = stats.bytes_downloaded,
            "Download phase finished"
        );
        Ok(stats)
    }
}

async fn claim_slot(
    slots: &Arc<Semaphore>,
    in_flight: &mut JoinSet<Result<u64>>,
    stats: &mut DownloadStats,
) -> Result<OwnedSemaphorePermit> {
    loop {
        match Arc::clone(slots).try_acquire_owned() {
            Ok(permit) => return Ok(permit),
            Err(TryAcquireError::NoPermits) => match in_flight.join_next().await {
                Some(joined) => record(joined, stats)?,
                None => {
                    return Err(SyncError::Task(
                        "all download slots taken with nothing in flight".to_string(),
                    ))
                }
            },
            Err(TryAcquireError::Closed) => {
                return Err(SyncError::Task("download slots closed".to_string()))
            }
        }
    }
}

fn record(joined: Joined, stats: &mut DownloadStats) -> Result<()> {
    match joined {
        Ok(Ok(received)) => {
            stats.files_downloaded += 1;
            stats.bytes_downloaded += received;
            Ok(())
        }
        Ok(Err(e)) => Err(e),
        Err(e) if e.is_cancelled() => Err(SyncError::Aborted),
        Err(e) => Err(SyncError::Task(e.to_string())),
    }
}

async fn fetch_file(job: FileJob, _permit: OwnedSemaphorePermit) -> Result<u64> {
    let FileJob {
        http,
        dir,
        request,
        name,
        size,
        cancel,
        completed,
    } = job;

    trace!(file = %name, url = %request.redacted_url(), "Fetching file");

    let response = core_async::select! {
        biased;
        _ = cancel.cancelled() => return Err(SyncError::Aborted),
        response = http.execute_with_retry(request, RetryPolicy::no_retry()) => response,
    }
    .map_err(|e| {
        if e.is_transient() {
            warn!(file = %name, error = %e, "Transport failure, next sync will retry");
        }
        SyncError::Network(format!("{}: {}", name, e))
    })?;

    if !response.is_success() {
        return Err(SyncError::FileFetchFailed {
            filename: name,
            status: response.status,
        });
    }

    let received = response.body.len() as u64;
    dir.write(&name, response.body)
        .await
        .map_err(|e| SyncError::storage(&format!("write {} failed", name), e))?;
    completed.fetch_add(size, Ordering::AcqRel);

    trace!(file = %name, bytes = received, "Stored file");
    Ok(received)
}
