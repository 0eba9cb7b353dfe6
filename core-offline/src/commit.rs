//! Completion & cleanup.
//!
//! Two phases, strictly ordered: the marker write (plus a flush) is the
//! durability boundary, and cleanup only runs after it. A crash in between
//! leaves orphan files on disk, never a marker that references missing ones.

use bridge_traits::OfflineDirectory;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::manifest::{SceneManifest, MANIFEST_FILENAME};
use crate::scanner::ExistingFiles;

/// Persist `remote` as the completion marker and make it durable.
pub(crate) async fn write_marker(dir: &dyn OfflineDirectory, remote: &SceneManifest) -> Result<()> {
    let payload = remote.to_bytes()?;
    dir.write(MANIFEST_FILENAME, payload)
        .await
        .map_err(|e| SyncError::storage("write manifest failed", e))?;
    dir.flush()
        .await
        .map_err(|e| SyncError::storage("flush failed", e))?;
    debug!(directory = dir.name(), files = remote.len(), "Manifest committed");
    Ok(())
}

/// Delete every known local file the committed manifest no longer references.
pub(crate) async fn remove_orphans(
    dir: &dyn OfflineDirectory,
    existing: &ExistingFiles,
    remote: &SceneManifest,
) -> Result<usize> {
    let orphans = existing.orphans(remote);
    if orphans.is_empty() {
        return Ok(0);
    }

    let count = orphans.len();
    debug!(directory = dir.name(), count, "Removing orphaned files");
    dir.delete_files(orphans)
        .await
        .map_err(|e| SyncError::storage("cleanup failed", e))?;
    Ok(count)
}
