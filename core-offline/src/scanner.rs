//! Local inventory: which files a scene directory already holds.

use bridge_traits::OfflineDirectory;
use futures::TryStreamExt;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::manifest::{SceneManifest, MARKER_EXTENSION};

/// Working model of the files already available locally.
///
/// Maps a file name to a placeholder size of 0. Local sizes are never
/// recomputed; only presence matters for the diff.
#[derive(Debug, Clone, Default)]
pub struct ExistingFiles {
    files: HashMap<String, u64>,
}

impl ExistingFiles {
    /// Seed from the last committed manifest.
    pub fn from_manifest(manifest: &SceneManifest) -> Self {
        Self {
            files: manifest
                .files()
                .iter()
                .map(|entry| (entry.name.clone(), 0))
                .collect(),
        }
    }

    /// Record a name found on disk. Marker-like names are ignored.
    pub fn insert_scanned(&mut self, name: String) -> bool {
        if name.ends_with(MARKER_EXTENSION) {
            return false;
        }
        self.files.insert(name, 0);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Recorded size of `name`, always 0 for a known file.
    pub fn size_of(&self, name: &str) -> Option<u64> {
        self.files.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Names not referenced by `remote`, sorted.
    pub fn orphans(&self, remote: &SceneManifest) -> Vec<String> {
        let mut orphans: Vec<String> = self
            .files
            .keys()
            .filter(|name| !remote.contains(name))
            .cloned()
            .collect();
        orphans.sort();
        orphans
    }
}

/// Union of the previous manifest's names and everything enumerated in `dir`.
pub async fn scan_existing(
    dir: &dyn OfflineDirectory,
    previous: &SceneManifest,
) -> Result<ExistingFiles> {
    let mut existing = ExistingFiles::from_manifest(previous);
    let mut names = dir
        .files()
        .await
        .map_err(|e| SyncError::storage("enumerate failed", e))?;

    let mut scanned = 0usize;
    while let Some(name) = names
        .try_next()
        .await
        .map_err(|e| SyncError::storage("enumerate failed", e))?
    {
        if existing.insert_scanned(name) {
            scanned += 1;
        }
    }

    debug!(
        directory = dir.name(),
        scanned,
        known = existing.len(),
        "Scanned local files"
    );
    Ok(existing)
}
