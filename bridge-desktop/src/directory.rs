//! Scene Directory Storage using Tokio
//!
//! Each scene lives in `<root>/<scene id>/` as a flat set of files.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{is_reserved_name, FileStream, OfflineDirectory, OfflineStorage},
};
use bytes::Bytes;
use futures::StreamExt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

pub use bridge_traits::storage::PARTIAL_SUFFIX;

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(BridgeError::InvalidInput(format!(
            "Invalid {} name: {:?}",
            kind, name
        )));
    }
    Ok(())
}

fn ignore_not_found(result: std::io::Result<()>) -> std::io::Result<()> {
    match result {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Tokio-based offline storage root
///
/// Hands out one [`TokioDirectory`] per scene. Opening a directory creates it
/// and clears partial files left behind by an interrupted write.
pub struct TokioOfflineStorage {
    root: PathBuf,
}

impl TokioOfflineStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<platform data dir>/scene-offline`, falling back to the temp dir
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("scene-offline")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn remove_stale_partials(path: &Path) -> Result<usize> {
        let mut entries = fs::read_dir(path).await?;
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let is_partial = entry
                .file_name()
                .to_str()
                .is_some_and(is_reserved_name);
            if is_partial {
                ignore_not_found(fs::remove_file(entry.path()).await)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl OfflineStorage for TokioOfflineStorage {
    async fn directory(&self, name: &str) -> Result<Arc<dyn OfflineDirectory>> {
        validate_name("directory", name)?;
        let path = self.root.join(name);
        fs::create_dir_all(&path).await?;

        let removed = Self::remove_stale_partials(&path).await?;
        if removed > 0 {
            debug!(directory = name, removed, "Removed stale partial files");
        }

        Ok(Arc::new(TokioDirectory {
            name: name.to_string(),
            path,
        }))
    }

    async fn directories(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!(name = ?raw, "Skipping non UTF-8 directory name"),
            }
        }
        names.sort();
        Ok(names)
    }
}

/// One scene's directory on the local filesystem
pub struct TokioDirectory {
    name: String,
    path: PathBuf,
}

impl TokioDirectory {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_path(&self, name: &str) -> Result<PathBuf> {
        validate_name("file", name)?;
        // Would be swept as a stale write on the next open
        if is_reserved_name(name) {
            return Err(BridgeError::InvalidInput(format!(
                "File name {:?} uses the reserved {} suffix",
                name, PARTIAL_SUFFIX
            )));
        }
        Ok(self.path.join(name))
    }
}

#[async_trait]
impl OfflineDirectory for TokioDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn files(&self) -> Result<FileStream> {
        let entries = match fs::read_dir(&self.path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(futures::stream::empty().boxed())
            }
            Err(e) => return Err(e.into()),
        };

        let stream = futures::stream::try_unfold(entries, |mut entries| async move {
            while let Some(entry) = entries.next_entry().await? {
                if !entry.file_type().await?.is_file() {
                    continue;
                }
                let Ok(name) = entry.file_name().into_string() else {
                    continue;
                };
                if is_reserved_name(&name) {
                    continue;
                }
                return Ok(Some((name, entries)));
            }
            Ok::<_, BridgeError>(None)
        });

        Ok(stream.boxed())
    }

    async fn read(&self, name: &str) -> Result<Option<Bytes>> {
        let path = self.file_path(name)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, name: &str, data: Bytes) -> Result<()> {
        let target = self.file_path(name)?;
        let partial = self.path.join(format!("{}{}", name, PARTIAL_SUFFIX));

        let written = async {
            let mut file = fs::File::create(&partial).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&partial, &target).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&partial).await;
            return Err(BridgeError::OperationFailed(format!(
                "Failed to write {}: {}",
                name, e
            )));
        }

        debug!(directory = %self.name, file = name, size = data.len(), "Wrote file");
        Ok(())
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.file_path(name)?;
        ignore_not_found(fs::remove_file(&path).await)?;
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        // Directory fsync persists the renames; not supported on Windows
        #[cfg(unix)]
        {
            let dir = fs::File::open(&self.path).await?;
            dir.sync_all().await?;
        }
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        ignore_not_found(fs::remove_dir_all(&self.path).await)?;
        debug!(directory = %self.name, "Deleted directory");
        Ok(())
    }
}
