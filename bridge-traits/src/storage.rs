//! Offline Storage Abstractions
//!
//! A scene's offline copy is a flat directory of named files. The core never
//! sees paths: it asks an [`OfflineStorage`] for a directory by scene id and
//! then works with file names only.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::sync::Arc;

use crate::error::Result;

/// Lazily produced file names of a directory.
///
/// Items are pulled one at a time so a scan can overlap with other work
/// (the manifest fetch) instead of materializing the whole listing first.
pub type FileStream = BoxStream<'static, Result<String>>;

/// Suffix reserved for in-flight writes.
///
/// A directory may stage writes under `<name>.partial` and sweep such files
/// on open, so no stored file name may end with it.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// True when `name` can never be stored in an [`OfflineDirectory`].
pub fn is_reserved_name(name: &str) -> bool {
    name.ends_with(PARTIAL_SUFFIX)
}

/// A flat, named file store holding one scene.
///
/// Implementations must make `write` atomic with respect to crashes: after a
/// restart a name either holds the complete new content or the previous
/// content (or nothing). In-flight temporary files must never be reported by
/// [`files`](OfflineDirectory::files).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::OfflineDirectory;
///
/// async fn cache(dir: &dyn OfflineDirectory, name: &str, body: Bytes) -> Result<()> {
///     dir.write(name, body).await?;
///     assert!(dir.read(name).await?.is_some());
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait OfflineDirectory: Send + Sync {
    /// Directory name (the scene id)
    fn name(&self) -> &str;

    /// Enumerate the names of all files currently stored
    async fn files(&self) -> Result<FileStream>;

    /// Read a whole file, `None` if it does not exist
    async fn read(&self, name: &str) -> Result<Option<Bytes>>;

    /// Create or replace a file
    async fn write(&self, name: &str, data: Bytes) -> Result<()>;

    /// Delete one file; deleting a missing file is not an error
    async fn delete_file(&self, name: &str) -> Result<()>;

    /// Delete a batch of files
    async fn delete_files(&self, names: Vec<String>) -> Result<()> {
        for name in names {
            self.delete_file(&name).await?;
        }
        Ok(())
    }

    /// Make completed writes durable
    ///
    /// Called after the completion marker is written and before any orphan
    /// is removed.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Remove the directory and everything in it
    async fn delete(&self) -> Result<()>;
}

/// Root of all offline scene directories.
#[async_trait]
pub trait OfflineStorage: Send + Sync {
    /// Open (creating if needed) the directory for `name`
    async fn directory(&self, name: &str) -> Result<Arc<dyn OfflineDirectory>>;

    /// Names of all existing directories
    async fn directories(&self) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use futures::StreamExt;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryDirectory {
        files: Mutex<BTreeMap<String, Bytes>>,
    }

    #[async_trait]
    impl OfflineDirectory for MemoryDirectory {
        fn name(&self) -> &str {
            "memory"
        }

        async fn files(&self) -> Result<FileStream> {
            let names: Vec<Result<String>> = self
                .files
                .lock()
                .map_err(|_| BridgeError::OperationFailed("poisoned".into()))?
                .keys()
                .cloned()
                .map(Ok)
                .collect();
            Ok(futures::stream::iter(names).boxed())
        }

        async fn read(&self, name: &str) -> Result<Option<Bytes>> {
            Ok(self.files.lock().unwrap().get(name).cloned())
        }

        async fn write(&self, name: &str, data: Bytes) -> Result<()> {
            self.files.lock().unwrap().insert(name.to_string(), data);
            Ok(())
        }

        async fn delete_file(&self, name: &str) -> Result<()> {
            self.files.lock().unwrap().remove(name);
            Ok(())
        }

        async fn delete(&self) -> Result<()> {
            self.files.lock().unwrap().clear();
            Ok(())
        }
    }

    #[core_async::test]
    async fn test_default_delete_files_and_flush() {
        let dir = MemoryDirectory::default();
        dir.write("a", Bytes::from_static(b"1")).await.unwrap();
        dir.write("b", Bytes::from_static(b"2")).await.unwrap();
        dir.write("c", Bytes::from_static(b"3")).await.unwrap();

        dir.delete_files(vec!["a".into(), "c".into(), "missing".into()])
            .await
            .unwrap();
        dir.flush().await.unwrap();

        let names: Vec<String> = dir
            .files()
            .await
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(names, vec!["b".to_string()]);
        assert!(dir.read("a").await.unwrap().is_none());
    }
}
