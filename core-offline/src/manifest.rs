//! # Manifest Model
//!
//! A manifest lists every file of a scene with its byte size. The remote copy
//! is authoritative; the local copy is the last one that was fully synced and
//! doubles as the completion marker (`manifest.json`).
//!
//! Wire format:
//!
//! ```json
//! { "version": "1.0", "files": [["geometry_0.bin", 1024], ["tex_3.ktx2", 2048]] }
//! ```
//!
//! Any `totalByteSize` in the payload is ignored; the total is always summed
//! from the entries.

use bridge_traits::is_reserved_name;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::error::{Result, SyncError};

/// Name of the completion marker inside a scene directory.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Locally scanned names with this suffix are never content files.
pub const MARKER_EXTENSION: &str = ".json";

/// Manifest schema major version this crate understands.
const SUPPORTED_MAJOR_VERSION: &str = "1";

/// Raw manifest payload as sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneManifestData {
    pub version: String,
    pub files: Vec<(String, u64)>,
}

/// One file of a manifest. Identity is the file name; the size only feeds
/// progress reporting.
#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub name: String,
    pub size: u64,
}

impl PartialEq for ManifestEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ManifestEntry {}

impl Hash for ManifestEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Validated, ordered file manifest of one scene.
#[derive(Debug, Clone, Default)]
pub struct SceneManifest {
    entries: Vec<ManifestEntry>,
    index: HashMap<String, usize>,
    total_byte_size: u64,
    raw: Option<Bytes>,
}

impl SceneManifest {
    /// Manifest with no files, used before a scene was ever synced.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode a payload and keep the exact bytes for persisting later.
    pub fn parse(raw: Bytes) -> Result<Self> {
        let data: SceneManifestData = serde_json::from_slice(&raw)
            .map_err(|e| SyncError::InvalidManifest(format!("malformed JSON: {}", e)))?;
        let mut manifest = Self::from_data(data)?;
        manifest.raw = Some(raw);
        Ok(manifest)
    }

    /// Build from already decoded data.
    pub fn from_data(data: SceneManifestData) -> Result<Self> {
        let major = data.version.split('.').next().unwrap_or_default();
        if major != SUPPORTED_MAJOR_VERSION {
            return Err(SyncError::InvalidManifest(format!(
                "unsupported version {:?}",
                data.version
            )));
        }

        let mut entries = Vec::with_capacity(data.files.len());
        let mut index = HashMap::with_capacity(data.files.len());
        let mut total_byte_size: u64 = 0;

        for (name, size) in data.files {
            validate_file_name(&name)?;
            if index.insert(name.clone(), entries.len()).is_some() {
                return Err(SyncError::InvalidManifest(format!(
                    "duplicate file {:?}",
                    name
                )));
            }
            total_byte_size = total_byte_size.checked_add(size).ok_or_else(|| {
                SyncError::InvalidManifest("total byte size overflows".to_string())
            })?;
            entries.push(ManifestEntry { name, size });
        }

        Ok(Self {
            entries,
            index,
            total_byte_size,
            raw: None,
        })
    }

    /// Entries in manifest order.
    pub fn files(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn size_of(&self, name: &str) -> Option<u64> {
        self.index.get(name).map(|&i| self.entries[i].size)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_byte_size(&self) -> u64 {
        self.total_byte_size
    }

    /// Bytes to write as the completion marker.
    ///
    /// The payload as received when there is one, otherwise a fresh encoding.
    pub fn to_bytes(&self) -> Result<Bytes> {
        if let Some(raw) = &self.raw {
            return Ok(raw.clone());
        }
        let data = SceneManifestData {
            version: format!("{}.0", SUPPORTED_MAJOR_VERSION),
            files: self
                .entries
                .iter()
                .map(|e| (e.name.clone(), e.size))
                .collect(),
        };
        serde_json::to_vec(&data)
            .map(Bytes::from)
            .map_err(|e| SyncError::InvalidManifest(format!("encode failed: {}", e)))
    }
}

fn validate_file_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("empty file name")
    } else if name == "." || name == ".." {
        Some("relative path component")
    } else if name.contains('/') || name.contains('\\') {
        Some("path separator in file name")
    } else if name == MANIFEST_FILENAME {
        Some("reserved marker name")
    } else if is_reserved_name(name) {
        Some("reserved in-flight write suffix")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SyncError::InvalidManifest(format!("{}: {:?}", reason, name))),
        None => Ok(()),
    }
}
