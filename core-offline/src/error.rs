use bridge_traits::BridgeError;
use thiserror::Error;

/// Shown to the user when a sync is attempted without connectivity.
pub const OFFLINE_MESSAGE: &str = "You must be online to synchronize files!";

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{}", OFFLINE_MESSAGE)]
    Offline,

    #[error("Could not fetch manifest: {reason}")]
    ManifestFetchFailed { status: u16, reason: String },

    #[error("Could not fetch {filename}! (HTTP {status})")]
    FileFetchFailed { filename: String, status: u16 },

    #[error("Synchronization aborted")]
    Aborted,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Sync already in progress for scene {scene_id}")]
    SyncInProgress { scene_id: String },

    #[error("Scene {scene_id} not found")]
    SceneNotFound { scene_id: String },

    #[error("Download task failed: {0}")]
    Task(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// True when the caller's cancellation ended the sync.
    pub fn is_aborted(&self) -> bool {
        matches!(self, SyncError::Aborted)
    }

    pub(crate) fn storage(context: &str, err: BridgeError) -> Self {
        SyncError::Storage(format!("{}: {}", context, err))
    }
}

impl From<core_runtime::Error> for SyncError {
    fn from(err: core_runtime::Error) -> Self {
        SyncError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
