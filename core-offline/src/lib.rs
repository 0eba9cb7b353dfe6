//! # Offline Scene Sync
//!
//! Keeps a local copy of a scene's asset files consistent with the remote
//! manifest, downloading only what is missing.
//!
//! ## Overview
//!
//! A sync pass:
//! - Fetches the remote manifest while scanning the local directory
//! - Downloads every file missing locally, at most `max_concurrent` at a time
//! - Commits the remote manifest as `manifest.json`, the completion marker
//! - Deletes local files the new manifest no longer references
//!
//! Passes are resumable. An aborted or failed pass never writes the marker,
//! and the next pass skips whatever already landed on disk.
//!
//! ## Components
//!
//! - **Manifest Model** (`manifest`): Validated filename → size list
//! - **Local Inventory Scanner** (`scanner`): Existing-file set for diffing
//! - **Download Scheduler** (`scheduler`): Semaphore-bounded fetch pool
//! - **Completion & Cleanup** (`commit`): Marker write, flush, orphan removal
//! - **Status Reporting** (`reporter`): Host-facing lifecycle sink
//! - **Scenes** (`scene`, `context`): Public handles tying it together

mod commit;
pub mod context;
pub mod error;
pub mod manifest;
pub mod progress;
pub mod reporter;
pub mod request;
pub mod scanner;
pub mod scene;
pub mod scheduler;

pub use context::OfflineContext;
pub use error::{Result, SyncError, OFFLINE_MESSAGE};
pub use manifest::{ManifestEntry, SceneManifest, SceneManifestData, MANIFEST_FILENAME};
pub use reporter::{EventBusReporter, ReporterSet, SceneStatus, StatusReporter, TracingReporter};
pub use request::{RequestFormatter, SasRequestFormatter};
pub use scanner::{scan_existing, ExistingFiles};
pub use scene::{OfflineScene, SyncSummary};
pub use scheduler::DownloadStats;
