//! # Status Reporting
//!
//! Hosts observe a scene through a [`StatusReporter`]: lifecycle status,
//! step messages, errors and byte progress. Reporting is fire-and-forget;
//! a reporter can never fail or slow down a sync beyond its own call.

use core_runtime::events::{CoreEvent, EventBus, SceneEvent};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Lifecycle status of an offline scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneStatus {
    /// No connectivity; nothing was attempted
    Offline,
    Synchronizing,
    /// Cancelled by the caller
    Aborted,
    Error,
    Synchronized,
    Deleting,
    /// Scene directory removed
    Deleted,
}

impl SceneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SceneStatus::Offline => "offline",
            SceneStatus::Synchronizing => "synchronizing",
            SceneStatus::Aborted => "aborted",
            SceneStatus::Error => "error",
            SceneStatus::Synchronized => "synchronized",
            SceneStatus::Deleting => "deleting",
            SceneStatus::Deleted => "scene deleted",
        }
    }
}

impl fmt::Display for SceneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for scene lifecycle reports.
///
/// Only `status` and `error` must be implemented.
pub trait StatusReporter: Send + Sync {
    fn status(&self, status: SceneStatus);

    fn error(&self, message: &str);

    fn info(&self, _message: &str) {}

    /// Bytes done out of total. `(None, None)` ends the progress phase.
    fn progress(&self, _done: Option<u64>, _total: Option<u64>) {}
}

/// Publishes reports as [`SceneEvent`]s on the core event bus.
#[derive(Debug, Clone)]
pub struct EventBusReporter {
    bus: EventBus,
    scene_id: String,
}

impl EventBusReporter {
    pub fn new(bus: EventBus, scene_id: impl Into<String>) -> Self {
        Self {
            bus,
            scene_id: scene_id.into(),
        }
    }

    fn emit(&self, event: SceneEvent) {
        // No subscribers is not an error for a status feed
        let _ = self.bus.emit(CoreEvent::Scene(event));
    }
}

impl StatusReporter for EventBusReporter {
    fn status(&self, status: SceneStatus) {
        self.emit(SceneEvent::Status {
            scene_id: self.scene_id.clone(),
            status: status.to_string(),
        });
    }

    fn error(&self, message: &str) {
        self.emit(SceneEvent::Error {
            scene_id: self.scene_id.clone(),
            message: message.to_string(),
        });
    }

    fn info(&self, message: &str) {
        self.emit(SceneEvent::Info {
            scene_id: self.scene_id.clone(),
            message: message.to_string(),
        });
    }

    fn progress(&self, done: Option<u64>, total: Option<u64>) {
        self.emit(SceneEvent::Progress {
            scene_id: self.scene_id.clone(),
            bytes_done: done,
            bytes_total: total,
        });
    }
}

/// Writes reports to `tracing`.
#[derive(Debug, Clone)]
pub struct TracingReporter {
    scene_id: String,
}

impl TracingReporter {
    pub fn new(scene_id: impl Into<String>) -> Self {
        Self {
            scene_id: scene_id.into(),
        }
    }
}

impl StatusReporter for TracingReporter {
    fn status(&self, status: SceneStatus) {
        match status {
            SceneStatus::Error => error!(scene_id = %self.scene_id, %status, "Scene status"),
            SceneStatus::Offline | SceneStatus::Aborted => {
                warn!(scene_id = %self.scene_id, %status, "Scene status")
            }
            _ => info!(scene_id = %self.scene_id, %status, "Scene status"),
        }
    }

    fn error(&self, message: &str) {
        error!(scene_id = %self.scene_id, detail = message, "Scene error");
    }

    fn info(&self, message: &str) {
        info!(scene_id = %self.scene_id, step = message, "Scene step");
    }

    fn progress(&self, done: Option<u64>, total: Option<u64>) {
        debug!(scene_id = %self.scene_id, ?done, ?total, "Scene progress");
    }
}

/// Forwards every report to several reporters in order.
#[derive(Clone, Default)]
pub struct ReporterSet {
    reporters: Vec<Arc<dyn StatusReporter>>,
}

impl ReporterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn push_opt(&mut self, reporter: Option<Arc<dyn StatusReporter>>) {
        self.reporters.extend(reporter);
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl fmt::Debug for ReporterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReporterSet")
            .field("reporters", &self.reporters.len())
            .finish()
    }
}

impl StatusReporter for ReporterSet {
    fn status(&self, status: SceneStatus) {
        self.reporters.iter().for_each(|r| r.status(status));
    }

    fn error(&self, message: &str) {
        self.reporters.iter().for_each(|r| r.error(message));
    }

    fn info(&self, message: &str) {
        self.reporters.iter().for_each(|r| r.info(message));
    }

    fn progress(&self, done: Option<u64>, total: Option<u64>) {
        self.reporters.iter().for_each(|r| r.progress(done, total));
    }
}
