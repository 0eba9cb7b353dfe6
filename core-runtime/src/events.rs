//! # Event Bus System
//!
//! Broadcasts offline-scene lifecycle events using `tokio::sync::broadcast`, so a
//! UI (or any number of observers) can follow sync progress without being the
//! one that started the sync.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: `CoreEvent` wrapping the per-scene `SceneEvent`
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   emit    ┌───────────┐   subscribe   ┌────────────┐
//! │ OfflineScene ├──────────>│ EventBus  ├──────────────>│ Subscriber │
//! └──────────────┘           │ (broadcast│               └────────────┘
//! ┌──────────────┐   emit    │  channel) │   subscribe   ┌────────────┐
//! │OfflineContext├──────────>│           ├──────────────>│ Subscriber │
//! └──────────────┘           └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SceneEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Scene(SceneEvent::Status {
//!         scene_id: "scene-1".to_string(),
//!         status: "synchronizing".to_string(),
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.scene_id(), "scene-1");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! The event bus uses `tokio::sync::broadcast`, which can produce two types of errors:
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//!   Progress events are the usual culprit; they are throttled at the source
//!   but a stalled subscriber will still lag.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published and received through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Offline scene lifecycle events
    Scene(SceneEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Scene(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Scene(SceneEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Scene(SceneEvent::Status { status, .. }) => match status.as_str() {
                "error" => EventSeverity::Error,
                "offline" | "aborted" => EventSeverity::Warning,
                "synchronized" | "scene deleted" => EventSeverity::Info,
                _ => EventSeverity::Debug,
            },
            CoreEvent::Scene(_) => EventSeverity::Debug,
        }
    }

    /// Scene the event belongs to.
    pub fn scene_id(&self) -> &str {
        match self {
            CoreEvent::Scene(e) => e.scene_id(),
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Scene Events
// ============================================================================

/// Events emitted while a scene is synchronized or deleted.
///
/// `status` carries the lowercase status word (`"offline"`, `"synchronizing"`,
/// `"aborted"`, `"error"`, `"synchronized"`, `"deleting"`, `"scene deleted"`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SceneEvent {
    /// Lifecycle status changed.
    Status { scene_id: String, status: String },
    /// Informational step message, e.g. "fetching manifest".
    Info { scene_id: String, message: String },
    /// A failure ended the current operation.
    Error { scene_id: String, message: String },
    /// Byte progress. Both `None` marks the end of the progress phase.
    Progress {
        scene_id: String,
        bytes_done: Option<u64>,
        bytes_total: Option<u64>,
    },
}

impl SceneEvent {
    fn description(&self) -> &str {
        match self {
            SceneEvent::Status { .. } => "Scene status changed",
            SceneEvent::Info { .. } => "Scene sync step",
            SceneEvent::Error { .. } => "Scene sync failed",
            SceneEvent::Progress { .. } => "Scene sync progress",
        }
    }

    pub fn scene_id(&self) -> &str {
        match self {
            SceneEvent::Status { scene_id, .. }
            | SceneEvent::Info { scene_id, .. }
            | SceneEvent::Error { scene_id, .. }
            | SceneEvent::Progress { scene_id, .. } => scene_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for core events.
///
/// Cloning is cheap; all clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering capabilities.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let scene_one = EventStream::new(event_bus.subscribe()).for_scene("scene-1");
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Only pass events of one scene.
    pub fn for_scene(self, scene_id: impl Into<String>) -> Self {
        let scene_id = scene_id.into();
        self.filter(move |event| event.scene_id() == scene_id)
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(scene_id: &str, status: &str) -> CoreEvent {
        CoreEvent::Scene(SceneEvent::Status {
            scene_id: scene_id.to_string(),
            status: status.to_string(),
        })
    }

    fn progress(scene_id: &str, done: Option<u64>, total: Option<u64>) -> CoreEvent {
        CoreEvent::Scene(SceneEvent::Progress {
            scene_id: scene_id.to_string(),
            bytes_done: done,
            bytes_total: total,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::default();
        assert!(bus.emit(status("s1", "synchronizing")).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = progress("s1", Some(10), Some(100));
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_for_scene() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe()).for_scene("s2");

        bus.emit(status("s1", "synchronizing")).ok();
        bus.emit(status("s2", "synchronized")).ok();

        let received = stream.recv().await.unwrap();
        assert_eq!(received, status("s2", "synchronized"));
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(progress("s1", Some(i), Some(5))).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let error = CoreEvent::Scene(SceneEvent::Error {
            scene_id: "s1".to_string(),
            message: "HTTP 500".to_string(),
        });
        assert_eq!(error.severity(), EventSeverity::Error);
        assert_eq!(status("s1", "error").severity(), EventSeverity::Error);
        assert_eq!(status("s1", "aborted").severity(), EventSeverity::Warning);
        assert_eq!(status("s1", "synchronized").severity(), EventSeverity::Info);
        assert_eq!(progress("s1", None, None).severity(), EventSeverity::Debug);
        assert_eq!(error.description(), "Scene sync failed");
    }

    #[test]
    fn test_event_serialization() {
        let event = progress("scene-9", Some(50), Some(100));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Scene\""));
        assert!(json.contains("\"event\":\"Progress\""));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }
}
