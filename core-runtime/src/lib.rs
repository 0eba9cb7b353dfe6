//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the offline scene core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that `core-offline` depends on.
//! It establishes the logging conventions, the validated configuration that
//! carries the host bridges, and the event broadcasting used to observe syncs.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{OfflineConfig, OfflineConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream, SceneEvent};
