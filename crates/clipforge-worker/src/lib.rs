//! Render and assembly workers for the ClipForge pipeline.
//!
//! This crate provides:
//! - A bounded render queue with per-clip exclusivity and retry/backoff
//! - The long-form assembly coordinator
//! - Job status tracking and a pipeline event bus
//! - The [`Pipeline`] facade used by the HTTP API

pub mod assembly;
pub mod config;
pub mod error;
pub mod events;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod render_queue;
pub mod retry;

pub use assembly::AssemblyCoordinator;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use events::EventBus;
pub use jobs::JobRegistry;
pub use logging::JobLogger;
pub use pipeline::{Pipeline, TimelineEntry, TimelinePreview};
pub use render_queue::RenderQueue;
pub use retry::RetryConfig;
