//! Shared data models for the ClipForge review pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Clips and their review/render lifecycle
//! - Projects and long-form assembly state
//! - Artifact keys (caller-resolvable output locations)
//! - Job handles, job records and pipeline events
//! - Deterministic timeline ordering and fingerprints

pub mod artifact;
pub mod clip;
pub mod event;
pub mod job;
pub mod project;
pub mod timeline;

// Re-export common types
pub use artifact::{ArtifactKey, ArtifactKeyError};
pub use clip::{Clip, ClipId, NewClip, RenderState, ReviewDecision, ReviewState};
pub use event::{PipelineEvent, PipelineEventKind};
pub use job::{JobHandle, JobId, JobKind, JobRecord, JobState};
pub use project::{AssemblyState, Project, ProjectId, ProjectSnapshot, ProjectSummary};
