//! Pipeline events published to subscribers (SSE, tests).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{ArtifactKey, ClipId, JobId, ProjectId};

/// Event envelope.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PipelineEvent {
    pub project_id: ProjectId,
    pub job_id: JobId,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: PipelineEventKind,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEventKind {
    RenderQueued { clip_id: ClipId },
    RenderStarted { clip_id: ClipId, attempt: u32 },
    RenderRetrying { clip_id: ClipId, attempt: u32, delay_ms: u64, error: String },
    RenderSucceeded { clip_id: ClipId, output: ArtifactKey },
    RenderFailed { clip_id: ClipId, attempts: u32, error: String },
    /// Cancelled before running, or its late result was dropped
    RenderCancelled { clip_id: ClipId },
    AssemblyStarted { clips: usize, fingerprint: String },
    AssemblyRetrying { attempt: u32, delay_ms: u64, error: String },
    AssemblyCompleted { output: ArtifactKey },
    AssemblyFailed { error: String },
    /// Output dropped because the clip set changed while assembling
    AssemblyDiscarded,
}

impl PipelineEventKind {
    /// Event name used for SSE `event:` lines.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEventKind::RenderQueued { .. } => "render_queued",
            PipelineEventKind::RenderStarted { .. } => "render_started",
            PipelineEventKind::RenderRetrying { .. } => "render_retrying",
            PipelineEventKind::RenderSucceeded { .. } => "render_succeeded",
            PipelineEventKind::RenderFailed { .. } => "render_failed",
            PipelineEventKind::RenderCancelled { .. } => "render_cancelled",
            PipelineEventKind::AssemblyStarted { .. } => "assembly_started",
            PipelineEventKind::AssemblyRetrying { .. } => "assembly_retrying",
            PipelineEventKind::AssemblyCompleted { .. } => "assembly_completed",
            PipelineEventKind::AssemblyFailed { .. } => "assembly_failed",
            PipelineEventKind::AssemblyDiscarded => "assembly_discarded",
        }
    }

    /// Whether the job this event belongs to has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineEventKind::RenderSucceeded { .. }
                | PipelineEventKind::RenderFailed { .. }
                | PipelineEventKind::RenderCancelled { .. }
                | PipelineEventKind::AssemblyCompleted { .. }
                | PipelineEventKind::AssemblyFailed { .. }
                | PipelineEventKind::AssemblyDiscarded
        )
    }
}

impl PipelineEvent {
    pub fn new(project_id: ProjectId, job_id: JobId, kind: PipelineEventKind) -> Self {
        Self {
            project_id,
            job_id,
            timestamp: Utc::now(),
            kind,
        }
    }
}
