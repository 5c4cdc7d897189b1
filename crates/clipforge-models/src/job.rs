//! Job handles and job status records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{ArtifactKey, ClipId, ProjectId};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Type of job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Render a single clip
    Render,
    /// Concatenate a project's approved clips
    Assemble,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Render => "render",
            JobKind::Assemble => "assemble",
        }
    }
}

/// Job state as seen by pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting for a worker slot
    #[default]
    Queued,
    /// Executing against the render capability
    Running,
    /// Waiting out a backoff before the next attempt
    Retrying,
    Succeeded,
    Failed,
    /// Cancelled, or its result was discarded
    Cancelled,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Retrying => "retrying",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed | JobState::Cancelled)
    }
}

/// Handle returned to callers when work is admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JobHandle {
    pub job_id: JobId,
    pub kind: JobKind,
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_id: Option<ClipId>,
}

impl JobHandle {
    pub fn render(project_id: ProjectId, clip_id: ClipId) -> Self {
        Self {
            job_id: JobId::new(),
            kind: JobKind::Render,
            project_id,
            clip_id: Some(clip_id),
        }
    }

    pub fn assemble(project_id: ProjectId) -> Self {
        Self {
            job_id: JobId::new(),
            kind: JobKind::Assemble,
            project_id,
            clip_id: None,
        }
    }
}

/// Status record for a job, kept for polling.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    #[serde(flatten)]
    pub handle: JobHandle,
    pub state: JobState,
    /// Attempts made so far
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Artifact produced on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<ArtifactKey>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(handle: JobHandle) -> Self {
        let now = Utc::now();
        Self {
            handle,
            state: JobState::Queued,
            attempts: 0,
            error: None,
            output: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.handle.job_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::Retrying.is_terminal());
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
    }

    #[test]
    fn test_record_serializes_handle_inline() {
        let handle = JobHandle::render(ProjectId::from("p1"), ClipId::from("c1"));
        let record = JobRecord::new(handle.clone());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["job_id"], handle.job_id.as_str());
        assert_eq!(value["kind"], "render");
        assert_eq!(value["clip_id"], "c1");
        assert_eq!(value["state"], "queued");
    }
}
