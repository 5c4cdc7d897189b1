//! Store error types.

use clipforge_models::{ClipId, ProjectId};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Project not found: {0}")]
    ProjectNotFound(ProjectId),

    #[error("Clip not found: {project_id}/{clip_id}")]
    ClipNotFound { project_id: ProjectId, clip_id: ClipId },

    #[error("Invalid transition for clip {clip_id}: {from} -> {to}")]
    InvalidTransition {
        clip_id: ClipId,
        from: String,
        to: String,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Clips not ready for assembly: {}", join_ids(.clips))]
    NotReady { clips: Vec<ClipId> },

    #[error("Nothing to do: {0}")]
    EmptyInput(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn join_ids(ids: &[ClipId]) -> String {
    ids.iter().map(ClipId::as_str).collect::<Vec<_>>().join(", ")
}

impl StoreError {
    pub fn clip_not_found(project_id: &ProjectId, clip_id: &ClipId) -> Self {
        Self::ClipNotFound {
            project_id: project_id.clone(),
            clip_id: clip_id.clone(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// True for "no such project/clip" errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::ProjectNotFound(_) | StoreError::ClipNotFound { .. }
        )
    }
}
