//! Project records and long-form assembly state.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ArtifactKey, Clip, ClipId, JobId, RenderState, ReviewState};

/// Identifier of a project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Long-form assembly state of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyState {
    /// No current output (never assembled, or invalidated)
    #[default]
    Idle,
    /// An assembly job is running
    Assembling,
    /// Output matches the current clip set
    Assembled,
    /// Last assembly attempt failed
    Failed,
}

impl AssemblyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssemblyState::Idle => "idle",
            AssemblyState::Assembling => "assembling",
            AssemblyState::Assembled => "assembled",
            AssemblyState::Failed => "failed",
        }
    }
}

impl fmt::Display for AssemblyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A collection of clips plus their long-form assembly.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    pub id: ProjectId,

    /// Display name
    pub name: String,

    /// Clip ids in insertion order
    #[serde(default)]
    pub clip_ids: Vec<ClipId>,

    #[serde(default)]
    pub assembly_state: AssemblyState,

    /// Present only while `assembly_state == Assembled`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembled_output_path: Option<ArtifactKey>,

    /// Fingerprint of the input set used by the current/last assembly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly_fingerprint: Option<String>,

    /// Assembly job currently owning this project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly_job: Option<JobId>,

    /// Reason the last assembly failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(id: ProjectId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            clip_ids: Vec::new(),
            assembly_state: AssemblyState::Idle,
            assembled_output_path: None,
            assembly_fingerprint: None,
            assembly_job: None,
            assembly_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Drop a finished assembly because its inputs changed.
    ///
    /// Returns true when an `Assembled` result was invalidated.
    pub fn invalidate_assembly(&mut self) -> bool {
        if self.assembly_state != AssemblyState::Assembled {
            return false;
        }
        self.assembly_state = AssemblyState::Idle;
        self.assembled_output_path = None;
        self.assembly_fingerprint = None;
        self.touch();
        true
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Point-in-time view of a project and all of its clips.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProjectSnapshot {
    pub project: Project,
    /// Clips in project insertion order
    pub clips: Vec<Clip>,
}

impl ProjectSnapshot {
    /// Look up a clip in the snapshot.
    pub fn clip(&self, clip_id: &ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| &c.id == clip_id)
    }

    /// Summary counters for listings.
    pub fn summary(&self) -> ProjectSummary {
        let count_review = |s: ReviewState| self.clips.iter().filter(|c| c.review_state == s).count();
        ProjectSummary {
            id: self.project.id.clone(),
            name: self.project.name.clone(),
            clips_total: self.clips.len(),
            clips_pending: count_review(ReviewState::Pending),
            clips_approved: count_review(ReviewState::Approved),
            clips_rejected: count_review(ReviewState::Rejected),
            clips_rendered: self
                .clips
                .iter()
                .filter(|c| c.render_state == RenderState::Rendered)
                .count(),
            assembly_state: self.project.assembly_state,
        }
    }
}

/// Listing row for a project.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub clips_total: usize,
    pub clips_pending: usize,
    pub clips_approved: usize,
    pub clips_rejected: usize,
    pub clips_rendered: usize,
    pub assembly_state: AssemblyState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_only_assembled() {
        let mut project = Project::new(ProjectId::from("p1"), "Demo");
        assert!(!project.invalidate_assembly());

        project.assembly_state = AssemblyState::Assembled;
        project.assembled_output_path = Some(ArtifactKey::new("longform/p1/out.mp4").unwrap());
        project.assembly_fingerprint = Some("abc".to_string());

        assert!(project.invalidate_assembly());
        assert_eq!(project.assembly_state, AssemblyState::Idle);
        assert!(project.assembled_output_path.is_none());
        assert!(project.assembly_fingerprint.is_none());
    }

    #[test]
    fn test_failed_is_not_invalidated() {
        let mut project = Project::new(ProjectId::from("p1"), "Demo");
        project.assembly_state = AssemblyState::Failed;
        assert!(!project.invalidate_assembly());
        assert_eq!(project.assembly_state, AssemblyState::Failed);
    }
}
