//! Clip records and their review/render lifecycle.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ArtifactKey, JobId, ProjectId};

/// Identifier of a clip, unique within its project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ClipId(pub String);

impl ClipId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClipId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ClipId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Human review state of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// Waiting for a reviewer
    #[default]
    Pending,
    /// Accepted for the long-form cut
    Approved,
    /// Discarded; final for the current review cycle
    Rejected,
}

impl ReviewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewState::Pending => "pending",
            ReviewState::Approved => "approved",
            ReviewState::Rejected => "rejected",
        }
    }

    /// Whether a reviewer may move a clip from `self` to `next`.
    ///
    /// `Approved -> Rejected` is allowed so an included clip can be pulled
    /// from the cut; nothing leaves `Rejected`.
    pub fn can_transition_to(&self, next: ReviewDecision) -> bool {
        matches!(
            (self, next),
            (ReviewState::Pending, ReviewDecision::Approve)
                | (ReviewState::Pending, ReviewDecision::Reject)
                | (ReviewState::Approved, ReviewDecision::Reject)
        )
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reviewer action applied through the project API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    /// Review state a successful decision lands in.
    pub fn target_state(&self) -> ReviewState {
        match self {
            ReviewDecision::Approve => ReviewState::Approved,
            ReviewDecision::Reject => ReviewState::Rejected,
        }
    }
}

/// Render lifecycle of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderState {
    #[default]
    NotRendered,
    /// Admitted to the render queue (also used while waiting out a retry backoff)
    Queued,
    /// A worker is executing the render
    Rendering,
    /// Finished artifact available
    Rendered,
    /// Attempts exhausted or input was unusable
    Failed,
}

impl RenderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderState::NotRendered => "not_rendered",
            RenderState::Queued => "queued",
            RenderState::Rendering => "rendering",
            RenderState::Rendered => "rendered",
            RenderState::Failed => "failed",
        }
    }

    /// Queued or rendering.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, RenderState::Queued | RenderState::Rendering)
    }
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A short video segment under review.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Clip {
    /// Clip ID (unique within the project)
    pub id: ClipId,

    /// Owning project
    pub project_id: ProjectId,

    /// Raw footage location, as supplied by ingestion
    pub source_path: String,

    /// Segment start within the source, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,

    /// Segment end within the source, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,

    /// Long-form position hint; ties are broken by `id`
    pub order: i64,

    /// Emotion tag assigned by the scorer (e.g. "Funny")
    pub emotion_label: String,

    /// Externally supplied score, immutable after creation
    pub score: f64,

    #[serde(default)]
    pub review_state: ReviewState,

    #[serde(default)]
    pub render_state: RenderState,

    /// Rendered artifact; present only while `render_state == Rendered`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_path: Option<ArtifactKey>,

    /// Attempts made in the current render cycle
    #[serde(default)]
    pub render_attempts: u32,

    /// Last render failure reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_error: Option<String>,

    /// Render job currently owning this clip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_job: Option<JobId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Clip {
    /// Create a pending, unrendered clip.
    pub fn new(new: NewClip) -> Self {
        let now = Utc::now();
        Self {
            id: new.id,
            project_id: new.project_id,
            source_path: new.source_path,
            start: new.start,
            end: new.end,
            order: new.order.unwrap_or_default(),
            emotion_label: new.emotion_label,
            score: new.score,
            review_state: ReviewState::Pending,
            render_state: RenderState::NotRendered,
            rendered_path: None,
            render_attempts: 0,
            render_error: None,
            render_job: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Segment duration when both bounds are known.
    pub fn duration(&self) -> Option<f64> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if end > start => Some(end - start),
            _ => None,
        }
    }

    /// Approved and rendered: eligible as assembly input.
    pub fn is_assembly_ready(&self) -> bool {
        self.review_state == ReviewState::Approved
            && self.render_state == RenderState::Rendered
            && self.rendered_path.is_some()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Clip description handed over by ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NewClip {
    pub id: ClipId,
    pub project_id: ProjectId,
    pub source_path: String,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
    /// Position hint; defaults to the clip's insertion index
    #[serde(default)]
    pub order: Option<i64>,
    pub emotion_label: String,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Clip {
        Clip::new(NewClip {
            id: ClipId::from("c1"),
            project_id: ProjectId::from("p1"),
            source_path: "/footage/raw.mp4".to_string(),
            start: Some(12.5),
            end: Some(30.0),
            order: None,
            emotion_label: "Funny".to_string(),
            score: 0.82,
        })
    }

    #[test]
    fn test_review_transitions() {
        assert!(ReviewState::Pending.can_transition_to(ReviewDecision::Approve));
        assert!(ReviewState::Pending.can_transition_to(ReviewDecision::Reject));
        assert!(ReviewState::Approved.can_transition_to(ReviewDecision::Reject));
        assert!(!ReviewState::Approved.can_transition_to(ReviewDecision::Approve));
        assert!(!ReviewState::Rejected.can_transition_to(ReviewDecision::Approve));
        assert!(!ReviewState::Rejected.can_transition_to(ReviewDecision::Reject));
    }

    #[test]
    fn test_new_clip_defaults() {
        let clip = sample();
        assert_eq!(clip.review_state, ReviewState::Pending);
        assert_eq!(clip.render_state, RenderState::NotRendered);
        assert!(clip.rendered_path.is_none());
        assert_eq!(clip.duration(), Some(17.5));
        assert!(!clip.is_assembly_ready());
    }

    #[test]
    fn test_state_serialization() {
        assert_eq!(
            serde_json::to_string(&RenderState::NotRendered).unwrap(),
            "\"not_rendered\""
        );
        assert_eq!(serde_json::to_string(&ReviewState::Approved).unwrap(), "\"approved\"");
    }
}
