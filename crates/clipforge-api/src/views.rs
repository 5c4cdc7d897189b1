//! Response bodies.
//!
//! Artifact keys leave the API as URLs under the media prefix, and clip
//! source paths are never included.

use chrono::{DateTime, Utc};
use serde::Serialize;

use clipforge_models::{
    ArtifactKey, AssemblyState, Clip, ClipId, JobId, JobKind, JobRecord, JobState, PipelineEvent,
    ProjectId, ProjectSnapshot, ProjectSummary, RenderState, ReviewState,
};
use clipforge_worker::{TimelineEntry, TimelinePreview};

fn url(key: &Option<ArtifactKey>, prefix: &str) -> Option<String> {
    key.as_ref().map(|k| k.to_url(prefix))
}

#[derive(Debug, Serialize)]
pub struct ClipView {
    pub id: ClipId,
    pub project_id: ProjectId,
    pub order: i64,
    pub emotion_label: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub review_state: ReviewState,
    pub render_state: RenderState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered_url: Option<String>,
    pub render_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_job: Option<JobId>,
    pub updated_at: DateTime<Utc>,
}

impl ClipView {
    pub fn new(clip: &Clip, prefix: &str) -> Self {
        Self {
            id: clip.id.clone(),
            project_id: clip.project_id.clone(),
            order: clip.order,
            emotion_label: clip.emotion_label.clone(),
            score: clip.score,
            start: clip.start,
            end: clip.end,
            duration: clip.duration(),
            review_state: clip.review_state,
            render_state: clip.render_state,
            rendered_url: url(&clip.rendered_path, prefix),
            render_attempts: clip.render_attempts,
            render_error: clip.render_error.clone(),
            render_job: clip.render_job.clone(),
            updated_at: clip.updated_at,
        }
    }
}

/// Full project status.
#[derive(Debug, Serialize)]
pub struct ProjectView {
    pub id: ProjectId,
    pub name: String,
    pub assembly_state: AssemblyState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assembled_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assembly_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assembly_job: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assembly_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub clips: Vec<ClipView>,
}

impl ProjectView {
    pub fn new(snapshot: &ProjectSnapshot, prefix: &str) -> Self {
        let project = &snapshot.project;
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            assembly_state: project.assembly_state,
            assembled_url: url(&project.assembled_output_path, prefix),
            assembly_fingerprint: project.assembly_fingerprint.clone(),
            assembly_job: project.assembly_job.clone(),
            assembly_error: project.assembly_error.clone(),
            created_at: project.created_at,
            updated_at: project.updated_at,
            clips: snapshot.clips.iter().map(|c| ClipView::new(c, prefix)).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectList {
    pub projects: Vec<ProjectSummary>,
}

#[derive(Debug, Serialize)]
pub struct JobView {
    pub job_id: JobId,
    pub kind: JobKind,
    pub project_id: ProjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_id: Option<ClipId>,
    pub state: JobState,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobView {
    pub fn new(record: &JobRecord, prefix: &str) -> Self {
        Self {
            job_id: record.handle.job_id.clone(),
            kind: record.handle.kind,
            project_id: record.handle.project_id.clone(),
            clip_id: record.handle.clip_id.clone(),
            state: record.state,
            attempts: record.attempts,
            error: record.error.clone(),
            output_url: url(&record.output, prefix),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TimelineEntryView {
    pub clip_id: ClipId,
    pub order: i64,
    pub emotion_label: String,
    pub score: f64,
    pub render_state: RenderState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub ready: bool,
}

impl TimelineEntryView {
    fn new(entry: &TimelineEntry, prefix: &str) -> Self {
        Self {
            clip_id: entry.clip_id.clone(),
            order: entry.order,
            emotion_label: entry.emotion_label.clone(),
            score: entry.score,
            render_state: entry.render_state,
            rendered_url: url(&entry.rendered_path, prefix),
            duration: entry.duration,
            ready: entry.ready,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TimelineView {
    pub project_id: ProjectId,
    pub assembly_state: AssemblyState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub ready: bool,
    pub entries: Vec<TimelineEntryView>,
}

impl TimelineView {
    pub fn new(preview: &TimelinePreview, prefix: &str) -> Self {
        Self {
            project_id: preview.project_id.clone(),
            assembly_state: preview.assembly_state,
            fingerprint: preview.fingerprint.clone(),
            ready: preview.ready,
            entries: preview
                .entries
                .iter()
                .map(|e| TimelineEntryView::new(e, prefix))
                .collect(),
        }
    }
}

/// Pipeline event as sent over SSE, with `output` turned into a URL.
pub fn event_json(event: &PipelineEvent, prefix: &str) -> serde_json::Value {
    let mut value = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
    if let Some(output) = value.get_mut("output") {
        if let Some(key) = output.as_str() {
            *output = serde_json::Value::String(format!("{}/{}", prefix.trim_end_matches('/'), key));
        }
    }
    value
}
