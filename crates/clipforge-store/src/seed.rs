//! Seed file ingestion.
//!
//! A seed file lists projects and their candidate clips as produced by the
//! upstream scoring step:
//!
//! ```json
//! { "projects": [ { "id": "p1", "name": "Episode 12", "clips": [
//!     { "id": "c1", "source_path": "/footage/ep12.mp4", "start": 10.0,
//!       "end": 42.5, "emotion_label": "Funny", "score": 0.91 } ] } ] }
//! ```

use std::path::Path;

use clipforge_models::{ClipId, NewClip, ProjectId};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::{Validate, ValidationError};

use crate::error::{StoreError, StoreResult};
use crate::store::ClipStore;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SeedFile {
    #[validate(nested)]
    pub projects: Vec<SeedProject>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SeedProject {
    #[validate(length(min = 1, max = 128))]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub clips: Vec<SeedClip>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_clip"))]
pub struct SeedClip {
    #[validate(length(min = 1, max = 128))]
    pub id: String,
    #[validate(length(min = 1))]
    pub source_path: String,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub emotion_label: String,
    pub score: f64,
}

fn validate_clip(clip: &SeedClip) -> Result<(), ValidationError> {
    if !clip.score.is_finite() {
        return Err(ValidationError::new("score_not_finite"));
    }
    if let (Some(start), Some(end)) = (clip.start, clip.end) {
        if !(start >= 0.0 && end > start) {
            return Err(ValidationError::new("invalid_window"));
        }
    }
    Ok(())
}

/// Counts from applying a seed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub projects: usize,
    pub clips_inserted: usize,
    pub clips_existing: usize,
}

impl SeedFile {
    pub fn from_json(bytes: &[u8]) -> StoreResult<Self> {
        let seed: SeedFile = serde_json::from_slice(bytes)?;
        seed.validate()
            .map_err(|e| StoreError::invalid_state(format!("invalid seed: {e}")))?;
        Ok(seed)
    }

    pub async fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Self::from_json(&bytes)
    }

    /// Create missing projects and insert missing clips. Existing records are
    /// left untouched, so applying the same seed twice is a no-op.
    pub async fn apply(&self, store: &ClipStore) -> StoreResult<SeedReport> {
        let mut report = SeedReport::default();
        for project in &self.projects {
            let project_id = ProjectId::from_string(project.id.clone());
            let name = project.name.clone().unwrap_or_else(|| project.id.clone());
            store.create_project(project_id.clone(), name).await?;
            report.projects += 1;

            for clip in &project.clips {
                let (_, inserted) = store
                    .insert_clip(NewClip {
                        id: ClipId::from_string(clip.id.clone()),
                        project_id: project_id.clone(),
                        source_path: clip.source_path.clone(),
                        start: clip.start,
                        end: clip.end,
                        order: clip.order,
                        emotion_label: clip.emotion_label.clone(),
                        score: clip.score,
                    })
                    .await?;
                if inserted {
                    report.clips_inserted += 1;
                } else {
                    report.clips_existing += 1;
                }
            }
        }

        info!(
            projects = report.projects,
            inserted = report.clips_inserted,
            existing = report.clips_existing,
            "Applied seed"
        );
        Ok(report)
    }
}
