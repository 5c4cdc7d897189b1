//! Per-clip review and render handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;

use clipforge_models::{ClipId, JobHandle, ProjectId};

use crate::error::ApiResult;
use crate::state::AppState;
use crate::views::ClipView;

/// Response for an admitted render.
#[derive(Debug, Serialize)]
pub struct RenderQueuedResponse {
    pub queued: bool,
    pub job: JobHandle,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

fn ids(project_id: String, clip_id: String) -> (ProjectId, ClipId) {
    (ProjectId::from(project_id), ClipId::from(clip_id))
}

/// `POST /projects/:pid/clips/:cid/approve`
pub async fn approve_clip(
    State(state): State<AppState>,
    Path((project_id, clip_id)): Path<(String, String)>,
) -> ApiResult<Json<ClipView>> {
    let (project_id, clip_id) = ids(project_id, clip_id);
    let clip = state.pipeline.approve(&project_id, &clip_id).await?;
    Ok(Json(ClipView::new(&clip, state.media_prefix())))
}

/// `POST /projects/:pid/clips/:cid/reject`
pub async fn reject_clip(
    State(state): State<AppState>,
    Path((project_id, clip_id)): Path<(String, String)>,
) -> ApiResult<Json<ClipView>> {
    let (project_id, clip_id) = ids(project_id, clip_id);
    let clip = state.pipeline.reject(&project_id, &clip_id).await?;
    Ok(Json(ClipView::new(&clip, state.media_prefix())))
}

/// `POST /projects/:pid/clips/:cid/render`
///
/// Returns the job that owns the clip's render, which is the existing one
/// when a render is already queued or running.
pub async fn render_clip(
    State(state): State<AppState>,
    Path((project_id, clip_id)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Json<RenderQueuedResponse>)> {
    let (project_id, clip_id) = ids(project_id, clip_id);
    let job = state.pipeline.enqueue_render(&project_id, &clip_id).await?;
    info!(
        project_id = %project_id,
        clip_id = %clip_id,
        job_id = %job.job_id,
        "Render requested"
    );
    Ok((
        StatusCode::ACCEPTED,
        Json(RenderQueuedResponse { queued: true, job }),
    ))
}

/// `DELETE /projects/:pid/clips/:cid/render`
pub async fn cancel_clip_render(
    State(state): State<AppState>,
    Path((project_id, clip_id)): Path<(String, String)>,
) -> ApiResult<Json<CancelResponse>> {
    let (project_id, clip_id) = ids(project_id, clip_id);
    let cancelled = state.pipeline.cancel_render(&project_id, &clip_id).await?;
    Ok(Json(CancelResponse { cancelled }))
}
