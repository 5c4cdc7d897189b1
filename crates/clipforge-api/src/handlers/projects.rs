//! Project status, batch render and timeline handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use clipforge_models::{JobHandle, ProjectId};

use crate::error::ApiResult;
use crate::state::AppState;
use crate::views::{ProjectList, ProjectView, TimelineView};

#[derive(Debug, Serialize)]
pub struct BatchRenderResponse {
    pub queued: usize,
    pub jobs: Vec<JobHandle>,
}

/// `GET /projects`
pub async fn list_projects(State(state): State<AppState>) -> Json<ProjectList> {
    Json(ProjectList {
        projects: state.pipeline.list_projects().await,
    })
}

/// `GET /projects/:pid`
pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ProjectView>> {
    let snapshot = state.pipeline.status(&ProjectId::from(project_id)).await?;
    Ok(Json(ProjectView::new(&snapshot, state.media_prefix())))
}

/// `POST /projects/:pid/render`
pub async fn render_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<(StatusCode, Json<BatchRenderResponse>)> {
    let jobs = state.pipeline.render_all(&ProjectId::from(project_id)).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(BatchRenderResponse {
            queued: jobs.len(),
            jobs,
        }),
    ))
}

/// `GET /projects/:pid/timeline`
pub async fn get_timeline(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<TimelineView>> {
    let preview = state.pipeline.timeline(&ProjectId::from(project_id)).await?;
    Ok(Json(TimelineView::new(&preview, state.media_prefix())))
}

/// `POST /projects/:pid/timeline/arrange`
pub async fn arrange_timeline(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<TimelineView>> {
    let preview = state.pipeline.arrange(&ProjectId::from(project_id)).await?;
    Ok(Json(TimelineView::new(&preview, state.media_prefix())))
}
