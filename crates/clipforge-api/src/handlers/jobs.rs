//! Job status handler.

use axum::extract::{Path, State};
use axum::Json;

use clipforge_models::JobId;

use crate::error::ApiResult;
use crate::state::AppState;
use crate::views::JobView;

/// `GET /jobs/:job_id`
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobView>> {
    let record = state.pipeline.job(&JobId::from(job_id)).await?;
    Ok(Json(JobView::new(&record, state.media_prefix())))
}
