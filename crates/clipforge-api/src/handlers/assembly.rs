//! Long-form assembly handler.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use clipforge_models::{JobState, ProjectId};
use clipforge_worker::WorkerError;

use crate::error::ApiResult;
use crate::state::AppState;
use crate::views::JobView;

#[derive(Debug, Default, Deserialize)]
pub struct AssembleQuery {
    /// Hold the request until the assembly finishes
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Serialize)]
pub struct AssembleResponse {
    /// Output URL once assembled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out: Option<String>,
    pub job: JobView,
}

/// `POST /projects/:pid/assemble[?wait=true]`
///
/// Without `wait` the job is returned with `202`. With `wait` the response
/// carries the finished job, or `202` when the wait timeout expires first.
pub async fn assemble_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<AssembleQuery>,
) -> ApiResult<(StatusCode, Json<AssembleResponse>)> {
    let project_id = ProjectId::from(project_id);
    let handle = state.pipeline.assemble(&project_id).await?;
    info!(
        project_id = %project_id,
        job_id = %handle.job_id,
        wait = query.wait,
        "Assembly requested"
    );

    let prefix = state.media_prefix();
    if query.wait {
        match state
            .pipeline
            .wait_for_job(&handle.job_id, state.config.assemble_wait_timeout)
            .await
        {
            Ok(record) => {
                let out = match record.state {
                    JobState::Succeeded => record.output.as_ref().map(|k| k.to_url(prefix)),
                    _ => None,
                };
                return Ok((
                    StatusCode::OK,
                    Json(AssembleResponse {
                        out,
                        job: JobView::new(&record, prefix),
                    }),
                ));
            }
            Err(WorkerError::Timeout(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    let record = state.pipeline.job(&handle.job_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AssembleResponse {
            out: None,
            job: JobView::new(&record, prefix),
        }),
    ))
}
