//! Server-sent pipeline events.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tracing::{debug, warn};

use clipforge_models::{PipelineEvent, ProjectId};

use crate::error::ApiResult;
use crate::metrics;
use crate::state::AppState;
use crate::views::event_json;

/// Decrements the active stream gauge when the client goes away.
struct StreamGuard;

impl Drop for StreamGuard {
    fn drop(&mut self) {
        metrics::sse_stream_closed();
    }
}

struct EventCursor {
    receiver: Receiver<PipelineEvent>,
    project_id: ProjectId,
    prefix: String,
    _guard: StreamGuard,
}

/// `GET /projects/:pid/events`
///
/// Streams the project's render and assembly events as they happen. A
/// client that falls behind gets a `lagged` event with the number of
/// events it missed and should re-read project status.
pub async fn project_events(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let project_id = ProjectId::from(project_id);
    state.pipeline.store().ensure_project(&project_id).await?;

    metrics::sse_stream_opened();
    let cursor = EventCursor {
        receiver: state.pipeline.subscribe(),
        project_id,
        prefix: state.media_prefix().to_string(),
        _guard: StreamGuard,
    };

    let stream = stream::unfold(cursor, |mut cursor| async move {
        loop {
            match cursor.receiver.recv().await {
                Ok(event) if event.project_id == cursor.project_id => {
                    let data = event_json(&event, &cursor.prefix).to_string();
                    let sse = Event::default().event(event.kind.name()).data(data);
                    return Some((Ok(sse), cursor));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => {
                    warn!(project_id = %cursor.project_id, missed, "Event stream lagged");
                    let sse = Event::default().event("lagged").data(missed.to_string());
                    return Some((Ok(sse), cursor));
                }
                Err(RecvError::Closed) => {
                    debug!(project_id = %cursor.project_id, "Event bus closed");
                    return None;
                }
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}
