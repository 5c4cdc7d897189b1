//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

use crate::handlers::{
    approve_clip, arrange_timeline, assemble_project, cancel_clip_render, get_job, get_project,
    get_timeline, health, list_projects, project_events, ready, reject_clip, render_clip,
    render_project,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let project_routes = Router::new()
        .route("/projects", get(list_projects))
        .route("/projects/:project_id", get(get_project))
        .route("/projects/:project_id/render", post(render_project))
        .route("/projects/:project_id/assemble", post(assemble_project))
        .route("/projects/:project_id/timeline", get(get_timeline))
        .route("/projects/:project_id/timeline/arrange", post(arrange_timeline));

    let clip_routes = Router::new()
        .route("/projects/:project_id/clips/:clip_id/approve", post(approve_clip))
        .route("/projects/:project_id/clips/:clip_id/reject", post(reject_clip))
        .route(
            "/projects/:project_id/clips/:clip_id/render",
            post(render_clip).delete(cancel_clip_render),
        );

    let job_routes = Router::new().route("/jobs/:job_id", get(get_job));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(project_routes)
        .merge(clip_routes)
        .merge(job_routes)
        .route_layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    // Long-lived streams stay out of the rate limiter and request timing
    let event_routes =
        Router::new().route("/projects/:project_id/events", get(project_events));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let media = ServeDir::new(&state.media_root);

    Router::new()
        .merge(api_routes)
        .merge(event_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .nest_service(&state.config.media_url_prefix, media)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
