//! Route definitions for the UploadHub HTTP API.
//!
//! All routes are mounted under `/api`. The router receives `AppState` and
//! passes it to all handlers via Axum's `State` extractor.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the Axum router with all routes and request logging.
pub fn build_router(state: AppState) -> Router {
    let max_chunk = usize::try_from(state.config.uploads.max_chunk_size_bytes).unwrap_or(0);

    let api_routes = Router::new()
        .merge(upload_routes(max_chunk))
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Upload session lifecycle, scoped by the owning scope
fn upload_routes(max_chunk: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/scopes/{scope_id}/uploads/sessions",
            post(handlers::upload::create_session),
        )
        .route(
            "/scopes/{scope_id}/uploads/sessions/{session_id}",
            get(handlers::upload::get_session).delete(handlers::upload::cancel_session),
        )
        .route(
            "/scopes/{scope_id}/uploads/sessions/{session_id}/chunks/{index}",
            put(handlers::upload::upload_chunk).layer(DefaultBodyLimit::max(max_chunk)),
        )
        .route(
            "/scopes/{scope_id}/uploads/sessions/{session_id}/complete",
            post(handlers::upload::complete_session),
        )
}

/// Health and metrics
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/uploads/metrics", get(handlers::health::metrics))
}
