mod health;
mod lessons;
mod progress;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::response::json_error;
use crate::state::AppState;

/// Lesson documents can be large; the browser client posts them whole.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/lessons", lessons::router())
        .route(
            "/api/progress",
            post(progress::update_progress).fallback(fallback_handler),
        )
        .route(
            "/api/history/:userId",
            get(progress::history).fallback(fallback_handler),
        )
        .nest("/health", health::router())
        .nest("/api/health", health::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found").into_response()
}
