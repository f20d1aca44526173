use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::db::operations::{self, ProgressUpdate};
use crate::models::{resolve_user_id, HistoryStatus};
use crate::response::{AppError, MessageResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateProgressRequest {
    user_id: Option<i64>,
    lesson_id: String,
    progress: i64,
    score: i64,
    status: HistoryStatus,
}

/// Updates an existing history row. A lesson the user never saved is left
/// alone and still answered with success.
pub(super) async fn update_progress(
    State(state): State<AppState>,
    Json(payload): Json<UpdateProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.require_db()?;

    let update = ProgressUpdate {
        user_id: resolve_user_id(payload.user_id),
        lesson_id: &payload.lesson_id,
        progress: payload.progress,
        score: payload.score,
        status: payload.status,
    };

    operations::update_progress(&db, &update)
        .await
        .map_err(|err| AppError::from_store(err, "Failed to update progress", "History not found"))?;

    Ok(Json(MessageResponse {
        message: "Progress updated",
    }))
}

pub(super) async fn history(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.require_db()?;

    let entries = operations::get_history(&db, user_id)
        .await
        .map_err(|err| AppError::from_store(err, "Failed to fetch history", "History not found"))?;

    Ok(Json(entries))
}
