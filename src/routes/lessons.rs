use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use crate::db::operations::{self, NewLesson};
use crate::models::{now_ms, resolve_user_id, LessonMode};
use crate::response::{AppError, MessageResponse};
use crate::services::lesson_generator::GenerationRequest;
use crate::services::lesson_orchestrator;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveLessonRequest {
    id: String,
    topic: String,
    mode: LessonMode,
    /// Either the serialized document or the document itself.
    content: Value,
    created_at: Option<i64>,
    user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindLessonQuery {
    topic: Option<String>,
    mode: Option<String>,
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateLessonRequest {
    query: String,
    mode: Option<LessonMode>,
    document_content: Option<String>,
    user_id: Option<i64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(save_lesson))
        .route("/find", get(find_lesson))
        .route("/generate", post(generate_lesson))
        .route("/:id", get(get_lesson))
}

async fn save_lesson(
    State(state): State<AppState>,
    Json(payload): Json<SaveLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.require_db()?;

    if payload.id.trim().is_empty() {
        return Err(AppError::bad_request("Lesson id is required"));
    }

    let content = match payload.content {
        Value::String(text) => text,
        other => other.to_string(),
    };

    let lesson = NewLesson {
        id: &payload.id,
        user_id: resolve_user_id(payload.user_id),
        topic: &payload.topic,
        mode: payload.mode,
        content: &content,
        created_at: payload.created_at.unwrap_or_else(now_ms),
    };

    operations::save_lesson(&db, &lesson)
        .await
        .map_err(|err| AppError::from_store(err, "Failed to save lesson", "Lesson not found"))?;

    Ok(Json(MessageResponse {
        message: "Lesson saved successfully",
    }))
}

async fn get_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.require_db()?;

    let document = operations::get_lesson_document(&db, &id)
        .await
        .map_err(|err| AppError::from_store(err, "Failed to fetch lesson", "Lesson not found"))?;

    Ok(Json(document))
}

async fn find_lesson(
    State(state): State<AppState>,
    Query(query): Query<FindLessonQuery>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.require_db()?;

    // No topic, or a mode no lesson can have, is a miss.
    let Some(topic) = query.topic else {
        return Err(AppError::not_found("Lesson not found"));
    };
    let Some(mode) = query.mode.as_deref().and_then(|m| m.parse::<LessonMode>().ok()) else {
        return Err(AppError::not_found("Lesson not found"));
    };
    let user_id = resolve_user_id(query.user_id.as_deref().and_then(|v| v.trim().parse().ok()));

    let document = operations::find_lesson_document(&db, &topic, mode, user_id)
        .await
        .map_err(|err| AppError::from_store(err, "Database error", "Lesson not found"))?;

    Ok(Json(document))
}

async fn generate_lesson(
    State(state): State<AppState>,
    Json(payload): Json<GenerateLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    let query = payload.query.trim();
    if query.is_empty() {
        return Err(AppError::bad_request("query is required"));
    }

    let request = GenerationRequest {
        query: query.to_string(),
        mode: payload.mode.unwrap_or_default(),
        document_content: payload.document_content,
    };

    let db = state.db();
    let generator = state.generator();
    let outcome = lesson_orchestrator::get_or_generate(
        db.as_deref(),
        &generator,
        &request,
        resolve_user_id(payload.user_id),
    )
    .await;

    Ok(Json(outcome))
}
