use serde::Serialize;
use serde_json::Value;

use crate::db::operations::{self, NewLesson, StoreError};
use crate::db::Database;
use crate::services::lesson_generator::{
    GeneratedLesson, GenerationRequest, LessonGenerator, LessonSource,
};

#[derive(Debug, Clone, Serialize)]
pub struct LessonOutcome {
    pub lesson: Value,
    pub source: LessonSource,
}

/// Cache lookup, then generation, then persistence, for one user action.
/// Concurrent identical requests are not deduplicated.
pub async fn get_or_generate(
    db: Option<&Database>,
    generator: &LessonGenerator,
    request: &GenerationRequest,
    user_id: i64,
) -> LessonOutcome {
    if let Some(db) = db {
        match operations::find_lesson_document(db, &request.query, request.mode, user_id).await {
            Ok(lesson) => {
                tracing::info!(query = %request.query, mode = %request.mode, "lesson cache hit");
                return LessonOutcome {
                    lesson,
                    source: LessonSource::Cache,
                };
            }
            Err(StoreError::NotFound) => {
                tracing::debug!(query = %request.query, mode = %request.mode, "lesson cache miss");
            }
            Err(StoreError::Storage(err)) => {
                tracing::error!(error = %err, "lesson cache lookup failed, generating instead");
            }
        }
    }

    let generated = generator.generate(request).await;

    if generated.source == LessonSource::Remote {
        match db {
            Some(db) => persist(db, &generated, user_id).await,
            None => tracing::warn!("no database configured, generated lesson not saved"),
        }
    }

    LessonOutcome {
        lesson: generated.document,
        source: generated.source,
    }
}

async fn persist(db: &Database, lesson: &GeneratedLesson, user_id: i64) {
    let content = lesson.document.to_string();
    let new_lesson = NewLesson {
        id: &lesson.id,
        user_id,
        topic: &lesson.topic,
        mode: lesson.mode,
        content: &content,
        created_at: lesson.created_at,
    };

    if let Err(err) = operations::save_lesson(db, &new_lesson).await {
        tracing::error!(error = %err, lesson_id = %lesson.id, "failed to save generated lesson");
    }
}
