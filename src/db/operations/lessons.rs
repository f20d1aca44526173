use serde::Serialize;
use serde_json::Value;

use crate::db::operations::StoreError;
use crate::db::{Database, DbPool};
use crate::models::lesson::{inspect_content, ContentShape};
use crate::models::{now_ms, HistoryStatus, LessonMode};

#[derive(Debug, Clone)]
pub struct NewLesson<'a> {
    pub id: &'a str,
    pub user_id: i64,
    pub topic: &'a str,
    pub mode: LessonMode,
    pub content: &'a str,
    pub created_at: i64,
}

/// A `lessons` row as stored. Serialized as-is when its content is not JSON.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct StoredLesson {
    pub id: String,
    pub user_id: i64,
    pub topic: String,
    pub mode: String,
    pub content: String,
    pub created_at: i64,
}

impl StoredLesson {
    pub fn parsed_content(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.content)
    }
}

/// What a lookup by id hands back: the parsed document, or the raw row when
/// the stored content is not JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LessonDocument {
    Parsed(Value),
    Raw(StoredLesson),
}

const POSTGRES_UPSERT_LESSON: &str = r#"
    INSERT INTO "lessons" ("id", "user_id", "topic", "mode", "content", "created_at")
    VALUES ($1, $2, $3, $4, $5, $6)
    ON CONFLICT ("id") DO UPDATE
    SET "content" = EXCLUDED."content", "created_at" = EXCLUDED."created_at"
"#;

const SQLITE_UPSERT_LESSON: &str = r#"
    INSERT INTO "lessons" ("id", "user_id", "topic", "mode", "content", "created_at")
    VALUES (?, ?, ?, ?, ?, ?)
    ON CONFLICT ("id") DO UPDATE
    SET "content" = excluded."content", "created_at" = excluded."created_at"
"#;

const POSTGRES_TOUCH_HISTORY: &str = r#"
    INSERT INTO "learning_history" ("user_id", "lesson_id", "last_accessed", "status")
    VALUES ($1, $2, $3, $4)
    ON CONFLICT ("user_id", "lesson_id") DO UPDATE
    SET "last_accessed" = EXCLUDED."last_accessed"
"#;

const SQLITE_TOUCH_HISTORY: &str = r#"
    INSERT INTO "learning_history" ("user_id", "lesson_id", "last_accessed", "status")
    VALUES (?, ?, ?, ?)
    ON CONFLICT ("user_id", "lesson_id") DO UPDATE
    SET "last_accessed" = excluded."last_accessed"
"#;

/// Upserts the lesson by id and records the owner's history row in one
/// transaction. Only `content` and `created_at` change on a re-save.
pub async fn save_lesson(db: &Database, lesson: &NewLesson<'_>) -> Result<(), StoreError> {
    match inspect_content(lesson.content) {
        ContentShape::Lesson { steps } => {
            tracing::debug!(lesson_id = lesson.id, steps, "saving lesson document");
        }
        ContentShape::OtherJson(reason) | ContentShape::Malformed(reason) => {
            tracing::warn!(
                lesson_id = lesson.id,
                %reason,
                "lesson content does not match the lesson schema, storing as-is"
            );
        }
    }

    let accessed_at = now_ms();
    let status = HistoryStatus::InProgress.as_str();

    match db.pool() {
        DbPool::Postgres(pool) => {
            let mut tx = pool.begin().await?;
            sqlx::query(POSTGRES_UPSERT_LESSON)
                .bind(lesson.id)
                .bind(lesson.user_id)
                .bind(lesson.topic)
                .bind(lesson.mode.as_str())
                .bind(lesson.content)
                .bind(lesson.created_at)
                .execute(&mut *tx)
                .await?;
            sqlx::query(POSTGRES_TOUCH_HISTORY)
                .bind(lesson.user_id)
                .bind(lesson.id)
                .bind(accessed_at)
                .bind(status)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
        }
        DbPool::Sqlite(pool) => {
            let mut tx = pool.begin().await?;
            sqlx::query(SQLITE_UPSERT_LESSON)
                .bind(lesson.id)
                .bind(lesson.user_id)
                .bind(lesson.topic)
                .bind(lesson.mode.as_str())
                .bind(lesson.content)
                .bind(lesson.created_at)
                .execute(&mut *tx)
                .await?;
            sqlx::query(SQLITE_TOUCH_HISTORY)
                .bind(lesson.user_id)
                .bind(lesson.id)
                .bind(accessed_at)
                .bind(status)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
        }
    }

    Ok(())
}

pub async fn get_lesson(db: &Database, id: &str) -> Result<StoredLesson, StoreError> {
    let row = match db.pool() {
        DbPool::Postgres(pool) => {
            sqlx::query_as::<_, StoredLesson>(
                r#"SELECT "id", "user_id", "topic", "mode", "content", "created_at" FROM "lessons" WHERE "id" = $1"#,
            )
            .bind(id)
            .fetch_optional(pool)
            .await?
        }
        DbPool::Sqlite(pool) => {
            sqlx::query_as::<_, StoredLesson>(
                r#"SELECT "id", "user_id", "topic", "mode", "content", "created_at" FROM "lessons" WHERE "id" = ?"#,
            )
            .bind(id)
            .fetch_optional(pool)
            .await?
        }
    };

    row.ok_or(StoreError::NotFound)
}

pub async fn get_lesson_document(db: &Database, id: &str) -> Result<LessonDocument, StoreError> {
    let lesson = get_lesson(db, id).await?;
    match lesson.parsed_content() {
        Ok(value) => Ok(LessonDocument::Parsed(value)),
        Err(err) => {
            tracing::warn!(lesson_id = id, error = %err, "stored lesson content is not JSON, returning raw row");
            Ok(LessonDocument::Raw(lesson))
        }
    }
}

/// Most recent lesson of `user_id` in `mode` whose topic contains `topic`.
/// Wildcards in the query are matched literally.
pub async fn find_lesson(
    db: &Database,
    topic: &str,
    mode: LessonMode,
    user_id: i64,
) -> Result<StoredLesson, StoreError> {
    let pattern = format!("%{}%", escape_like(topic));

    let row = match db.pool() {
        DbPool::Postgres(pool) => {
            sqlx::query_as::<_, StoredLesson>(
                r#"
                SELECT "id", "user_id", "topic", "mode", "content", "created_at"
                FROM "lessons"
                WHERE "user_id" = $1 AND "mode" = $2 AND "topic" LIKE $3 ESCAPE '\'
                ORDER BY "created_at" DESC
                LIMIT 1
                "#,
            )
            .bind(user_id)
            .bind(mode.as_str())
            .bind(&pattern)
            .fetch_optional(pool)
            .await?
        }
        DbPool::Sqlite(pool) => {
            sqlx::query_as::<_, StoredLesson>(
                r#"
                SELECT "id", "user_id", "topic", "mode", "content", "created_at"
                FROM "lessons"
                WHERE "user_id" = ? AND "mode" = ? AND "topic" LIKE ? ESCAPE '\'
                ORDER BY "created_at" DESC
                LIMIT 1
                "#,
            )
            .bind(user_id)
            .bind(mode.as_str())
            .bind(&pattern)
            .fetch_optional(pool)
            .await?
        }
    };

    row.ok_or(StoreError::NotFound)
}

/// Cache lookup: a hit whose content is not JSON counts as a miss.
pub async fn find_lesson_document(
    db: &Database,
    topic: &str,
    mode: LessonMode,
    user_id: i64,
) -> Result<Value, StoreError> {
    let lesson = find_lesson(db, topic, mode, user_id).await?;
    lesson.parsed_content().map_err(|err| {
        tracing::warn!(lesson_id = %lesson.id, error = %err, "cached lesson content is not JSON");
        StoreError::NotFound
    })
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
