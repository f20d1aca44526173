use serde::Serialize;

use crate::db::operations::StoreError;
use crate::db::{Database, DbPool};
use crate::models::{now_ms, HistoryStatus};

/// A history row joined with its lesson's topic and mode. Keys stay
/// snake_case because the dashboard reads them that way.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct HistoryEntry {
    pub id: i64,
    pub user_id: i64,
    pub lesson_id: String,
    pub last_accessed: i64,
    pub status: String,
    pub progress: i64,
    pub score: i64,
    pub topic: String,
    pub mode: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate<'a> {
    pub user_id: i64,
    pub lesson_id: &'a str,
    pub progress: i64,
    pub score: i64,
    pub status: HistoryStatus,
}

/// Returns the number of rows touched; zero means no history existed and
/// nothing was created.
pub async fn update_progress(db: &Database, update: &ProgressUpdate<'_>) -> Result<u64, StoreError> {
    let accessed_at = now_ms();

    let result = match db.pool() {
        DbPool::Postgres(pool) => sqlx::query(
            r#"
            UPDATE "learning_history"
            SET "progress" = $1, "score" = $2, "status" = $3, "last_accessed" = $4
            WHERE "user_id" = $5 AND "lesson_id" = $6
            "#,
        )
        .bind(update.progress)
        .bind(update.score)
        .bind(update.status.as_str())
        .bind(accessed_at)
        .bind(update.user_id)
        .bind(update.lesson_id)
        .execute(pool)
        .await?
        .rows_affected(),
        DbPool::Sqlite(pool) => sqlx::query(
            r#"
            UPDATE "learning_history"
            SET "progress" = ?, "score" = ?, "status" = ?, "last_accessed" = ?
            WHERE "user_id" = ? AND "lesson_id" = ?
            "#,
        )
        .bind(update.progress)
        .bind(update.score)
        .bind(update.status.as_str())
        .bind(accessed_at)
        .bind(update.user_id)
        .bind(update.lesson_id)
        .execute(pool)
        .await?
        .rows_affected(),
    };

    if result == 0 {
        tracing::debug!(
            user_id = update.user_id,
            lesson_id = update.lesson_id,
            "progress update matched no history row"
        );
    }

    Ok(result)
}

pub async fn get_history(db: &Database, user_id: i64) -> Result<Vec<HistoryEntry>, StoreError> {
    let rows = match db.pool() {
        DbPool::Postgres(pool) => {
            sqlx::query_as::<_, HistoryEntry>(
                r#"
                SELECT h."id", h."user_id", h."lesson_id", h."last_accessed", h."status",
                       h."progress", h."score", l."topic", l."mode"
                FROM "learning_history" h
                JOIN "lessons" l ON h."lesson_id" = l."id"
                WHERE h."user_id" = $1
                ORDER BY h."last_accessed" DESC, h."id" DESC
                "#,
            )
            .bind(user_id)
            .fetch_all(pool)
            .await?
        }
        DbPool::Sqlite(pool) => {
            sqlx::query_as::<_, HistoryEntry>(
                r#"
                SELECT h."id", h."user_id", h."lesson_id", h."last_accessed", h."status",
                       h."progress", h."score", l."topic", l."mode"
                FROM "learning_history" h
                JOIN "lessons" l ON h."lesson_id" = l."id"
                WHERE h."user_id" = ?
                ORDER BY h."last_accessed" DESC, h."id" DESC
                "#,
            )
            .bind(user_id)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}
