use sqlx::{PgPool, SqlitePool};

use crate::db::DbPool;

const POSTGRES_MIGRATIONS: &[(&str, &str)] = &[(
    "001_lessons",
    include_str!("../../sql/postgres/001_lessons.sql"),
)];

const SQLITE_MIGRATIONS: &[(&str, &str)] = &[(
    "001_lessons",
    include_str!("../../sql/sqlite/001_lessons.sql"),
)];

pub async fn run_migrations(pool: &DbPool) -> Result<(), MigrationError> {
    tracing::info!("Running database migrations...");

    let applied_count = match pool {
        DbPool::Postgres(pool) => run_postgres(pool).await?,
        DbPool::Sqlite(pool) => run_sqlite(pool).await?,
    };

    if applied_count > 0 {
        tracing::info!(count = applied_count, "Database migrations completed");
    } else {
        tracing::info!("Database is up to date, no migrations needed");
    }

    Ok(())
}

async fn run_postgres(pool: &PgPool) -> Result<usize, MigrationError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS "_migrations" (
            "id" SERIAL PRIMARY KEY,
            "name" TEXT NOT NULL UNIQUE,
            "applied_at" TIMESTAMP NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    let applied: Vec<String> =
        sqlx::query_scalar(r#"SELECT "name" FROM "_migrations" ORDER BY "id""#)
            .fetch_all(pool)
            .await?;

    let mut applied_count = 0;
    for (name, sql) in pending(POSTGRES_MIGRATIONS, &applied) {
        tracing::info!(migration = name, "Applying migration...");

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| MigrationError::failed(name, e))?;
        sqlx::query(r#"INSERT INTO "_migrations" ("name") VALUES ($1)"#)
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        applied_count += 1;
    }

    Ok(applied_count)
}

async fn run_sqlite(pool: &SqlitePool) -> Result<usize, MigrationError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS "_migrations" (
            "id" INTEGER PRIMARY KEY AUTOINCREMENT,
            "name" TEXT NOT NULL UNIQUE,
            "applied_at" TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    let applied: Vec<String> =
        sqlx::query_scalar(r#"SELECT "name" FROM "_migrations" ORDER BY "id""#)
            .fetch_all(pool)
            .await?;

    let mut applied_count = 0;
    for (name, sql) in pending(SQLITE_MIGRATIONS, &applied) {
        tracing::info!(migration = name, "Applying migration...");

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| MigrationError::failed(name, e))?;
        sqlx::query(r#"INSERT INTO "_migrations" ("name") VALUES (?)"#)
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        applied_count += 1;
    }

    Ok(applied_count)
}

fn pending<'a>(
    migrations: &'a [(&'a str, &'a str)],
    applied: &'a [String],
) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    migrations
        .iter()
        .copied()
        .filter(move |(name, _)| !applied.iter().any(|done| done == name))
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Migration '{name}' failed: {source}")]
    Migration {
        name: String,
        #[source]
        source: sqlx::Error,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl MigrationError {
    fn failed(name: &str, source: sqlx::Error) -> Self {
        Self::Migration {
            name: name.to_string(),
            source,
        }
    }
}
