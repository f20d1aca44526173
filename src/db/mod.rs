pub mod config;
pub mod migrate;
pub mod operations;

use std::str::FromStr;
use std::time::{Duration, Instant};

use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{PgPool, SqlitePool};
use thiserror::Error;

use crate::db::config::{DbConfig, DbConfigError, DbTarget};
use crate::db::migrate::MigrationError;

/// A connected pool for whichever backend the config selected.
#[derive(Clone, Debug)]
pub enum DbPool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

/// The storage handle every request borrows. Constructed once at startup
/// and handed to the router through `AppState`.
#[derive(Clone, Debug)]
pub struct Database {
    config: DbConfig,
    pool: DbPool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingStatus {
    Connected { latency_ms: u64 },
    Timeout,
    Disconnected,
}

impl Database {
    pub async fn from_env() -> Result<Self, DbInitError> {
        let config = DbConfig::from_env()?;
        Self::connect(config).await
    }

    /// Opens the pool and brings the schema up to date.
    pub async fn connect(config: DbConfig) -> Result<Self, DbInitError> {
        let pool = match &config.target {
            DbTarget::Postgres { url } => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(config.acquire_timeout)
                    .connect(url)
                    .await?;
                DbPool::Postgres(pool)
            }
            DbTarget::Sqlite { path } => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| DbInitError::Io(e.to_string()))?;
                }
                let url = format!("sqlite:{}?mode=rwc", path.display());
                let options = SqliteConnectOptions::from_str(&url)?
                    .create_if_missing(true)
                    .foreign_keys(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .busy_timeout(Duration::from_secs(30));
                let pool = SqlitePoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(config.acquire_timeout)
                    .connect_with(options)
                    .await?;
                DbPool::Sqlite(pool)
            }
        };

        let db = Self { config, pool };
        migrate::run_migrations(&db.pool).await?;
        tracing::info!(backend = db.config.target.kind(), "database ready");

        Ok(db)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn backend(&self) -> &'static str {
        self.config.target.kind()
    }

    /// One `SELECT 1` bounded by the configured ping timeout.
    pub async fn ping(&self) -> PingStatus {
        let started = Instant::now();
        let probe = async {
            match &self.pool {
                DbPool::Postgres(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
                DbPool::Sqlite(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
            }
        };

        match tokio::time::timeout(self.config.ping_timeout, probe).await {
            Ok(Ok(())) => PingStatus::Connected {
                latency_ms: started.elapsed().as_millis() as u64,
            },
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "database ping failed");
                PingStatus::Disconnected
            }
            Err(_) => PingStatus::Timeout,
        }
    }

    pub async fn close(&self) {
        match &self.pool {
            DbPool::Postgres(pool) => pool.close().await,
            DbPool::Sqlite(pool) => pool.close().await,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error(transparent)]
    Config(#[from] DbConfigError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error("IO error: {0}")]
    Io(String),
}
