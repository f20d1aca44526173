use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub target: DbTarget,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub ping_timeout: Duration,
}

/// Where lessons live. Postgres for server deployments, a SQLite file for
/// local use and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    Postgres { url: String },
    Sqlite { path: PathBuf },
}

impl DbConfig {
    /// Resolution order: `DATABASE_URL`, then the discrete `DB_*` variables,
    /// then a local SQLite file.
    pub fn from_env() -> Result<Self, DbConfigError> {
        let target = match env_string("DATABASE_URL") {
            Some(url) => DbTarget::parse_url(&url)?,
            None => match PostgresParts::from_env() {
                Some(parts) => DbTarget::Postgres { url: parts.to_url() },
                None => DbTarget::Sqlite {
                    path: env_string("SQLITE_PATH")
                        .map(PathBuf::from)
                        .unwrap_or_else(default_sqlite_path),
                },
            },
        };

        Ok(Self {
            target,
            max_connections: env_u32("DB_MAX_CONNECTIONS", 10).max(1),
            acquire_timeout: Duration::from_millis(env_u64("DB_ACQUIRE_TIMEOUT_MS", 5000)),
            ping_timeout: Duration::from_millis(env_u64("DB_HEALTH_CHECK_TIMEOUT_MS", 3000)),
        })
    }

    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            target: DbTarget::Sqlite { path: path.into() },
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            ping_timeout: Duration::from_secs(3),
        }
    }
}

impl DbTarget {
    pub fn parse_url(url: &str) -> Result<Self, DbConfigError> {
        let url = url.trim();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return Ok(Self::Postgres {
                url: url.to_string(),
            });
        }
        if let Some(rest) = url.strip_prefix("sqlite:") {
            let path = rest.trim_start_matches("//");
            let path = path.split('?').next().unwrap_or_default();
            if path.is_empty() || path == ":memory:" {
                return Err(DbConfigError::Invalid {
                    key: "DATABASE_URL",
                    reason: "sqlite needs a file path".to_string(),
                });
            }
            return Ok(Self::Sqlite {
                path: PathBuf::from(path),
            });
        }
        Err(DbConfigError::Invalid {
            key: "DATABASE_URL",
            reason: format!("unsupported scheme in {url}"),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Postgres { .. } => "postgres",
            Self::Sqlite { .. } => "sqlite",
        }
    }
}

#[derive(Debug, Clone)]
struct PostgresParts {
    host: String,
    port: u16,
    user: String,
    password: String,
    database: String,
}

impl PostgresParts {
    fn from_env() -> Option<Self> {
        let host = env_string("DB_HOST")?;
        Some(Self {
            host,
            port: env_u64("DB_PORT", 5432) as u16,
            user: env_string("DB_USER").unwrap_or_else(|| "postgres".to_string()),
            password: std::env::var("DB_PASSWORD").unwrap_or_default(),
            database: env_string("DB_NAME").unwrap_or_else(|| "cogniquest".to_string()),
        })
    }

    fn to_url(&self) -> String {
        if self.password.is_empty() {
            format!(
                "postgres://{}@{}:{}/{}",
                self.user, self.host, self.port, self.database
            )
        } else {
            format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.database
            )
        }
    }
}

#[derive(Debug, Error)]
pub enum DbConfigError {
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

fn default_sqlite_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cogniquest")
        .join("lessons.db")
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_postgres_url() {
        let target = DbTarget::parse_url("postgres://u:p@localhost/cq").unwrap();
        assert_eq!(target.kind(), "postgres");
    }

    #[test]
    fn test_parse_sqlite_url_strips_query() {
        let target = DbTarget::parse_url("sqlite://data/lessons.db?mode=rwc").unwrap();
        assert_eq!(
            target,
            DbTarget::Sqlite {
                path: PathBuf::from("data/lessons.db")
            }
        );
    }

    #[test]
    fn test_parse_rejects_memory_and_unknown_schemes() {
        assert!(DbTarget::parse_url("sqlite::memory:").is_err());
        assert!(DbTarget::parse_url("mysql://root@localhost/cq").is_err());
    }

    #[test]
    fn test_postgres_parts_url() {
        let parts = PostgresParts {
            host: "db".to_string(),
            port: 5433,
            user: "cq".to_string(),
            password: String::new(),
            database: "lessons".to_string(),
        };
        assert_eq!(parts.to_url(), "postgres://cq@db:5433/lessons");
    }
}
