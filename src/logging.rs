use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Keeps the non-blocking file writer alive; dropping it flushes pending lines.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLogSettings {
    pub dir: String,
    pub prefix: String,
    pub rotation: LogRotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

impl LogRotation {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "never" => Some(Self::Never),
            _ => None,
        }
    }

    fn into_rotation(self) -> Rotation {
        match self {
            Self::Hourly => Rotation::HOURLY,
            Self::Daily => Rotation::DAILY,
            Self::Never => Rotation::NEVER,
        }
    }
}

impl FileLogSettings {
    /// `None` unless `ENABLE_FILE_LOGS` is set.
    pub fn from_env() -> Option<Self> {
        let enabled = std::env::var("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        if !enabled {
            return None;
        }

        Some(Self {
            dir: std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string()),
            prefix: std::env::var("LOG_FILE_PREFIX")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "cogniquest.log".to_string()),
            rotation: std::env::var("LOG_ROTATION")
                .ok()
                .as_deref()
                .and_then(LogRotation::parse)
                .unwrap_or(LogRotation::Daily),
        })
    }
}

pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    let (file_layer, guard) = match FileLogSettings::from_env() {
        Some(settings) => match std::fs::create_dir_all(&settings.dir) {
            Ok(()) => {
                let appender = RollingFileAppender::new(
                    settings.rotation.into_rotation(),
                    &settings.dir,
                    &settings.prefix,
                );
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true);
                (Some(layer), Some(FileLogGuard { _guard: guard }))
            }
            Err(err) => {
                eprintln!("failed to create log directory {}: {err}", settings.dir);
                (None, None)
            }
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}
