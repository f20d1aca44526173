use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::db::Database;
use crate::response::AppError;
use crate::services::lesson_generator::LessonGenerator;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    db: Option<Arc<Database>>,
    generator: Arc<LessonGenerator>,
}

impl AppState {
    pub fn new(db: Option<Database>, generator: LessonGenerator) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            db: db.map(Arc::new),
            generator: Arc::new(generator),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn db(&self) -> Option<Arc<Database>> {
        self.db.clone()
    }

    /// The database, or a 503 for handlers that cannot work without one.
    pub fn require_db(&self) -> Result<Arc<Database>, AppError> {
        self.db()
            .ok_or_else(|| AppError::service_unavailable("Database is not available"))
    }

    pub fn generator(&self) -> Arc<LessonGenerator> {
        Arc::clone(&self.generator)
    }
}
