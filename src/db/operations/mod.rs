pub mod history;
pub mod lessons;

use thiserror::Error;

pub use history::{get_history, update_progress, HistoryEntry, ProgressUpdate};
pub use lessons::{
    find_lesson, find_lesson_document, get_lesson, get_lesson_document, save_lesson,
    LessonDocument, NewLesson, StoredLesson,
};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Expected absence: an unknown id or a cache miss.
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}
