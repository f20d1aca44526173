pub mod lesson;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use lesson::{
    Flashcard, InteractiveTemplateData, LessonChapter, LessonPlan, LessonStep, StepType,
    TemplateId, VisualAsset, VisualStatus, VisualType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LessonMode {
    Feynman,
    Interview,
}

impl LessonMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feynman => "FEYNMAN",
            Self::Interview => "INTERVIEW",
        }
    }
}

impl Default for LessonMode {
    fn default() -> Self {
        Self::Feynman
    }
}

impl fmt::Display for LessonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LessonMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FEYNMAN" => Ok(Self::Feynman),
            "INTERVIEW" => Ok(Self::Interview),
            other => Err(format!("unknown lesson mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryStatus {
    InProgress,
    Completed,
}

impl HistoryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for HistoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner used when a request omits the user or sends `0`.
pub const DEFAULT_USER_ID: i64 = 1;

pub fn resolve_user_id(user_id: Option<i64>) -> i64 {
    match user_id {
        Some(id) if id != 0 => id,
        _ => DEFAULT_USER_ID,
    }
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
