//! The lesson document produced by the generators and stored verbatim in
//! `lessons.content`.
//!
//! Top-level and step keys are camelCase (`createdAt`, `quizConfig`) while
//! visual assets use snake_case (`visual_type`, `node_id`), matching what the
//! browser client writes. The store never requires content to match this
//! model; [`inspect_content`] only reports how well it does.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::LessonMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlan {
    pub id: String,
    pub topic: String,
    pub mode: LessonMode,
    #[serde(default)]
    pub chapters: Vec<LessonChapter>,
    /// Flat step list written by early clients before chapters existed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<LessonStep>,
    #[serde(default)]
    pub created_at: i64,
}

impl LessonPlan {
    pub fn step_count(&self) -> usize {
        self.steps.len() + self.chapters.iter().map(|c| c.steps.len()).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonChapter {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub steps: Vec<LessonStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonStep {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    pub title: String,
    pub content: VisualAsset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_config: Option<InteractiveTemplateData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flashcard: Option<Flashcard>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepType {
    Concept,
    Analogy,
    Quiz,
    Summary,
    Flashcard,
    Roleplay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualAsset {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub node_id: String,
    pub visual_type: VisualType,
    pub title: String,
    /// Markdown for slides, Mermaid source for diagrams, a JSON string for
    /// animations.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_json: Option<Value>,
    #[serde(default)]
    pub generator_version: String,
    #[serde(default = "VisualStatus::ready")]
    pub status: VisualStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisualType {
    Slide,
    Diagram,
    Animation,
    MathPlot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisualStatus {
    Generating,
    Ready,
    Error,
    Deprecated,
}

impl VisualStatus {
    fn ready() -> Self {
        Self::Ready
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

/// Quiz widget configuration. Mixes the templated form (`template_id` +
/// `data`) with the older flat fields some stored lessons still carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractiveTemplateData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, rename = "correctOrder", skip_serializing_if = "Option::is_none")]
    pub correct_order: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<bool>,
}

impl InteractiveTemplateData {
    pub fn drag_sort(items: &[&str], hint: Option<&str>) -> Self {
        Self {
            template_id: Some(TemplateId::DragSort.as_str().to_string()),
            data: Some(serde_json::json!({
                "items": items,
                "correct_order": items,
            })),
            hint: hint.map(str::to_string),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateId {
    DragSort,
    Connection,
    FillBlank,
    Hotspot,
    MultipleChoice,
    TrueFalse,
}

impl TemplateId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DragSort => "T1_DragSort",
            Self::Connection => "T2_Connection",
            Self::FillBlank => "T3_FillBlank",
            Self::Hotspot => "T4_Hotspot",
            Self::MultipleChoice => "T4_MultipleChoice",
            Self::TrueFalse => "T5_TrueFalse",
        }
    }
}

/// How stored content relates to the lesson model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentShape {
    Lesson { steps: usize },
    /// Valid JSON that is not a lesson document.
    OtherJson(String),
    Malformed(String),
}

pub fn inspect_content(content: &str) -> ContentShape {
    match serde_json::from_str::<Value>(content) {
        Ok(value) => inspect_document(&value),
        Err(err) => ContentShape::Malformed(err.to_string()),
    }
}

/// Checks an already parsed document against [`LessonPlan`].
pub fn inspect_document(document: &Value) -> ContentShape {
    match LessonPlan::deserialize(document) {
        Ok(plan) => ContentShape::Lesson {
            steps: plan.step_count(),
        },
        Err(err) => ContentShape::OtherJson(err.to_string()),
    }
}
