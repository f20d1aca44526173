use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::lesson::{inspect_document, ContentShape};
use crate::models::{now_ms, LessonMode, LessonPlan};
use crate::services::llm_provider::{
    extract_json_from_response, ChatMessage, ChatOptions, LlmError, LlmProvider,
};
use crate::services::mock_generator::generate_mock_lesson;

pub const REMOTE_GENERATOR_VERSION: &str = "deepseek-v1";

const SYSTEM_PROMPT: &str = "You are an expert lesson planner. Reply with a single JSON object and nothing else.";

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub query: String,
    pub mode: LessonMode,
    pub document_content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonSource {
    Cache,
    Remote,
    Mock,
}

/// A lesson ready to serve. `document` is what the client receives and what
/// gets stored; the other fields are the columns it is filed under.
#[derive(Debug, Clone)]
pub struct GeneratedLesson {
    pub id: String,
    pub topic: String,
    pub mode: LessonMode,
    pub created_at: i64,
    pub document: Value,
    pub source: LessonSource,
}

impl GeneratedLesson {
    fn from_plan(plan: LessonPlan, source: LessonSource) -> Self {
        let document = serde_json::to_value(&plan).unwrap_or(Value::Null);
        Self {
            id: plan.id,
            topic: plan.topic,
            mode: plan.mode,
            created_at: plan.created_at,
            document,
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("model reply is not a lesson: {0}")]
    InvalidLesson(String),
}

/// Produces lesson documents: the remote model when one is configured, the
/// mock otherwise or whenever the remote call fails.
#[derive(Clone)]
pub struct LessonGenerator {
    provider: Option<LlmProvider>,
}

impl LessonGenerator {
    pub fn new(provider: Option<LlmProvider>) -> Self {
        Self { provider }
    }

    pub fn from_env() -> Self {
        let provider = LlmProvider::from_env();
        if provider.is_available() {
            tracing::info!(model = provider.model(), "remote lesson generation enabled");
            Self::new(Some(provider))
        } else {
            tracing::info!("no LLM API key configured, lessons will come from the mock generator");
            Self::new(None)
        }
    }

    pub fn mock_only() -> Self {
        Self::new(None)
    }

    /// Never fails: remote errors are logged and answered with the mock.
    pub async fn generate(&self, request: &GenerationRequest) -> GeneratedLesson {
        match self.generate_remote(request).await {
            Ok(lesson) => lesson,
            Err(err) => {
                tracing::warn!(error = %err, query = %request.query, "remote generation failed, falling back to mock");
                GeneratedLesson::from_plan(
                    generate_mock_lesson(&request.query, request.mode, now_ms()),
                    LessonSource::Mock,
                )
            }
        }
    }

    pub async fn generate_remote(&self, request: &GenerationRequest) -> Result<GeneratedLesson, GeneratorError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(LlmError::NotConfigured("LLM_API_KEY"))?;

        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_lesson_prompt(request)),
        ];
        let options = ChatOptions {
            temperature: 0.7,
            max_tokens: 3000,
            json_output: true,
        };

        let reply = provider.complete(&messages, &options).await?;
        normalize_lesson_reply(&reply, request, now_ms())
    }
}

fn build_lesson_prompt(request: &GenerationRequest) -> String {
    let context = request
        .document_content
        .as_deref()
        .filter(|doc| !doc.trim().is_empty())
        .map(|doc| format!("\n\nCONTEXT DOCUMENT:\n{doc}"))
        .unwrap_or_default();

    format!(
        r#"Build a structured lesson plan for the topic "{query}".
Mode: {mode}{context}

Return one JSON object shaped like:
{{
  "topic": "Topic Name",
  "chapters": [
    {{
      "id": "chapter-1",
      "title": "Chapter Title",
      "steps": [
        {{
          "id": "step-1",
          "type": "CONCEPT" | "ANALOGY" | "QUIZ" | "SUMMARY" | "FLASHCARD" | "ROLEPLAY",
          "title": "Step Title",
          "content": {{
            "visual_type": "SLIDE" | "DIAGRAM" | "ANIMATION" | "MATH_PLOT",
            "title": "Visual Title",
            "content": "Markdown, Mermaid source, or a JSON string for animations",
            "config_json": {{}}
          }},
          "quizConfig": {{}},
          "flashcard": {{ "front": "Question", "back": "Answer" }}
        }}
      ]
    }}
  ]
}}

Rules:
1. Split the topic into chapters that build on each other (basics, deeper ideas, practice).
2. Inside a chapter, move from concept to analogy to quiz.
3. SLIDE carries prose, DIAGRAM carries Mermaid, ANIMATION carries step data.
4. Mathematical topics use MATH_PLOT with LaTeX.
5. In INTERVIEW mode lead with FLASHCARD steps that pose likely interview questions."#,
        query = request.query,
        mode = request.mode,
    )
}

/// Fills the ids and bookkeeping fields the model is not trusted to emit.
/// Everything else the model sent is kept; a reply that strays from the
/// lesson model is only logged.
fn normalize_lesson_reply(
    reply: &str,
    request: &GenerationRequest,
    now_ms: i64,
) -> Result<GeneratedLesson, GeneratorError> {
    let value: Value = serde_json::from_str(extract_json_from_response(reply))
        .map_err(|e| GeneratorError::InvalidLesson(format!("not JSON: {e}")))?;
    let Value::Object(mut root) = value else {
        return Err(GeneratorError::InvalidLesson("top level is not an object".to_string()));
    };

    let Some(Value::Array(chapters)) = root.get_mut("chapters") else {
        return Err(GeneratorError::InvalidLesson("missing chapters".to_string()));
    };

    for (c, chapter) in chapters.iter_mut().enumerate() {
        let Value::Object(chapter) = chapter else {
            continue;
        };
        fill_missing_str(chapter, "id", format!("chapter-{c}"));

        let Some(Value::Array(steps)) = chapter.get_mut("steps") else {
            continue;
        };
        for (s, step) in steps.iter_mut().enumerate() {
            let Value::Object(step) = step else {
                continue;
            };
            fill_missing_str(step, "id", format!("step-{c}-{s}"));

            if let Some(Value::Object(asset)) = step.get_mut("content") {
                asset.insert("id".to_string(), Value::String(format!("asset-{c}-{s}")));
                asset.insert("node_id".to_string(), Value::String(format!("node-{c}-{s}")));
                asset.insert("status".to_string(), Value::String("READY".to_string()));
                asset.insert(
                    "generator_version".to_string(),
                    Value::String(REMOTE_GENERATOR_VERSION.to_string()),
                );
            }
        }
    }

    fill_missing_str(&mut root, "topic", request.query.clone());
    let id = format!("lesson-{now_ms}");
    let topic = root
        .get("topic")
        .and_then(Value::as_str)
        .unwrap_or(request.query.as_str())
        .to_string();
    root.insert("id".to_string(), Value::String(id.clone()));
    root.insert("mode".to_string(), Value::String(request.mode.as_str().to_string()));
    root.insert("createdAt".to_string(), Value::from(now_ms));

    let document = Value::Object(root);
    if let ContentShape::OtherJson(reason) = inspect_document(&document) {
        tracing::warn!(lesson_id = %id, %reason, "model reply strays from the lesson model, keeping it as sent");
    }

    Ok(GeneratedLesson {
        id,
        topic,
        mode: request.mode,
        created_at: now_ms,
        document,
        source: LessonSource::Remote,
    })
}

fn fill_missing_str(object: &mut Map<String, Value>, key: &str, fallback: String) {
    let present = object
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|v| !v.trim().is_empty());
    if !present {
        object.insert(key.to_string(), Value::String(fallback));
    }
}
