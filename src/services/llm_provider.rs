use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

const DEFAULT_MODEL: &str = "deepseek-chat";
const DEFAULT_API_ENDPOINT: &str = "https://api.deepseek.com/v1";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const MAX_RETRIES: usize = 3;
const BASE_BACKOFF_MS: u64 = 200;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let api_key = env_string("LLM_API_KEY").or_else(|| env_string("DEEPSEEK_API_KEY"));
        let model = env_string("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_endpoint = normalize_endpoint(
            env_string("LLM_API_ENDPOINT")
                .or_else(|| env_string("LLM_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
        );
        let timeout = Duration::from_millis(env_u64("LLM_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT_MS));

        Self {
            api_key,
            model,
            api_endpoint,
            timeout,
            max_retries: MAX_RETRIES,
        }
    }

    /// A config pointing at an explicit endpoint, without reading the environment.
    pub fn with_endpoint(api_key: Option<String>, api_endpoint: impl Into<String>) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            api_endpoint: normalize_endpoint(api_endpoint.into()),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_retries: MAX_RETRIES,
        }
    }

    /// The key is usable unless it is missing, blank or a template placeholder.
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty() && !v.contains("placeholder"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub json_output: bool,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub model: Option<String>,
    pub choices: Vec<ChatChoice>,
}

impl ChatResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response")]
    EmptyChoices,
}

/// OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct LlmProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

impl LlmProvider {
    pub fn new(config: LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    pub fn from_env() -> Self {
        Self::new(LlmConfig::from_env())
    }

    pub fn is_available(&self) -> bool {
        self.config.usable_api_key().is_some()
            && !self.config.model.trim().is_empty()
            && !self.config.api_endpoint.trim().is_empty()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub async fn complete(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<String, LlmError> {
        let api_key = self
            .config
            .usable_api_key()
            .ok_or(LlmError::NotConfigured("LLM_API_KEY"))?;

        let url = format!("{}/chat/completions", self.config.api_endpoint.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream: false,
            response_format: options.json_output.then_some(ResponseFormat { kind: "json_object" }),
        };

        let response = self.post_with_retry(&url, api_key, &request).await?;
        response
            .first_content()
            .map(str::to_string)
            .ok_or(LlmError::EmptyChoices)
    }

    async fn post_with_retry(
        &self,
        url: &str,
        api_key: &str,
        request: &ChatRequest<'_>,
    ) -> Result<ChatResponse, LlmError> {
        let mut retry = 0;
        loop {
            let err = match self.client.post(url).bearer_auth(api_key).json(request).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let bytes = resp.bytes().await?;
                        return serde_json::from_slice(&bytes).map_err(|e| {
                            tracing::error!(
                                error = %e,
                                body = %String::from_utf8_lossy(&bytes),
                                "failed to parse chat completion"
                            );
                            LlmError::Json(e)
                        });
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err = LlmError::HttpStatus { status, body };
                    if !is_retryable(status) {
                        return Err(err);
                    }
                    err
                }
                Err(e) => LlmError::Request(e),
            };

            if retry >= self.config.max_retries {
                return Err(err);
            }
            let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
            warn!(retry, error = %err, "LLM request failed, retrying");
            sleep(backoff).await;
            retry += 1;
        }
    }
}

/// Pulls the JSON object out of a reply that may wrap it in a fenced block
/// or surrounding prose.
pub fn extract_json_from_response(response: &str) -> &str {
    let trimmed = response.trim();
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse().ok()
}

fn normalize_endpoint(endpoint: String) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.contains("/v1/") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}
