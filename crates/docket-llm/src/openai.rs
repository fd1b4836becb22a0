//! OpenAI-compatible chat completions backend.
//!
//! Every provider Docket talks to (OpenAI, Groq, Ollama, self-hosted servers)
//! exposes `POST {base}/chat/completions`, so one client covers all of them;
//! the presets only differ in base URL, key and timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::{Deserialize, Serialize};

use crate::backend::{LlmBackend, with_retry};
use crate::error::{LlmError, RateLimitInfo, Result};
use crate::types::{CompletionRequest, CompletionResponse, ContentBlock, Role, StopReason, Usage};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Hosted providers answer within this; local inference gets twice as long.
const HOSTED_TIMEOUT: Duration = Duration::from_secs(300);

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Connection settings for one OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Sent as a bearer token when present.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Overrides the model named in each request.
    pub model: Option<String>,
    pub timeout: Duration,
    /// Retries for network errors and rate limits.
    pub max_retries: u32,
    /// First retry delay; doubled on every further attempt.
    pub retry_backoff: Duration,
    /// Used in logs and by [`LlmBackend::name`].
    pub name: String,
}

impl OpenAiConfig {
    fn preset(name: &str, base_url: &str, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            api_key,
            base_url: base_url.to_string(),
            model: None,
            timeout,
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            name: name.to_string(),
        }
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::preset("openai", OPENAI_BASE_URL, Some(api_key.into()), HOSTED_TIMEOUT)
    }

    pub fn groq(api_key: impl Into<String>) -> Self {
        Self::preset("groq", GROQ_BASE_URL, Some(api_key.into()), HOSTED_TIMEOUT)
    }

    /// A local Ollama server; no key.
    pub fn ollama() -> Self {
        Self::preset("ollama", OLLAMA_BASE_URL, None, HOSTED_TIMEOUT * 2)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP client for one OpenAI-compatible endpoint.
pub struct OpenAiBackend {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.config.api_key {
            Some(ref key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Borrow `request` into the wire shape. A configured model wins over
    /// the one named in the request.
    fn wire_request<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        let messages = request
            .messages
            .iter()
            .map(|m| ChatMessage {
                role: match m.role {
                    Role::User => "user",
                },
                content: &m.content,
            })
            .collect();

        ChatRequest {
            model: self.config.model.as_deref().unwrap_or(&request.model),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stop: (!request.stop_sequences.is_empty()).then_some(&request.stop_sequences[..]),
        }
    }

    async fn send(&self, body: &ChatRequest<'_>) -> Result<CompletionResponse> {
        let response = self
            .authorize(self.client.post(self.endpoint("chat/completions")))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let parsed: ChatResponse = serde_json::from_str(&response.text().await?)?;
        Ok(parsed.into())
    }
}

/// Map a non-2xx response to the error taxonomy.
async fn error_from_response(response: Response) -> LlmError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| format!("HTTP {}: {}", status, body.trim()));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => {
            LlmError::RateLimit(RateLimitInfo::parse_openai(&message, retry_after.as_deref()))
        }
        s if s.is_server_error() => LlmError::Backend(format!("{} ({})", message, s)),
        _ => LlmError::Backend(message),
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let wire = self.wire_request(&request);
        let body = &wire;
        tracing::debug!(
            backend = %self.config.name,
            model = body.model,
            max_tokens = body.max_tokens,
            "Sending completion request"
        );

        with_retry(
            self.config.max_retries,
            self.config.retry_backoff,
            &self.config.name,
            || self.send(body),
        )
        .await
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    /// Hit `GET {base}/models`, which every compatible server implements
    /// and which costs no tokens.
    async fn health_check(&self) -> Result<()> {
        let response = self
            .authorize(self.client.get(self.endpoint("models")))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

/// Create a shared OpenAI-compatible backend.
pub fn create_shared_backend(config: OpenAiConfig) -> Result<Arc<dyn LlmBackend>> {
    Ok(Arc::new(OpenAiBackend::new(config)?))
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    id: String,
    model: String,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl From<ChatResponse> for CompletionResponse {
    fn from(resp: ChatResponse) -> Self {
        let first = resp.choices.into_iter().next();
        let stop_reason = match first.as_ref().and_then(|c| c.finish_reason.as_deref()) {
            Some("length") => StopReason::MaxTokens,
            Some("stop_sequence") => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        };
        let content = first
            .and_then(|c| c.message.content)
            .filter(|text| !text.is_empty())
            .map(|text| vec![ContentBlock::Text { text }])
            .unwrap_or_default();
        let usage = resp
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        CompletionResponse::new(resp.id, resp.model, content, stop_reason, usage)
    }
}
