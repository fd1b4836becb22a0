//! Prompt-in, text-out seam over the backend.

use async_trait::async_trait;
use docket_llm::{CompletionRequest, LlmError, SharedBackend};
use tracing::warn;

/// Trait for single-prompt completion, enabling test stubs.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;
}

/// Production completer that uses a real LLM backend.
pub struct BackendCompleter {
    backend: SharedBackend,
    model: String,
    temperature: Option<f32>,
}

impl BackendCompleter {
    pub fn new(backend: SharedBackend, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait]
impl Completer for BackendCompleter {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let mut request = CompletionRequest::prompt(self.model.as_str(), prompt, max_tokens);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        let response = self.backend.complete(request).await?;
        if response.is_truncated() {
            warn!(
                backend = self.backend.name(),
                max_tokens,
                "Response cut off at max_tokens; output may be incomplete"
            );
        }
        Ok(response.text())
    }
}
