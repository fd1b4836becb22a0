//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [llm]        # text-generation backend
//! [timeline]   # consolidation tuning
//! [logging]    # log file location
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// Maps to the full TOML config file. All sections are optional so that
/// partial configs (e.g., project-local overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocketConfig {
    /// Backend configuration (the `[llm]` section).
    pub llm: Option<LlmConfig>,

    /// Consolidation settings.
    pub timeline: Option<TimelineSection>,

    /// Log output settings.
    pub logging: Option<LoggingConfig>,
}

impl DocketConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole; fields are not merged individually.
    pub fn merge(&mut self, other: DocketConfig) {
        if other.llm.is_some() {
            self.llm = other.llm;
        }

        if other.timeline.is_some() {
            self.timeline = other.timeline;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// The `[timeline]` section, or its defaults when absent.
    pub fn timeline_or_default(&self) -> TimelineSection {
        self.timeline.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the text-generation backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend provider.
    pub backend: Option<Backend>,
    /// Model identifier.
    pub model: Option<String>,
    /// Custom API base URL (for proxies, custom endpoints).
    pub base_url: Option<String>,
    /// API key (prefer an env var; warns if set here).
    pub api_key: Option<String>,
    /// Maximum retry attempts for failed requests.
    pub retry_max: Option<u32>,
    /// Backoff delay between retries in milliseconds.
    pub retry_backoff_ms: Option<u64>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl LlmConfig {
    /// Returns true if an API key is stored directly in the config file.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Get the environment variable name for this backend's API key.
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.env_var())
    }

    /// Get the model, returning an error if not configured.
    pub fn require_model(&self) -> crate::Result<&str> {
        self.model
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField {
                field: "model".to_string(),
                context: "[llm]".to_string(),
            })
    }
}

/// Supported backend providers (all speak the OpenAI chat completions API).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Openai,
    Groq,
    Ollama,
    Custom,
}

impl Backend {
    /// Environment variable name for this backend's API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            Backend::Openai => "OPENAI_API_KEY",
            Backend::Groq => "GROQ_API_KEY",
            Backend::Ollama => "OLLAMA_API_KEY",
            Backend::Custom => "LLM_API_KEY",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::Openai => "OpenAI",
            Backend::Groq => "Groq",
            Backend::Ollama => "Ollama",
            Backend::Custom => "Custom",
        }
    }

    /// Whether requests to this backend need an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Backend::Ollama)
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Timeline Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// How the final answer presents citations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderModeSetting {
    /// Keep citation tokens inline in event text.
    #[default]
    Inline,
    /// Remove tokens from event text; expose them only via `source`.
    Stripped,
}

/// Consolidation settings.
///
/// ```toml
/// [timeline]
/// event_limit = 100
/// similarity_threshold = 0.75
/// map_workers = 12
/// render_mode = "inline"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineSection {
    /// Maximum number of events in the final answer.
    pub event_limit: usize,
    /// Minimum similarity ratio for two same-time events to count as duplicates.
    pub similarity_threshold: f64,
    /// Fixed number of concurrent map calls.
    pub map_workers: usize,
    /// Citation presentation.
    pub render_mode: RenderModeSetting,
    /// Whether the rendered answer starts with the header line.
    pub include_header: bool,
    /// Maximum characters per chunk when a document is supplied as raw text.
    pub max_chunk_chars: usize,
    /// Characters of trailing context carried into the next chunk.
    pub chunk_overlap_chars: usize,
    /// Output token budget for each map call.
    pub map_max_tokens: u32,
    /// Output token budget for extraction and sort calls.
    pub extraction_max_tokens: u32,
    /// Sampling temperature for every call.
    pub temperature: f32,
}

impl Default for TimelineSection {
    fn default() -> Self {
        Self {
            event_limit: 100,
            similarity_threshold: 0.75,
            map_workers: 12,
            render_mode: RenderModeSetting::Inline,
            include_header: true,
            max_chunk_chars: 12_000,
            chunk_overlap_chars: 400,
            map_max_tokens: 4096,
            extraction_max_tokens: 8192,
            temperature: 0.0,
        }
    }
}

impl TimelineSection {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.event_limit == 0 {
            return Err(invalid("event_limit", "must be at least 1"));
        }
        if self.map_workers == 0 {
            return Err(invalid("map_workers", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(invalid("similarity_threshold", "must be within [0, 1]"));
        }
        if self.max_chunk_chars == 0 {
            return Err(invalid("max_chunk_chars", "must be at least 1"));
        }
        if self.chunk_overlap_chars >= self.max_chunk_chars {
            return Err(invalid(
                "chunk_overlap_chars",
                "must be smaller than max_chunk_chars",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for the rolling JSON log file (defaults to `<config dir>/logs`).
    pub directory: Option<PathBuf>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
