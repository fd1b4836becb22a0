//! Text-generation client abstraction for Docket.
//!
//! This crate provides a single interface over OpenAI-compatible providers
//! (OpenAI, Groq, Ollama, local servers) for plain prompt-in, text-out calls.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  LlmBackend trait                       │
//! │  - complete() -> CompletionResponse     │
//! │  - health_check()                       │
//! └─────────────────────────────────────────┘
//!                    │
//!          ┌─────────┴─────────┐
//!          ▼                   ▼
//!   ┌──────────────┐    ┌─────────────┐
//!   │ OpenAiBackend│    │ MockBackend │
//!   └──────────────┘    └─────────────┘
//! ```

pub mod backend;
pub mod error;
pub mod types;

// Provider implementations
pub mod openai;

pub use backend::{LlmBackend, MockBackend, MockResponse, SharedBackend, with_retry};
pub use error::{LlmError, RateLimitInfo, Result};
pub use types::{
    CompletionRequest, CompletionResponse, ContentBlock, Message, Role, StopReason, Usage,
};

// Re-export provider configs
pub use openai::{OpenAiBackend, OpenAiConfig, create_shared_backend};
