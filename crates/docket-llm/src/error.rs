//! Backend errors.

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

// ─────────────────────────────────────────────────────────────────────────────
// Rate Limits
// ─────────────────────────────────────────────────────────────────────────────

/// A 429 from the provider, with the wait it asked for if any.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl RateLimitInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(message: impl Into<String>, retry_after: Duration) -> Self {
        Self {
            message: message.into(),
            retry_after: Some(retry_after),
        }
    }

    /// Build from an OpenAI-style error body and its `Retry-After` header.
    ///
    /// Only the delta-seconds form of the header is understood; an HTTP date
    /// leaves `retry_after` unset.
    pub fn parse_openai(message: &str, retry_after_header: Option<&str>) -> Self {
        let retry_after = retry_after_header
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        Self {
            message: message.to_string(),
            retry_after,
        }
    }
}

impl std::fmt::Display for RateLimitInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.retry_after {
            Some(wait) => write!(f, "{} (retry after {:.2}s)", self.message, wait.as_secs_f64()),
            None => f.write_str(&self.message),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LlmError
// ─────────────────────────────────────────────────────────────────────────────

/// Failure of one completion call.
///
/// Only [`LlmError::Network`] and [`LlmError::RateLimit`] are worth retrying;
/// everything else fails the same way on a second attempt.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider answered with an error status.
    #[error("backend error: {0}")]
    Backend(String),

    #[error("network error: {0}")]
    Network(String),

    /// The backend could not be built from its settings.
    #[error("backend configuration error: {0}")]
    Config(String),

    #[error("malformed payload: {0}")]
    Serialization(String),

    /// Rejected before sending (empty prompt, zero token budget).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("rate limited: {0}")]
    RateLimit(RateLimitInfo),

    /// 401 or 403 from the provider.
    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl LlmError {
    /// The provider's requested wait, for rate limit errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit(info) => info.retry_after,
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimit(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "request timed out"
        } else if err.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };
        LlmError::Network(format!("{kind}: {err}"))
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_errors_retry() {
        assert!(LlmError::Network("timeout".into()).is_retryable());
        assert!(LlmError::RateLimit(RateLimitInfo::new("slow down")).is_retryable());
        assert!(!LlmError::Config("no key".into()).is_retryable());
        assert!(!LlmError::Auth("401".into()).is_retryable());
        assert!(!LlmError::Backend("500".into()).is_retryable());
    }

    #[test]
    fn test_rate_limit_display() {
        let info = RateLimitInfo::with_retry_after("Too many requests", Duration::from_secs(2));
        assert_eq!(info.to_string(), "Too many requests (retry after 2.00s)");
        assert_eq!(RateLimitInfo::new("Too many requests").to_string(), "Too many requests");
    }

    #[test]
    fn test_parse_openai_retry_after() {
        let info = RateLimitInfo::parse_openai("slow down", Some(" 7 "));
        assert_eq!(info.retry_after, Some(Duration::from_secs(7)));

        let info = RateLimitInfo::parse_openai("slow down", Some("Wed, 21 Oct 2015"));
        assert!(info.retry_after.is_none());

        assert!(RateLimitInfo::parse_openai("slow down", None).retry_after.is_none());
    }

    #[test]
    fn test_retry_after_accessor() {
        let err = LlmError::RateLimit(RateLimitInfo::with_retry_after(
            "limited",
            Duration::from_millis(1500),
        ));
        assert_eq!(err.retry_after(), Some(Duration::from_millis(1500)));
        assert!(LlmError::Backend("x".into()).retry_after().is_none());
    }

    #[test]
    fn test_serde_json_error_converts() {
        let err: LlmError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, LlmError::Serialization(_)));
    }
}
