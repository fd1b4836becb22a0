//! Error types for timeline consolidation.

use docket_llm::LlmError;
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, TimelineError>;

/// Hard failures of a consolidation run.
///
/// Per-call map failures, unparseable extraction output and sort failures
/// are recovered inside the pipeline and never surface here.
#[derive(Debug, Error)]
pub enum TimelineError {
    /// Backend error outside the recoverable stages.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// The caller cancelled the run.
    #[error("consolidation cancelled")]
    Cancelled,

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The run cannot start with the given input or configuration.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Why structured extraction produced no events.
///
/// The pipeline maps every variant to a `NoEventsFound` outcome.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The backend call itself failed.
    #[error("extraction call failed: {0}")]
    Llm(#[from] LlmError),

    /// No JSON array or `events` object was found in the response.
    #[error("no JSON event list in extraction output")]
    NoJson,

    /// JSON was found but did not have the expected shape.
    #[error("malformed extraction output: {0}")]
    Malformed(String),
}

/// Why semantic reordering was abandoned.
///
/// The pipeline falls back to extraction order on any of these.
#[derive(Debug, Error)]
pub enum SortError {
    /// The backend call itself failed.
    #[error("sort call failed: {0}")]
    Llm(#[from] LlmError),

    /// The response did not contain an index list.
    #[error("unparseable sort output: {0}")]
    Unparseable(String),

    /// The index list was not a permutation of the input.
    #[error("sort output is not a permutation of {expected} events")]
    InvalidPermutation { expected: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_converts() {
        let err: TimelineError = LlmError::Network("down".into()).into();
        assert!(matches!(err, TimelineError::Llm(_)));
        assert!(err.to_string().contains("down"));
    }

    #[test]
    fn test_sort_error_display() {
        let err = SortError::InvalidPermutation { expected: 3 };
        assert_eq!(err.to_string(), "sort output is not a permutation of 3 events");
    }
}
