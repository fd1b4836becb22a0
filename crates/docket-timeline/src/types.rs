//! Data model shared by the consolidation stages.

use serde::{Deserialize, Serialize};

use crate::chunking::chunk_document;

// ─────────────────────────────────────────────────────────────────────────────
// Inputs
// ─────────────────────────────────────────────────────────────────────────────

/// One source document as supplied by the caller: a title and its ordered chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub title: String,
    pub chunks: Vec<String>,
}

impl SourceDocument {
    pub fn new(title: impl Into<String>, chunks: Vec<String>) -> Self {
        Self {
            title: title.into(),
            chunks,
        }
    }

    /// Build a document from raw text, splitting it on paragraph boundaries.
    pub fn from_text(
        title: impl Into<String>,
        text: &str,
        max_chars: usize,
        overlap_chars: usize,
    ) -> Self {
        Self::new(title, chunk_document(text, max_chars, overlap_chars))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Intermediate Records
// ─────────────────────────────────────────────────────────────────────────────

/// One model response for one chunk of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFragment {
    pub document_index: usize,
    pub chunk_index: usize,
    pub raw_text: String,
}

/// The merged contribution of one document.
///
/// `merged_text` is either the joined timeline sections of the document's
/// fragments, with citations in global form, or the no-relevant sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTimeline {
    pub document_index: usize,
    pub document_title: String,
    pub merged_text: String,
}

impl DocumentTimeline {
    /// Whether this document contributed nothing.
    pub fn is_empty_contribution(&self) -> bool {
        crate::merge::is_no_relevant(&self.merged_text)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// A single dated event.
///
/// `time` is free-form ("2020-01-01", "the following week"). `event` may
/// embed a global citation token such as `[(0,1)]`; `source` carries the
/// token content (`(0,1)`) once populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChronologyEvent {
    #[serde(default)]
    pub title: String,
    pub time: String,
    pub event: String,
    #[serde(default)]
    pub source: String,
}

impl ChronologyEvent {
    pub fn new(time: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            title: String::new(),
            time: time.into(),
            event: event.into(),
            source: String::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// The ordered, capped event list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedChronology {
    pub events: Vec<ChronologyEvent>,
    pub truncated: bool,
    pub event_limit: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Outputs
// ─────────────────────────────────────────────────────────────────────────────

/// The final answer of a consolidation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedAnswer {
    pub text: String,
    pub events: ConsolidatedChronology,
    pub truncated: bool,
}

/// Terminal result of a run. `NoEventsFound` is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TimelineOutcome {
    Answer(ConsolidatedAnswer),
    NoEventsFound,
}

impl TimelineOutcome {
    pub fn answer(&self) -> Option<&ConsolidatedAnswer> {
        match self {
            TimelineOutcome::Answer(answer) => Some(answer),
            TimelineOutcome::NoEventsFound => None,
        }
    }

    pub fn is_no_events(&self) -> bool {
        matches!(self, TimelineOutcome::NoEventsFound)
    }
}

/// Pipeline state machine.
///
/// `Mapping → Merging → Extracting → (NoEvents) | Sorting → Deduping →
/// Truncating → Rendering → Done`. No state is revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Mapping,
    Merging,
    Extracting,
    Sorting,
    Deduping,
    Truncating,
    Rendering,
    Done,
    NoEvents,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Mapping => "mapping",
            Stage::Merging => "merging",
            Stage::Extracting => "extracting",
            Stage::Sorting => "sorting",
            Stage::Deduping => "deduping",
            Stage::Truncating => "truncating",
            Stage::Rendering => "rendering",
            Stage::Done => "done",
            Stage::NoEvents => "no_events",
        };
        f.write_str(name)
    }
}
