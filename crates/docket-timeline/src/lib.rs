//! Timeline consolidation for Docket.
//!
//! Answers "what happened, and when" across a set of documents: every chunk
//! is summarized concurrently, per-document results are merged with their
//! citations made globally unique, and the combined text is reduced to one
//! ordered, deduplicated, capped chronology.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────┐   ┌──────────┐
//! │ MapOrchestr. │──▶│ merge +      │──▶│ Extractor │──▶│ Sorter   │
//! │ (N workers)  │   │ remap [^k]   │   │ (JSON)    │   │ (order)  │
//! └──────────────┘   └──────────────┘   └───────────┘   └──────────┘
//!                                                             │
//!        ┌──────────────┐   ┌────────────┐   ┌─────────┐      │
//!        │ AnswerRender │◀──│ truncate   │◀──│ dedup   │◀─────┘
//!        └──────────────┘   └────────────┘   └─────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use docket_llm::{OpenAiConfig, create_shared_backend};
//! use docket_timeline::{SourceDocument, TimelineConfig, TimelinePipeline};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = create_shared_backend(OpenAiConfig::openai("sk-..."))?;
//! let pipeline = TimelinePipeline::with_backend(backend, "gpt-4o-mini", TimelineConfig::default());
//!
//! let documents = vec![SourceDocument::new("Lease", vec!["On 1 May the lease was signed.".into()])];
//! let (outcome, report) = pipeline
//!     .run("When was the lease signed?", &documents, &CancellationToken::new())
//!     .await?;
//! println!("{report}");
//! if let Some(answer) = outcome.answer() {
//!     println!("{}", answer.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod chunking;
pub mod citation;
pub mod completer;
pub mod dedup;
pub mod error;
pub mod extract;
mod json;
pub mod map;
pub mod merge;
pub mod pipeline;
pub mod prompt;
pub mod render;
pub mod report;
pub mod similarity;
pub mod sort;
pub mod truncate;
pub mod types;

pub use chunking::chunk_document;
pub use citation::{
    GlobalCitation, find_global_citation, remap_citations, replace_global_citations,
    strip_citations,
};
pub use completer::{BackendCompleter, Completer};
pub use dedup::{DEFAULT_SIMILARITY_THRESHOLD, dedup, is_duplicate, populate_sources};
pub use error::{ExtractionError, Result, SortError, TimelineError};
pub use extract::{EventExtractor, ExtractionPrompt, LlmExtractor, parse_events};
pub use map::{DEFAULT_MAP_WORKERS, MapOrchestrator, MapRequest, build_map_requests};
pub use merge::{
    NO_RELEVANT_MESSAGE, NO_RELEVANT_SENTINEL, build_corpus, build_document_timelines,
    merge_fragments,
};
pub use pipeline::{TimelineConfig, TimelinePipeline};
pub use prompt::MapPrompt;
pub use render::{AnchorResolver, AnswerRenderer, HEADER, RenderMode, truncation_notice};
pub use report::ConsolidationReport;
pub use similarity::ratio;
pub use sort::{EventSorter, LlmSorter, SortPrompt, apply_permutation, parse_order};
pub use truncate::{DEFAULT_EVENT_LIMIT, truncate};
pub use types::{
    ChronologyEvent, ChunkFragment, ConsolidatedAnswer, ConsolidatedChronology, DocumentTimeline,
    SourceDocument, Stage, TimelineOutcome,
};
