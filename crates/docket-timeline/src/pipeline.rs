//! Consolidation pipeline driver.
//!
//! Runs one query through the full state machine:
//! 1. Map every chunk concurrently (the only stage that waits on many calls)
//! 2. Merge each document's fragments and remap its citations
//! 3. Extract structured events from the combined text
//! 4. Reorder them chronologically, falling back to extraction order
//! 5. Drop near-duplicates and populate `source`
//! 6. Cap the event count
//! 7. Render the answer

use std::future::Future;
use std::sync::Arc;

use docket_llm::SharedBackend;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::completer::{BackendCompleter, Completer};
use crate::dedup::{DEFAULT_SIMILARITY_THRESHOLD, dedup, populate_sources};
use crate::error::{Result, TimelineError};
use crate::extract::{EventExtractor, LlmExtractor};
use crate::map::{DEFAULT_MAP_WORKERS, MapOrchestrator, build_map_requests};
use crate::merge::{build_corpus, build_document_timelines};
use crate::render::{AnchorResolver, AnswerRenderer, RenderMode};
use crate::report::ConsolidationReport;
use crate::sort::{EventSorter, LlmSorter, apply_permutation};
use crate::truncate::{DEFAULT_EVENT_LIMIT, truncate};
use crate::types::{ChronologyEvent, SourceDocument, Stage, TimelineOutcome};

/// Configuration for the consolidation pipeline.
#[derive(Debug, Clone)]
pub struct TimelineConfig {
    /// Maximum number of events in the answer.
    pub event_limit: usize,
    /// Minimum similarity for same-time events to count as duplicates.
    pub similarity_threshold: f64,
    /// Fixed number of concurrent map calls.
    pub map_workers: usize,
    /// Citation presentation in the rendered answer.
    pub render_mode: RenderMode,
    /// Whether the rendered answer starts with the header line.
    pub include_header: bool,
    /// Output token budget per map call.
    pub map_max_tokens: u32,
    /// Output token budget for extraction and sort calls.
    pub extraction_max_tokens: u32,
    /// Sampling temperature for backend calls.
    pub temperature: Option<f32>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            event_limit: DEFAULT_EVENT_LIMIT,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            map_workers: DEFAULT_MAP_WORKERS,
            render_mode: RenderMode::Inline,
            include_header: true,
            map_max_tokens: 4096,
            extraction_max_tokens: 8192,
            temperature: Some(0.0),
        }
    }
}

/// Drives one query from chunks to a rendered answer.
pub struct TimelinePipeline {
    map: MapOrchestrator,
    extractor: Arc<dyn EventExtractor>,
    sorter: Arc<dyn EventSorter>,
    renderer: AnswerRenderer,
    config: TimelineConfig,
}

impl TimelinePipeline {
    /// Create a pipeline from explicit collaborators.
    pub fn new(
        completer: Arc<dyn Completer>,
        extractor: Arc<dyn EventExtractor>,
        sorter: Arc<dyn EventSorter>,
        config: TimelineConfig,
    ) -> Self {
        let map = MapOrchestrator::new(completer, config.map_workers, config.map_max_tokens);
        let renderer = AnswerRenderer::new(config.render_mode, config.include_header);
        Self {
            map,
            extractor,
            sorter,
            renderer,
            config,
        }
    }

    /// Create a pipeline whose map, extraction and sort calls share one completer.
    pub fn with_completer(completer: Arc<dyn Completer>, config: TimelineConfig) -> Self {
        let extractor = Arc::new(LlmExtractor::new(
            completer.clone(),
            config.extraction_max_tokens,
        ));
        let sorter = Arc::new(LlmSorter::new(
            completer.clone(),
            config.extraction_max_tokens,
        ));
        Self::new(completer, extractor, sorter, config)
    }

    /// Create a pipeline using a real LLM backend.
    pub fn with_backend(
        backend: SharedBackend,
        model: impl Into<String>,
        config: TimelineConfig,
    ) -> Self {
        let mut completer = BackendCompleter::new(backend, model);
        if let Some(temperature) = config.temperature {
            completer = completer.with_temperature(temperature);
        }
        Self::with_completer(Arc::new(completer), config)
    }

    /// Enable inline anchor resolution in the rendered text.
    pub fn with_resolver(mut self, resolver: Arc<dyn AnchorResolver>) -> Self {
        self.renderer = self.renderer.with_resolver(resolver);
        self
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Consolidate `documents` into one timeline for `query`.
    ///
    /// Only cancellation and invalid configuration are errors; a run with
    /// nothing to report yields [`TimelineOutcome::NoEventsFound`].
    pub async fn run(
        &self,
        query: &str,
        documents: &[SourceDocument],
        cancel: &CancellationToken,
    ) -> Result<(TimelineOutcome, ConsolidationReport)> {
        self.validate()?;
        let mut report = ConsolidationReport::default();

        // ── Mapping ──────────────────────────────────────────────────────
        enter(Stage::Mapping);
        let requests = build_map_requests(query, documents);
        report.prompts_issued = requests.len();
        let fragments = self.map.run(requests, cancel).await?;
        report.fragments_received = fragments.len();
        report.fragments_dropped = report.prompts_issued - fragments.len();

        // ── Merging ──────────────────────────────────────────────────────
        enter(Stage::Merging);
        let titles: Vec<String> = documents.iter().map(|d| d.title.clone()).collect();
        let timelines = build_document_timelines(&titles, &fragments);
        report.documents_contributing = timelines
            .iter()
            .filter(|t| !t.is_empty_contribution())
            .count();

        let Some(corpus) = build_corpus(&timelines) else {
            return Ok(no_events(report, "no document contributed content"));
        };

        // ── Extracting ───────────────────────────────────────────────────
        enter(Stage::Extracting);
        let extracted = cancellable(cancel, self.extractor.extract_events(&corpus, query)).await?;
        let events = match extracted {
            Ok(events) if !events.is_empty() => events,
            Ok(_) => return Ok(no_events(report, "extraction returned no events")),
            Err(e) => {
                warn!(error = %e, "Extraction failed");
                return Ok(no_events(report, "extraction failed"));
            }
        };
        report.events_extracted = events.len();

        // ── Sorting ──────────────────────────────────────────────────────
        enter(Stage::Sorting);
        let order = cancellable(cancel, self.sorter.reorder(&events, query)).await?;
        let sorted = match order {
            Ok(order) => match apply_permutation(&events, &order) {
                Ok(sorted) => sorted,
                Err(e) => {
                    warn!(error = %e, "Sort returned an invalid order, keeping extraction order");
                    report.sort_fallback = true;
                    events
                }
            },
            Err(e) => {
                warn!(error = %e, "Sort failed, keeping extraction order");
                report.sort_fallback = true;
                events
            }
        };

        // ── Deduping ─────────────────────────────────────────────────────
        enter(Stage::Deduping);
        let before = sorted.len();
        let mut unique: Vec<ChronologyEvent> = dedup(sorted, self.config.similarity_threshold);
        report.duplicates_removed = before - unique.len();
        populate_sources(&mut unique);

        // ── Truncating ───────────────────────────────────────────────────
        enter(Stage::Truncating);
        let chronology = truncate(unique, self.config.event_limit);
        report.truncated = chronology.truncated;

        // ── Rendering ────────────────────────────────────────────────────
        enter(Stage::Rendering);
        let answer = self.renderer.render(chronology);

        enter(Stage::Done);
        info!(%report, "Consolidation complete");
        Ok((TimelineOutcome::Answer(answer), report))
    }

    fn validate(&self) -> Result<()> {
        if self.config.event_limit == 0 {
            return Err(TimelineError::InvalidInput(
                "event_limit must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.config.similarity_threshold) {
            return Err(TimelineError::InvalidInput(format!(
                "similarity_threshold {} is outside [0, 1]",
                self.config.similarity_threshold
            )));
        }
        Ok(())
    }

}

fn no_events(report: ConsolidationReport, reason: &str) -> (TimelineOutcome, ConsolidationReport) {
    enter(Stage::NoEvents);
    info!(%report, reason, "Consolidation found no events");
    (TimelineOutcome::NoEventsFound, report)
}

fn enter(stage: Stage) {
    debug!(stage = %stage, "Entering stage");
}

/// Await `fut` unless `cancel` fires first.
async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TimelineError::Cancelled),
        out = fut => Ok(out),
    }
}
