//! Concurrent fan-out of per-chunk map calls.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::completer::Completer;
use crate::error::{Result, TimelineError};
use crate::prompt::MapPrompt;
use crate::types::{ChunkFragment, SourceDocument};

/// Default size of the map worker pool.
pub const DEFAULT_MAP_WORKERS: usize = 12;

/// One prompt for one chunk of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRequest {
    pub document_index: usize,
    pub chunk_index: usize,
    pub prompt: String,
}

/// Build one request per (document, chunk), document-major.
pub fn build_map_requests(query: &str, documents: &[SourceDocument]) -> Vec<MapRequest> {
    let titles: Vec<String> = documents.iter().map(|d| d.title.clone()).collect();
    documents
        .iter()
        .enumerate()
        .flat_map(|(document_index, document)| {
            let titles = &titles;
            document
                .chunks
                .iter()
                .enumerate()
                .map(move |(chunk_index, chunk)| MapRequest {
                    document_index,
                    chunk_index,
                    prompt: MapPrompt::build(query, titles, &document.title, chunk, chunk_index),
                })
        })
        .collect()
}

/// Runs map requests through a fixed-size pool.
///
/// At most `workers` calls are in flight regardless of how many requests
/// are queued. Failed or empty calls are dropped. Surviving fragments come
/// back in submission order, whatever order the calls finish in.
pub struct MapOrchestrator {
    completer: Arc<dyn Completer>,
    workers: usize,
    max_tokens: u32,
}

impl MapOrchestrator {
    pub fn new(completer: Arc<dyn Completer>, workers: usize, max_tokens: u32) -> Self {
        Self {
            completer,
            workers,
            max_tokens,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Issue every request and wait for all of them (the barrier).
    ///
    /// Cancelling `cancel` abandons in-flight calls and discards partial
    /// results.
    pub async fn run(
        &self,
        requests: Vec<MapRequest>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ChunkFragment>> {
        if self.workers == 0 {
            return Err(TimelineError::InvalidInput(
                "map worker pool size must be at least 1".to_string(),
            ));
        }

        let total = requests.len();
        let mut slots: Vec<Option<ChunkFragment>> = (0..total).map(|_| None).collect();
        let completer = &self.completer;
        let max_tokens = self.max_tokens;

        let mut calls = stream::iter(requests.into_iter().enumerate())
            .map(|(slot, request)| async move {
                let outcome = completer.complete(&request.prompt, max_tokens).await;
                (slot, request, outcome)
            })
            .buffer_unordered(self.workers);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(pending = total, "Map stage cancelled");
                    return Err(TimelineError::Cancelled);
                }
                next = calls.next() => match next {
                    Some((slot, request, Ok(text))) if !text.trim().is_empty() => {
                        slots[slot] = Some(ChunkFragment {
                            document_index: request.document_index,
                            chunk_index: request.chunk_index,
                            raw_text: text,
                        });
                    }
                    Some((_, request, Ok(_))) => {
                        warn!(
                            document_index = request.document_index,
                            chunk_index = request.chunk_index,
                            "Map call returned empty text, dropping"
                        );
                    }
                    Some((_, request, Err(e))) => {
                        warn!(
                            document_index = request.document_index,
                            chunk_index = request.chunk_index,
                            error = %e,
                            "Map call failed, dropping"
                        );
                    }
                    None => break,
                },
            }
        }

        let fragments: Vec<ChunkFragment> = slots.into_iter().flatten().collect();
        debug!(
            prompts = total,
            fragments = fragments.len(),
            workers = self.workers,
            "Map stage complete"
        );
        Ok(fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docket_llm::LlmError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Echoes the prompt back after a delay encoded in it (`delay=NN`).
    struct EchoCompleter {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl EchoCompleter {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Completer for EchoCompleter {
        async fn complete(&self, prompt: &str, _max_tokens: u32) -> std::result::Result<String, LlmError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = prompt
                .split("delay=")
                .nth(1)
                .and_then(|rest| rest.split_whitespace().next())
                .and_then(|ms| ms.parse::<u64>().ok())
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if prompt.contains("fail") {
                return Err(LlmError::Backend("boom".into()));
            }
            if prompt.contains("empty") {
                return Ok("   ".into());
            }
            Ok(prompt.to_string())
        }
    }

    fn request(document_index: usize, chunk_index: usize, prompt: &str) -> MapRequest {
        MapRequest {
            document_index,
            chunk_index,
            prompt: prompt.to_string(),
        }
    }

    #[tokio::test]
    async fn test_preserves_submission_order_under_delays() {
        let orchestrator = MapOrchestrator::new(Arc::new(EchoCompleter::new()), 4, 64);
        let requests = vec![
            request(0, 0, "d0c0 delay=80"),
            request(0, 1, "d0c1 delay=5"),
            request(1, 0, "d1c0 delay=40"),
            request(1, 1, "d1c1 delay=1"),
        ];

        let fragments = orchestrator
            .run(requests, &CancellationToken::new())
            .await
            .unwrap();

        let order: Vec<(usize, usize)> = fragments
            .iter()
            .map(|f| (f.document_index, f.chunk_index))
            .collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert!(fragments[0].raw_text.starts_with("d0c0"));
    }

    #[tokio::test]
    async fn test_drops_failed_and_empty_calls() {
        let orchestrator = MapOrchestrator::new(Arc::new(EchoCompleter::new()), 2, 64);
        let requests = vec![
            request(0, 0, "ok-a"),
            request(0, 1, "fail"),
            request(0, 2, "empty"),
            request(0, 3, "ok-b"),
        ];

        let fragments = orchestrator
            .run(requests, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].chunk_index, 0);
        assert_eq!(fragments[1].chunk_index, 3);
    }

    #[tokio::test]
    async fn test_pool_size_bounds_concurrency() {
        let completer = Arc::new(EchoCompleter::new());
        let orchestrator = MapOrchestrator::new(completer.clone(), 2, 64);
        let requests = (0..10)
            .map(|i| request(0, i, "chunk delay=10"))
            .collect();

        let fragments = orchestrator
            .run(requests, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(fragments.len(), 10);
        assert!(completer.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_all_failures_yield_empty() {
        let orchestrator = MapOrchestrator::new(Arc::new(EchoCompleter::new()), 3, 64);
        let requests = vec![request(0, 0, "fail"), request(1, 0, "fail")];
        let fragments = orchestrator
            .run(requests, &CancellationToken::new())
            .await
            .unwrap();
        assert!(fragments.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_abandons_calls() {
        let orchestrator = MapOrchestrator::new(Arc::new(EchoCompleter::new()), 2, 64);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let requests = vec![request(0, 0, "slow delay=5000")];
        let result = orchestrator.run(requests, &cancel).await;
        assert!(matches!(result, Err(TimelineError::Cancelled)));
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let orchestrator = MapOrchestrator::new(Arc::new(EchoCompleter::new()), 0, 64);
        let result = orchestrator
            .run(vec![request(0, 0, "x")], &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(TimelineError::InvalidInput(_))));
    }

    #[test]
    fn test_build_map_requests_document_major() {
        let documents = vec![
            SourceDocument::new("A", vec!["a0".into(), "a1".into()]),
            SourceDocument::new("B", vec![]),
            SourceDocument::new("C", vec!["c0".into()]),
        ];
        let requests = build_map_requests("q", &documents);
        let keys: Vec<(usize, usize)> = requests
            .iter()
            .map(|r| (r.document_index, r.chunk_index))
            .collect();
        assert_eq!(keys, vec![(0, 0), (0, 1), (2, 0)]);
        assert!(requests[2].prompt.contains("<doc name=\"C\">\nc0\n</doc>"));
    }
}
