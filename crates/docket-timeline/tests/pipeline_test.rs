//! End-to-end pipeline runs against scripted completers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docket_llm::{LlmError, MockBackend, MockResponse};
use docket_timeline::{
    BackendCompleter, Completer, RenderMode, SourceDocument, TimelineConfig, TimelineError,
    TimelinePipeline,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Answers by prompt kind: map prompts by document title, then the
/// extraction and sort prompts.
struct ScriptedCompleter {
    map_replies: Vec<(&'static str, &'static str, u64)>,
    extraction_reply: &'static str,
    sort_reply: &'static str,
    extraction_prompts: Mutex<Vec<String>>,
}

impl ScriptedCompleter {
    fn new(map_replies: Vec<(&'static str, &'static str, u64)>) -> Self {
        Self {
            map_replies,
            extraction_reply: "[]",
            sort_reply: "[]",
            extraction_prompts: Mutex::new(Vec::new()),
        }
    }

    fn with_extraction(mut self, reply: &'static str) -> Self {
        self.extraction_reply = reply;
        self
    }

    fn with_sort(mut self, reply: &'static str) -> Self {
        self.sort_reply = reply;
        self
    }
}

#[async_trait]
impl Completer for ScriptedCompleter {
    async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
        if prompt.contains("structured chronology") {
            self.extraction_prompts.lock().push(prompt.to_string());
            return Ok(self.extraction_reply.to_string());
        }
        if prompt.contains("You order events") {
            return Ok(self.sort_reply.to_string());
        }
        for (title, reply, delay_ms) in &self.map_replies {
            if prompt.contains(&format!("<doc name=\"{}\">", title)) {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                return Ok(reply.to_string());
            }
        }
        Err(LlmError::Backend("unscripted prompt".into()))
    }
}

fn documents(titles: &[&str]) -> Vec<SourceDocument> {
    titles
        .iter()
        .map(|t| SourceDocument::new(*t, vec![format!("Body of {}", t)]))
        .collect()
}

#[tokio::test]
async fn test_single_contributing_document() {
    let completer = Arc::new(
        ScriptedCompleter::new(vec![
            (
                "Lease",
                "<summary>Lease terms.</summary>\n<timeline>2020-01-01: Contract signed.[^1]</timeline>",
                0,
            ),
            ("Memo", "No relevant information found.", 0),
        ])
        .with_extraction(
            r#"[{"title": "Signing", "time": "2020-01-01", "event": "Contract signed.[(0,1)]"}]"#,
        ),
    );
    let pipeline = TimelinePipeline::with_completer(completer.clone(), TimelineConfig::default());

    let (outcome, report) = pipeline
        .run("When was the contract signed?", &documents(&["Lease", "Memo"]), &CancellationToken::new())
        .await
        .unwrap();

    let answer = outcome.answer().unwrap();
    assert_eq!(answer.events.events.len(), 1);
    assert_eq!(answer.events.events[0].source, "(0,1)");
    assert!(answer.text.contains("2020-01-01: Contract signed."));
    assert!(answer.text.contains("[(0,1)]"));
    assert!(!answer.truncated);

    let prompts = completer.extraction_prompts.lock();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("2020-01-01: Contract signed.[(0,1)]"));
    assert!(!prompts[0].contains("No relevant information found"));

    assert_eq!(report.prompts_issued, 2);
    assert_eq!(report.documents_contributing, 1);
}

#[tokio::test]
async fn test_all_documents_irrelevant() {
    let completer = Arc::new(ScriptedCompleter::new(vec![
        ("A", "No relevant information found.", 0),
        ("B", "<timeline>No relevant information found.</timeline>", 0),
    ]));
    let pipeline = TimelinePipeline::with_completer(completer.clone(), TimelineConfig::default());

    let (outcome, report) = pipeline
        .run("q", &documents(&["A", "B"]), &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.is_no_events());
    assert_eq!(report.documents_contributing, 0);
    assert!(completer.extraction_prompts.lock().is_empty());
}

#[tokio::test]
async fn test_document_order_survives_out_of_order_completion() {
    let completer = Arc::new(
        ScriptedCompleter::new(vec![
            ("First", "<timeline>Day 1: Opened.[^1]</timeline>", 60),
            ("Second", "<timeline>Day 2: Closed.[^4]</timeline>", 0),
        ])
        .with_extraction(
            r#"[{"time": "Day 1", "event": "Opened.[(0,1)]"}, {"time": "Day 2", "event": "Closed.[(1,4)]"}]"#,
        )
        .with_sort("[0, 1]"),
    );
    let pipeline = TimelinePipeline::with_completer(completer.clone(), TimelineConfig::default());

    let (outcome, _) = pipeline
        .run("q", &documents(&["First", "Second"]), &CancellationToken::new())
        .await
        .unwrap();

    let prompts = completer.extraction_prompts.lock();
    let first = prompts[0].find("Day 1: Opened.[(0,1)]").unwrap();
    let second = prompts[0].find("Day 2: Closed.[(1,4)]").unwrap();
    assert!(first < second);

    let events = &outcome.answer().unwrap().events.events;
    assert_eq!(events[0].source, "(0,1)");
    assert_eq!(events[1].source, "(1,4)");
}

#[tokio::test]
async fn test_failed_map_call_is_dropped() {
    // "Ghost" has no scripted reply, so its map call fails.
    let completer = Arc::new(
        ScriptedCompleter::new(vec![("Lease", "<timeline>May: Signed.[^2]</timeline>", 0)])
            .with_extraction(r#"[{"time": "May", "event": "Signed.[(1,2)]"}]"#),
    );
    let pipeline = TimelinePipeline::with_completer(completer, TimelineConfig::default());

    let (outcome, report) = pipeline
        .run("q", &documents(&["Ghost", "Lease"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.fragments_dropped, 1);
    assert!(report.has_dropped_fragments());
    assert_eq!(outcome.answer().unwrap().events.events[0].source, "(1,2)");
}

#[tokio::test]
async fn test_unparseable_sort_keeps_extraction_order() {
    let completer = Arc::new(
        ScriptedCompleter::new(vec![("Log", "<timeline>x</timeline>", 0)])
            .with_extraction(
                r#"[{"time": "later", "event": "Second"}, {"time": "earlier", "event": "First"}]"#,
            )
            .with_sort("I cannot order these."),
    );
    let pipeline = TimelinePipeline::with_completer(completer, TimelineConfig::default());

    let (outcome, report) = pipeline
        .run("q", &documents(&["Log"]), &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.sort_fallback);
    let events = &outcome.answer().unwrap().events.events;
    assert_eq!(events[0].event, "Second");
    assert_eq!(events[1].event, "First");
}

#[tokio::test]
async fn test_event_limit_truncates_and_notes() {
    let completer = Arc::new(
        ScriptedCompleter::new(vec![("Log", "<timeline>x</timeline>", 0)])
            .with_extraction(
                r#"[{"time": "1", "event": "one"}, {"time": "2", "event": "two"}, {"time": "3", "event": "three"}]"#,
            )
            .with_sort("[0, 1, 2]"),
    );
    let config = TimelineConfig {
        event_limit: 2,
        ..Default::default()
    };
    let pipeline = TimelinePipeline::with_completer(completer, config);

    let (outcome, report) = pipeline
        .run("q", &documents(&["Log"]), &CancellationToken::new())
        .await
        .unwrap();

    let answer = outcome.answer().unwrap();
    assert!(report.truncated);
    assert!(answer.truncated);
    assert_eq!(answer.events.events.len(), 2);
    assert!(answer.text.ends_with(
        "The Timeline feature has extracted the first 2 events from your documents."
    ));
}

#[tokio::test]
async fn test_stripped_mode_removes_tokens() {
    let completer = Arc::new(
        ScriptedCompleter::new(vec![("Lease", "<timeline>May: Signed.[^1]</timeline>", 0)])
            .with_extraction(r#"[{"time": "May", "event": "Signed [(0,1)]"}]"#),
    );
    let config = TimelineConfig {
        render_mode: RenderMode::Stripped,
        ..Default::default()
    };
    let pipeline = TimelinePipeline::with_completer(completer, config);

    let (outcome, _) = pipeline
        .run("q", &documents(&["Lease"]), &CancellationToken::new())
        .await
        .unwrap();

    let answer = outcome.answer().unwrap();
    assert!(!answer.text.contains("[(0,1)]"));
    assert_eq!(answer.events.events[0].source, "(0,1)");
}

#[tokio::test]
async fn test_cancellation_during_map() {
    let completer = Arc::new(ScriptedCompleter::new(vec![(
        "Slow",
        "<timeline>x</timeline>",
        5_000,
    )]));
    let pipeline = TimelinePipeline::with_completer(completer, TimelineConfig::default());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let result = pipeline.run("q", &documents(&["Slow"]), &cancel).await;
    assert!(matches!(result, Err(TimelineError::Cancelled)));
}

#[tokio::test]
async fn test_through_mock_backend() {
    // One chunk, one map call, one extraction call; the sorter skips a single event.
    let backend = Arc::new(MockBackend::new(vec![
        MockResponse::text("<summary>s</summary>\n<timeline>2019: Claim issued.[^3]</timeline>"),
        MockResponse::text(r#"```json
[{"title": "Claim", "time": "2019", "event": "Claim issued.[(0,3)]"}]
```"#),
    ]));
    let completer = Arc::new(BackendCompleter::new(backend.clone(), "test-model"));
    let pipeline = TimelinePipeline::with_completer(completer, TimelineConfig::default());

    let (outcome, _) = pipeline
        .run("q", &documents(&["Claim"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(backend.request_count(), 2);
    let answer = outcome.answer().unwrap();
    assert!(answer.text.starts_with("This is a response containing a timeline of events: \n"));
    assert!(answer.text.contains("Claim"));
    assert_eq!(answer.events.events[0].source, "(0,3)");
}
