//! Structured event extraction.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::completer::Completer;
use crate::error::ExtractionError;
use crate::json::{json_values, strip_code_fences};
use crate::types::ChronologyEvent;

/// Turns merged free text into structured events.
#[async_trait]
pub trait EventExtractor: Send + Sync {
    /// Extract events from `corpus`, using `query` to decide relevance.
    async fn extract_events(
        &self,
        corpus: &str,
        query: &str,
    ) -> Result<Vec<ChronologyEvent>, ExtractionError>;
}

/// Builds the extraction prompt.
pub struct ExtractionPrompt;

impl ExtractionPrompt {
    pub fn build(corpus: &str, query: &str) -> String {
        let mut prompt = String::with_capacity(corpus.len() + 2048);

        prompt.push_str(EXTRACTION_INSTRUCTION);
        prompt.push_str("\n\nQuestion: ");
        prompt.push_str(query);
        prompt.push_str("\n\nTimeline notes:\n");
        prompt.push_str(corpus);
        prompt.push_str("\n\nRespond with ONLY the JSON array. No markdown, no explanation.\n");

        prompt
    }
}

const EXTRACTION_INSTRUCTION: &str = r#"You convert timeline notes into a structured chronology. Each note line has the form `time: event` and may end with citation tokens such as [(0,1)].

Return a JSON array with this structure:
```json
[
  {"title": "short heading", "time": "2020-01-01", "event": "Contract signed.[(0,1)]"}
]
```

Rules:
- One object per event; keep every event that is relevant to the question.
- Copy `time` exactly as written in the notes.
- Keep citation tokens like [(0,1)] in `event` exactly as written.
- If nothing is relevant, return []"#;

/// Extractor that delegates to a [`Completer`].
pub struct LlmExtractor {
    completer: Arc<dyn Completer>,
    max_tokens: u32,
}

impl LlmExtractor {
    pub fn new(completer: Arc<dyn Completer>, max_tokens: u32) -> Self {
        Self {
            completer,
            max_tokens,
        }
    }
}

#[async_trait]
impl EventExtractor for LlmExtractor {
    async fn extract_events(
        &self,
        corpus: &str,
        query: &str,
    ) -> Result<Vec<ChronologyEvent>, ExtractionError> {
        let prompt = ExtractionPrompt::build(corpus, query);
        let raw = self.completer.complete(&prompt, self.max_tokens).await?;
        let events = parse_events(&raw)?;
        debug!(events = events.len(), "Parsed extraction output");
        Ok(events)
    }
}

/// Parse model output into events.
///
/// Accepts a bare JSON array or an object with an `events` array, either
/// one wrapped in code fences or surrounded by prose. Records are converted
/// one at a time; a record that is not an object or lacks `time` and
/// `event` is skipped without affecting the rest.
pub fn parse_events(raw: &str) -> Result<Vec<ChronologyEvent>, ExtractionError> {
    let cleaned = strip_code_fences(raw);
    let records = match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => event_records(value).ok_or_else(|| {
            ExtractionError::Malformed("expected an array or an `events` array".to_string())
        })?,
        Err(_) => locate_records(cleaned)?,
    };

    let total = records.len();
    let events: Vec<ChronologyEvent> = records.iter().filter_map(record_to_event).collect();
    if events.len() < total {
        warn!(
            skipped = total - events.len(),
            "Dropped extracted records without time or event"
        );
    }
    Ok(events)
}

/// Find the event list inside prose.
fn locate_records(text: &str) -> Result<Vec<Value>, ExtractionError> {
    let mut saw_json = false;
    for value in json_values(text, '[').chain(json_values(text, '{')) {
        saw_json = true;
        if let Some(records) = event_records(value) {
            return Ok(records);
        }
    }
    if saw_json {
        Err(ExtractionError::Malformed("no event list in JSON output".to_string()))
    } else {
        Err(ExtractionError::NoJson)
    }
}

/// The records of a bare array or an `{"events": [...]}` wrapper.
///
/// A non-empty array with no objects at all (a stray `[1]`) is not an event
/// list.
fn event_records(value: Value) -> Option<Vec<Value>> {
    let records = match value {
        Value::Array(items) => items,
        Value::Object(mut fields) => match fields.remove("events") {
            Some(Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };
    (records.is_empty() || records.iter().any(Value::is_object)).then_some(records)
}

fn record_to_event(record: &Value) -> Option<ChronologyEvent> {
    let fields = record.as_object()?;
    let time = scalar_text(fields.get("time"))?;
    let event = fields.get("event")?.as_str()?.to_string();
    if time.trim().is_empty() || event.trim().is_empty() {
        return None;
    }
    Some(ChronologyEvent {
        title: scalar_text(fields.get("title")).unwrap_or_default(),
        time,
        event,
        source: scalar_text(fields.get("source")).unwrap_or_default(),
    })
}

/// Strings as-is, numbers and booleans stringified, anything else absent.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
