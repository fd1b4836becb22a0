//! Semantic chronological ordering.
//!
//! Dates in legal documents may be relative ("the following week") or only
//! implied by narrative sequence, so ordering is delegated to the model. The
//! model only ever returns an index order; event text cannot be altered.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::completer::Completer;
use crate::error::SortError;
use crate::json::{json_values, strip_code_fences};
use crate::types::ChronologyEvent;

/// Orders events chronologically against the query's intent.
#[async_trait]
pub trait EventSorter: Send + Sync {
    /// Return the new order as indices into `events`.
    async fn reorder(&self, events: &[ChronologyEvent], query: &str)
    -> Result<Vec<usize>, SortError>;
}

/// Builds the sort prompt.
pub struct SortPrompt;

impl SortPrompt {
    pub fn build(events: &[ChronologyEvent], query: &str) -> String {
        let mut prompt = String::with_capacity(events.len() * 96 + 1024);

        prompt.push_str(SORT_INSTRUCTION);
        prompt.push_str("\n\nQuestion: ");
        prompt.push_str(query);
        prompt.push_str("\n\nEvents:\n");
        for (i, event) in events.iter().enumerate() {
            prompt.push_str(&format!("[{}] {}: {}\n", i, event.time, event.event));
        }
        prompt.push_str(&format!(
            "\nRespond with ONLY a JSON array containing each index from 0 to {} exactly once.\n",
            events.len().saturating_sub(1)
        ));

        prompt
    }
}

const SORT_INSTRUCTION: &str = r#"You order events chronologically. Some times are exact dates, some are relative ("two days later") or implied by the narrative. Use the question and the surrounding events to place each one.

Return the event indices in chronological order, earliest first, for example [2, 0, 1]."#;

/// Sorter that delegates to a [`Completer`].
pub struct LlmSorter {
    completer: Arc<dyn Completer>,
    max_tokens: u32,
}

impl LlmSorter {
    pub fn new(completer: Arc<dyn Completer>, max_tokens: u32) -> Self {
        Self {
            completer,
            max_tokens,
        }
    }
}

#[async_trait]
impl EventSorter for LlmSorter {
    async fn reorder(
        &self,
        events: &[ChronologyEvent],
        query: &str,
    ) -> Result<Vec<usize>, SortError> {
        if events.len() < 2 {
            return Ok((0..events.len()).collect());
        }
        let prompt = SortPrompt::build(events, query);
        let raw = self.completer.complete(&prompt, self.max_tokens).await?;
        let order = parse_order(&raw)?;
        debug!(events = events.len(), "Parsed sort order");
        Ok(order)
    }
}

/// Parse a JSON index list from model output.
pub fn parse_order(raw: &str) -> Result<Vec<usize>, SortError> {
    let cleaned = strip_code_fences(raw);
    if let Ok(order) = serde_json::from_str::<Vec<usize>>(cleaned) {
        return Ok(order);
    }
    json_values(cleaned, '[')
        .find_map(|value| serde_json::from_value::<Vec<usize>>(value).ok())
        .ok_or_else(|| SortError::Unparseable(preview(raw)))
}

fn preview(raw: &str) -> String {
    raw.chars().take(80).collect()
}

/// Apply `order` to `events` if it is a permutation of their indices.
pub fn apply_permutation(
    events: &[ChronologyEvent],
    order: &[usize],
) -> Result<Vec<ChronologyEvent>, SortError> {
    let invalid = || SortError::InvalidPermutation {
        expected: events.len(),
    };
    if order.len() != events.len() {
        return Err(invalid());
    }
    let mut seen = vec![false; events.len()];
    for &i in order {
        match seen.get_mut(i) {
            Some(slot) if !*slot => *slot = true,
            _ => return Err(invalid()),
        }
    }
    Ok(order.iter().map(|&i| events[i].clone()).collect())
}
