//! Near-duplicate event removal and source population.

use crate::citation::find_global_citation;
use crate::similarity::ratio;
use crate::types::ChronologyEvent;

/// Default minimum similarity for two same-time events to count as duplicates.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.75;

/// Whether `candidate` duplicates `kept`: identical `time` string and
/// lowercase event texts at least `threshold` similar.
pub fn is_duplicate(candidate: &ChronologyEvent, kept: &ChronologyEvent, threshold: f64) -> bool {
    candidate.time == kept.time
        && ratio(
            &candidate.event.to_lowercase(),
            &kept.event.to_lowercase(),
        ) >= threshold
}

/// Drop every event that duplicates an earlier kept event.
///
/// First-seen order is preserved and the first member of each cluster is
/// kept verbatim. Quadratic in the event count.
pub fn dedup(events: Vec<ChronologyEvent>, threshold: f64) -> Vec<ChronologyEvent> {
    let mut kept: Vec<ChronologyEvent> = Vec::with_capacity(events.len());
    for event in events {
        if !kept.iter().any(|k| is_duplicate(&event, k, threshold)) {
            kept.push(event);
        }
    }
    kept
}

/// Set `source` from the first global citation token in each event's text.
///
/// Events without a token keep whatever `source` they had.
pub fn populate_sources(events: &mut [ChronologyEvent]) {
    for event in events.iter_mut() {
        if let Some(citation) = find_global_citation(&event.event) {
            event.source = citation.to_string();
        }
    }
}
