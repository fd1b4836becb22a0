//! Event-count cap.

use crate::types::{ChronologyEvent, ConsolidatedChronology};

/// Default maximum number of events in an answer.
pub const DEFAULT_EVENT_LIMIT: usize = 100;

/// Keep the first `event_limit` events, flagging whether any were cut.
pub fn truncate(mut events: Vec<ChronologyEvent>, event_limit: usize) -> ConsolidatedChronology {
    let truncated = events.len() > event_limit;
    events.truncate(event_limit);
    ConsolidatedChronology {
        events,
        truncated,
        event_limit,
    }
}
