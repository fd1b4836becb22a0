//! Consolidation report for pipeline runs.

use serde::{Deserialize, Serialize};

/// Counters summarizing one consolidation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationReport {
    /// Map prompts issued (one per chunk).
    pub prompts_issued: usize,
    /// Non-empty map responses received.
    pub fragments_received: usize,
    /// Map calls that failed or came back empty.
    pub fragments_dropped: usize,
    /// Documents whose merged text was not the sentinel.
    pub documents_contributing: usize,
    /// Events returned by structured extraction.
    pub events_extracted: usize,
    /// Events removed as near-duplicates.
    pub duplicates_removed: usize,
    /// Whether the sort failed and extraction order was kept.
    pub sort_fallback: bool,
    /// Whether the event list was cut at the limit.
    pub truncated: bool,
}

impl ConsolidationReport {
    /// Whether any map call was lost.
    pub fn has_dropped_fragments(&self) -> bool {
        self.fragments_dropped > 0
    }
}

impl std::fmt::Display for ConsolidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ConsolidationReport {{ prompts: {}, fragments: {} (dropped: {}), documents: {}, events: {} (duplicates: {}), sort_fallback: {}, truncated: {} }}",
            self.prompts_issued,
            self.fragments_received,
            self.fragments_dropped,
            self.documents_contributing,
            self.events_extracted,
            self.duplicates_removed,
            self.sort_fallback,
            self.truncated,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_default() {
        let report = ConsolidationReport::default();
        assert_eq!(report.prompts_issued, 0);
        assert!(!report.has_dropped_fragments());
        assert!(!report.sort_fallback);
    }

    #[test]
    fn test_report_display() {
        let report = ConsolidationReport {
            prompts_issued: 4,
            fragments_received: 3,
            fragments_dropped: 1,
            documents_contributing: 2,
            events_extracted: 7,
            duplicates_removed: 2,
            sort_fallback: true,
            truncated: false,
        };
        let s = report.to_string();
        assert!(s.contains("prompts: 4"));
        assert!(s.contains("fragments: 3 (dropped: 1)"));
        assert!(s.contains("events: 7 (duplicates: 2)"));
        assert!(s.contains("sort_fallback: true"));
        assert!(report.has_dropped_fragments());
    }
}
