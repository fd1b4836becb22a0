//! Answer rendering.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::citation::{GlobalCitation, replace_global_citations, strip_citations};
use crate::types::{ChronologyEvent, ConsolidatedAnswer, ConsolidatedChronology};

/// First line of every rendered answer when the header is enabled.
pub const HEADER: &str = "This is a response containing a timeline of events: \n";

/// Notice appended when the event list was cut at `event_limit`.
pub fn truncation_notice(event_limit: usize) -> String {
    format!(
        "\n\nThe Timeline feature has extracted the first {} events from your documents.",
        event_limit
    )
}

/// How citations appear in the rendered answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Tokens stay inline in event text, optionally rewritten by an
    /// [`AnchorResolver`].
    #[default]
    Inline,
    /// Tokens are removed from event text and exposed only via `source`.
    Stripped,
}

/// Maps a global citation to a human-navigable location (page, paragraph
/// anchor, link). Consulted only in [`RenderMode::Inline`].
pub trait AnchorResolver: Send + Sync {
    fn resolve(&self, citation: GlobalCitation) -> Option<String>;
}

/// Serializes a chronology into the final answer.
#[derive(Clone, Default)]
pub struct AnswerRenderer {
    mode: RenderMode,
    include_header: bool,
    resolver: Option<Arc<dyn AnchorResolver>>,
}

impl AnswerRenderer {
    pub fn new(mode: RenderMode, include_header: bool) -> Self {
        Self {
            mode,
            include_header,
            resolver: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn AnchorResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn render(&self, mut chronology: ConsolidatedChronology) -> ConsolidatedAnswer {
        if self.mode == RenderMode::Stripped {
            for event in chronology.events.iter_mut() {
                event.event = strip_citations(&event.event);
            }
        }

        let mut text = String::new();
        if self.include_header {
            text.push_str(HEADER);
        }

        let mut body = String::new();
        for event in &chronology.events {
            body.push_str(&self.block(event));
        }
        text.push_str(body.trim_end());

        if chronology.truncated {
            text.push_str(&truncation_notice(chronology.event_limit));
        }

        let truncated = chronology.truncated;
        ConsolidatedAnswer {
            text,
            events: chronology,
            truncated,
        }
    }

    /// `{title}\n{time}: {event}\n`; the title line is omitted when empty.
    fn block(&self, event: &ChronologyEvent) -> String {
        let body = match (&self.mode, &self.resolver) {
            (RenderMode::Inline, Some(resolver)) => {
                replace_global_citations(&event.event, |c| resolver.resolve(c))
            }
            _ => event.event.clone(),
        };

        let mut block = String::new();
        if !event.title.trim().is_empty() {
            block.push_str(event.title.trim());
            block.push('\n');
        }
        block.push_str(&format!("{}: {}\n", event.time, body));
        block
    }
}

impl std::fmt::Debug for AnswerRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerRenderer")
            .field("mode", &self.mode)
            .field("include_header", &self.include_header)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chronology(events: Vec<ChronologyEvent>, truncated: bool) -> ConsolidatedChronology {
        ConsolidatedChronology {
            events,
            truncated,
            event_limit: 2,
        }
    }

    #[test]
    fn test_render_inline_with_header() {
        let renderer = AnswerRenderer::new(RenderMode::Inline, true);
        let answer = renderer.render(chronology(
            vec![
                ChronologyEvent::new("2020-01-01", "Contract signed.[(0,1)]")
                    .with_title("Signing")
                    .with_source("(0,1)"),
                ChronologyEvent::new("2020-02-01", "Paid."),
            ],
            false,
        ));

        assert_eq!(
            answer.text,
            "This is a response containing a timeline of events: \n\
             Signing\n2020-01-01: Contract signed.[(0,1)]\n2020-02-01: Paid."
        );
        assert!(!answer.truncated);
        assert_eq!(answer.events.events.len(), 2);
    }

    #[test]
    fn test_render_without_header() {
        let renderer = AnswerRenderer::new(RenderMode::Inline, false);
        let answer = renderer.render(chronology(vec![ChronologyEvent::new("May", "X")], false));
        assert_eq!(answer.text, "May: X");
    }

    #[test]
    fn test_render_truncation_notice() {
        let renderer = AnswerRenderer::new(RenderMode::Inline, false);
        let answer = renderer.render(chronology(vec![ChronologyEvent::new("May", "X")], true));
        assert!(answer.truncated);
        assert_eq!(
            answer.text,
            "May: X\n\nThe Timeline feature has extracted the first 2 events from your documents."
        );
    }

    #[test]
    fn test_render_stripped_mode() {
        let renderer = AnswerRenderer::new(RenderMode::Stripped, false);
        let answer = renderer.render(chronology(
            vec![ChronologyEvent::new("2020", "Signed [(0,1)].").with_source("(0,1)")],
            false,
        ));
        assert_eq!(answer.text, "2020: Signed.");
        assert_eq!(answer.events.events[0].event, "Signed.");
        assert_eq!(answer.events.events[0].source, "(0,1)");
    }

    struct PageResolver;

    impl AnchorResolver for PageResolver {
        fn resolve(&self, citation: GlobalCitation) -> Option<String> {
            (citation.document == 0).then(|| format!("[p.{}]", citation.snippet))
        }
    }

    #[test]
    fn test_render_inline_resolver() {
        let renderer =
            AnswerRenderer::new(RenderMode::Inline, false).with_resolver(Arc::new(PageResolver));
        let answer = renderer.render(chronology(
            vec![ChronologyEvent::new("2020", "A [(0,4)] B [(1,1)]")],
            false,
        ));
        assert_eq!(answer.text, "2020: A [p.4] B [(1,1)]");
        // the structured event keeps the raw token
        assert_eq!(answer.events.events[0].event, "A [(0,4)] B [(1,1)]");
    }

    #[test]
    fn test_resolver_ignored_in_stripped_mode() {
        let renderer =
            AnswerRenderer::new(RenderMode::Stripped, false).with_resolver(Arc::new(PageResolver));
        let answer = renderer.render(chronology(vec![ChronologyEvent::new("2020", "A [(0,4)]")], false));
        assert_eq!(answer.text, "2020: A");
    }
}
