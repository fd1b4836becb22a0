//! Per-document merge of chunk fragments.

use std::sync::LazyLock;

use regex::Regex;

use crate::citation::remap_citations;
use crate::types::{ChunkFragment, DocumentTimeline};

/// Marker a map call returns when its chunk has nothing relevant.
pub const NO_RELEVANT_MESSAGE: &str = "No relevant information found";

/// Merged text of a document that contributed nothing.
pub const NO_RELEVANT_SENTINEL: &str = "No relevant information found.";

/// Three or more line breaks, possibly with blanks on the empty lines.
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("valid blank-run regex"));

/// Whether `text` is empty or consists solely of the no-relevant marker
/// (case-insensitive, optional trailing period).
pub fn is_no_relevant(text: &str) -> bool {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed).trim_end();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NO_RELEVANT_MESSAGE)
}

/// Body of the first `<tag>...</tag>` section in `text`, trimmed.
///
/// An opening tag without a closing one yields the rest of the text.
pub fn extract_tagged<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = text.find(&open)? + open.len();
    let rest = &text[start..];
    let body = match rest.find(&close) {
        Some(end) => &rest[..end],
        None => rest,
    };
    Some(body.trim())
}

/// The structured parts of one map response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentSections<'a> {
    /// Kept for diagnostics; never merged.
    pub summary: Option<&'a str>,
    pub timeline: &'a str,
}

impl<'a> FragmentSections<'a> {
    /// Split a raw response. Without a `<timeline>` section the whole
    /// response is treated as the timeline.
    pub fn parse(raw: &'a str) -> Self {
        Self {
            summary: extract_tagged(raw, "summary"),
            timeline: extract_tagged(raw, "timeline").unwrap_or_else(|| raw.trim()),
        }
    }
}

/// Fold one document's ordered fragments into a single block.
///
/// Fragments that are (or whose timeline section is) the no-relevant marker
/// are dropped. If nothing survives the result is [`NO_RELEVANT_SENTINEL`].
pub fn merge_fragments<'a>(fragments: impl IntoIterator<Item = &'a str>) -> String {
    let sections: Vec<&str> = fragments
        .into_iter()
        .filter(|raw| !is_no_relevant(raw))
        .map(|raw| FragmentSections::parse(raw).timeline)
        .filter(|timeline| !is_no_relevant(timeline))
        .collect();

    let joined = sections.join("\n");
    let collapsed = BLANK_RUN.replace_all(&joined, "\n\n");
    let merged = collapsed.trim();

    if merged.is_empty() {
        NO_RELEVANT_SENTINEL.to_string()
    } else {
        merged.to_string()
    }
}

/// Merge every document's fragments and remap its citations to global form.
///
/// `fragments` must be in submission order (document-major, chunk-minor);
/// documents without any fragment get the sentinel.
pub fn build_document_timelines(
    titles: &[String],
    fragments: &[ChunkFragment],
) -> Vec<DocumentTimeline> {
    let mut per_document: Vec<Vec<&str>> = vec![Vec::new(); titles.len()];
    for fragment in fragments {
        if let Some(bucket) = per_document.get_mut(fragment.document_index) {
            bucket.push(fragment.raw_text.as_str());
        }
    }

    titles
        .iter()
        .zip(per_document)
        .enumerate()
        .map(|(document_index, (title, raw))| {
            let merged = merge_fragments(raw);
            let merged_text = if is_no_relevant(&merged) {
                merged
            } else {
                remap_citations(&merged, document_index)
            };
            DocumentTimeline {
                document_index,
                document_title: title.clone(),
                merged_text,
            }
        })
        .collect()
}

/// Join the non-sentinel contributions into one extraction corpus.
pub fn build_corpus(timelines: &[DocumentTimeline]) -> Option<String> {
    let parts: Vec<&str> = timelines
        .iter()
        .filter(|t| !t.is_empty_contribution())
        .map(|t| t.merged_text.as_str())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}
