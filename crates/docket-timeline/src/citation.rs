//! Citation tokens.
//!
//! A map response cites snippets of its own document with local tokens
//! `[^k]`. Before documents are combined, each local token is rewritten to a
//! global token `[(d,k)]` carrying the document index, so tokens from
//! different documents never collide.

use std::sync::LazyLock;

use regex::Regex;

static LOCAL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\^(\d+)\]").expect("valid local citation regex"));

static GLOBAL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\((\d+),(\d+)\)\]").expect("valid global citation regex"));

/// Anything in square brackets made only of digits, parentheses, commas and
/// spaces, with the blanks in front of it.
static STRIPPABLE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*\[[()\d, ]+\]").expect("valid strip regex"));

/// Rewrite every local token `[^k]` in `text` to the global token `[(d,k)]`.
///
/// Global tokens and malformed tokens (`[^x]`, `[^1`) are left untouched.
pub fn remap_citations(text: &str, document_index: usize) -> String {
    LOCAL_TOKEN
        .replace_all(text, |caps: &regex::Captures<'_>| {
            format!("[({},{})]", document_index, &caps[1])
        })
        .into_owned()
}

/// A typed `(document, snippet)` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalCitation {
    pub document: usize,
    pub snippet: usize,
}

impl GlobalCitation {
    pub fn new(document: usize, snippet: usize) -> Self {
        Self { document, snippet }
    }

    /// Parse a `source` string such as `(0,1)`. Surrounding brackets and
    /// whitespace are tolerated.
    pub fn parse(source: &str) -> Option<Self> {
        let inner = source
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .trim()
            .strip_prefix('(')?
            .strip_suffix(')')?;
        let (document, snippet) = inner.split_once(',')?;
        Some(Self {
            document: document.trim().parse().ok()?,
            snippet: snippet.trim().parse().ok()?,
        })
    }

    /// The inline token form, `[(d,k)]`.
    pub fn token(&self) -> String {
        format!("[{}]", self)
    }
}

impl std::fmt::Display for GlobalCitation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.document, self.snippet)
    }
}

/// First global token in `text`, if any.
pub fn find_global_citation(text: &str) -> Option<GlobalCitation> {
    let caps = GLOBAL_TOKEN.captures(text)?;
    Some(GlobalCitation {
        document: caps[1].parse().ok()?,
        snippet: caps[2].parse().ok()?,
    })
}

/// Replace every global token in `text` using `replace`; tokens for which it
/// returns `None` are kept as-is.
pub fn replace_global_citations(
    text: &str,
    replace: impl Fn(GlobalCitation) -> Option<String>,
) -> String {
    GLOBAL_TOKEN
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let parsed = caps[1]
                .parse()
                .ok()
                .zip(caps[2].parse().ok())
                .map(|(document, snippet)| GlobalCitation { document, snippet });
            parsed
                .and_then(&replace)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Remove citation tokens from `text` together with the spaces before them.
pub fn strip_citations(text: &str) -> String {
    STRIPPABLE_TOKEN.replace_all(text, "").trim().to_string()
}
