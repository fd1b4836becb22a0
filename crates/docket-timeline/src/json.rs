//! Tolerant scanning of JSON embedded in model output.

use serde_json::{Deserializer, Value};

/// Strip markdown code fences from model output.
pub(crate) fn strip_code_fences(s: &str) -> &str {
    let s = s.trim();

    if let Some(rest) = s.strip_prefix("```json")
        && let Some(inner) = rest.strip_suffix("```")
    {
        return inner.trim();
    }
    if let Some(rest) = s.strip_prefix("```")
        && let Some(inner) = rest.strip_suffix("```")
    {
        return inner.trim();
    }

    s
}

/// Every JSON value that parses starting at an `open` character, left to right.
///
/// Trailing text after a value is ignored, so `"see [notes]: [1, 2] done"`
/// with `open = '['` yields only `[1, 2]`; `[notes]` is not JSON.
pub(crate) fn json_values(s: &str, open: char) -> impl Iterator<Item = Value> + '_ {
    s.match_indices(open).filter_map(move |(i, _)| {
        Deserializer::from_str(&s[i..])
            .into_iter::<Value>()
            .next()
            .and_then(Result::ok)
    })
}
