//! Paragraph-based document chunking.

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Paragraphs (separated by blank lines) are packed greedily; a paragraph
/// longer than the packing budget is cut on character boundaries. Each chunk
/// after the first starts with up to `overlap_chars` trailing characters of
/// the previous one plus a blank line, and the budget leaves room for that
/// prefix. Blank input yields no chunks.
pub fn chunk_document(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let overlap_chars = overlap_chars.min(max_chars.saturating_sub(3));
    let budget = if overlap_chars == 0 {
        max_chars
    } else {
        max_chars - overlap_chars - 2
    };

    let normalized = text.replace("\r\n", "\n");
    let paragraphs: Vec<&str> = normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mut pieces: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;

    for paragraph in paragraphs {
        for part in split_long(paragraph, budget) {
            let part_chars = part.chars().count();
            let add = if buf.is_empty() { part_chars } else { part_chars + 2 };
            if !buf.is_empty() && buf_chars + add > budget {
                pieces.push(std::mem::take(&mut buf));
                buf_chars = 0;
            }
            if !buf.is_empty() {
                buf.push_str("\n\n");
                buf_chars += 2;
            }
            buf.push_str(part);
            buf_chars += part_chars;
        }
    }
    if !buf.trim().is_empty() {
        pieces.push(buf);
    }

    if overlap_chars == 0 {
        return pieces;
    }

    let mut chunks = Vec::with_capacity(pieces.len());
    for (i, piece) in pieces.iter().enumerate() {
        if i == 0 {
            chunks.push(piece.clone());
            continue;
        }
        let tail = tail_chars(&pieces[i - 1], overlap_chars);
        chunks.push(format!("{}\n\n{}", tail.trim_start(), piece));
    }
    chunks
}

/// Cut a paragraph into parts of at most `max_chars` characters.
fn split_long(paragraph: &str, max_chars: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut count = 0usize;
    for (idx, _) in paragraph.char_indices() {
        if count == max_chars {
            parts.push(&paragraph[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < paragraph.len() {
        parts.push(&paragraph[start..]);
    }
    parts
}

/// The last `n` characters of `s`.
fn tail_chars(s: &str, n: usize) -> &str {
    let total = s.chars().count();
    if total <= n {
        return s;
    }
    let skip = total - n;
    match s.char_indices().nth(skip) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
