//! Map prompt construction.

use crate::merge::NO_RELEVANT_SENTINEL;

/// Builds the per-chunk prompt asking for a summary and a cited timeline.
pub struct MapPrompt;

impl MapPrompt {
    /// Format one chunk of one document into a map prompt.
    ///
    /// `document_titles` lists every document in the query so the model can
    /// tell cross-references apart from the chunk it is reading.
    pub fn build(
        query: &str,
        document_titles: &[String],
        document_title: &str,
        chunk: &str,
        chunk_index: usize,
    ) -> String {
        let mut prompt = String::with_capacity(chunk.len() + 2048);

        prompt.push_str(MAP_INSTRUCTION);
        prompt.push_str("\n\nDocuments in this request: ");
        prompt.push_str(&document_titles.join(", "));
        prompt.push_str(&format!("\nThis is excerpt {} of the document below.\n\n", chunk_index));
        prompt.push_str(&format!(
            "<doc name=\"{}\">\n{}\n</doc>\n\n",
            document_title, chunk
        ));
        prompt.push_str(&format!("Question: {}\n\n", query));
        prompt.push_str(&format!(
            "If the excerpt contains nothing relevant to the question, respond with exactly: {}\n",
            NO_RELEVANT_SENTINEL
        ));

        prompt
    }
}

const MAP_INSTRUCTION: &str = r#"You are building a chronology of events from legal documents. Read the excerpt and list every dated or sequenced event relevant to the question.

Respond in this format:
<summary>
One or two sentences on what the excerpt covers.
</summary>
<timeline>
{time}: {event}[^{snippet}]
</timeline>

Rules:
- One event per line, in the order they happened.
- `time` is the date or relative time exactly as the document states it.
- Cite the supporting passage after each event with [^n], where n is the passage number within this document.
- Do not invent dates or events that the excerpt does not support."#;
