/// Maximum characters per outbound text message.
pub const DEFAULT_CHUNK_CHARS: usize = 4000;

/// Split `text` into consecutive pieces of at most `budget` characters.
///
/// Splits on character boundaries only, so concatenating the pieces yields the
/// input exactly. Text within the budget comes back as a single piece; empty
/// text yields nothing.
pub fn chunk_text(text: &str, budget: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let budget = budget.max(1);

    let mut chunks = Vec::with_capacity(text.len() / budget + 1);
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == budget {
            chunks.push(text[start..idx].to_string());
            start = idx;
            count = 0;
        }
        count += 1;
    }
    chunks.push(text[start..].to_string());
    chunks
}
