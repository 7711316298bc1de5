//! Sentence-aware text chunking.
//!
//! The synthesis API caps the length of a single plain-text request, so long
//! input is cut into ordered chunks. Each cut prefers the last sentence
//! terminator inside the window and falls back to a hard cut at the limit.
//! Lengths are measured in characters, so multi-byte text never splits
//! inside a character.

/// Characters that end a sentence for splitting purposes.
pub const SENTENCE_TERMINALS: [char; 4] = ['.', '?', '!', '\n'];

/// Split `text` into trimmed, non-empty chunks of at most `max_length` characters.
///
/// A `max_length` of zero is treated as one.
pub fn split_text_into_chunks(text: &str, max_length: usize) -> Vec<String> {
    let max_length = max_length.max(1);
    let mut chunks = Vec::new();
    let mut remaining = text.trim();

    while !remaining.is_empty() {
        // Byte offset just past the first `max_length` characters
        let window_end = remaining
            .char_indices()
            .nth(max_length)
            .map_or(remaining.len(), |(idx, _)| idx);

        if window_end == remaining.len() {
            chunks.push(remaining.to_string());
            break;
        }

        let window = &remaining[..window_end];
        // Terminals are ASCII, so `idx + 1` is a char boundary
        let split_at = window
            .rfind(&SENTENCE_TERMINALS[..])
            .map_or(window_end, |idx| idx + 1);

        chunks.push(remaining[..split_at].trim().to_string());
        remaining = remaining[split_at..].trim();
    }

    chunks.retain(|chunk| !chunk.is_empty());
    chunks
}
