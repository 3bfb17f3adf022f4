//! Requirement chunking.

/// Default chunk size, in characters.
pub const DEFAULT_MAX_CHARS: usize = 6000;

/// Splits `text` into contiguous slices of at most `max_chars` characters.
///
/// Slices never split a character, cover the input exactly and keep its
/// order. An empty input yields no chunks; `max_chars == 0` is treated as 1.
#[must_use]
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let split = rest.char_indices().nth(max_chars).map_or(rest.len(), |(idx, _)| idx);
        let (chunk, tail) = rest.split_at(split);
        chunks.push(chunk);
        rest = tail;
    }

    chunks
}
