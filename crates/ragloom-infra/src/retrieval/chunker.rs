//! Fixed-window text chunker.
//!
//! Splits text into character windows of `chunk_size` where consecutive
//! windows share `overlap` characters. The window that reaches the end of the
//! text is the last one.

/// Split `text` into overlapping character windows.
///
/// Windows are measured in `char`s, not bytes, so multi-byte text never
/// splits inside a code point. An overlap at or above the window size is
/// clamped so the loop always advances.
pub fn split_into_chunks(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let size = chunk_size.max(1);
    let step = size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = start + size;
        chunks.push(chars[start..end.min(chars.len())].iter().collect());
        if end >= chars.len() {
            break;
        }
        start += step;
    }
    chunks
}
