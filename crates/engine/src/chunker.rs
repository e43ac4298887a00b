//! Content chunker: splits a message body into gateway-sized pieces.
//!
//! Cuts prefer the last whitespace inside the size window, and the single
//! whitespace character at the cut is dropped. A window with no usable
//! whitespace is cut hard at the limit, breaking the word. Whitespace runs
//! are never collapsed. Sizes are counted in characters, not bytes.

/// Split `content` into ordered chunks of at most `max_size` characters.
///
/// Returns an empty vector for empty input and a single chunk equal to the
/// input when it already fits. A `max_size` of zero is treated as one.
pub fn split(content: &str, max_size: usize) -> Vec<String> {
    let max_size = max_size.max(1);
    let mut chunks = Vec::new();
    let mut rest = content;

    // `nth(max_size)` exists exactly when more than `max_size` characters remain.
    while let Some((window_end, _)) = rest.char_indices().nth(max_size) {
        let window = &rest[..window_end];

        // A cut at index 0 would produce an empty chunk.
        match window
            .char_indices()
            .rev()
            .find(|&(idx, ch)| idx > 0 && ch.is_whitespace())
        {
            Some((cut, ch)) => {
                chunks.push(window[..cut].to_string());
                rest = &rest[cut + ch.len_utf8()..];
            }
            None => {
                chunks.push(window.to_string());
                rest = &rest[window_end..];
            }
        }
    }

    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }

    chunks
}
