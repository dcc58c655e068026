//! Token budget approximation.
//!
//! There is no tokenizer here: a token is taken to be four bytes of UTF-8.
//! The divisor is fixed so truncation decisions stay reproducible.

/// Bytes counted as one token.
pub const BYTES_PER_TOKEN: usize = 4;

/// Appended after a cut so readers and the model can tell text is missing.
pub const TRUNCATION_MARKER: &str = "\n\n[... chapter text truncated to fit the token budget ...]";

/// Approximate token count: `ceil(bytes / 4)`.
pub fn estimate(text: &str) -> usize {
    text.len().div_ceil(BYTES_PER_TOKEN)
}

/// Whether `text` must be cut to fit `max_tokens`.
pub fn exceeds(text: &str, max_tokens: usize) -> bool {
    estimate(text) > max_tokens && !is_truncated_to(text, max_tokens)
}

/// Cut `text` to at most `max_tokens * 4` bytes and append [`TRUNCATION_MARKER`].
///
/// Text that already fits is returned unchanged, as is text previously
/// truncated to the same budget. The cut backs off to a char boundary.
pub fn truncate(text: &str, max_tokens: usize) -> String {
    if !exceeds(text, max_tokens) {
        return text.to_string();
    }

    let mut cut = max_tokens.saturating_mul(BYTES_PER_TOKEN).min(text.len());
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
    out.push_str(&text[..cut]);
    out.push_str(TRUNCATION_MARKER);
    out
}

/// The marker only counts once: a body that fits plus the marker is final.
fn is_truncated_to(text: &str, max_tokens: usize) -> bool {
    text.strip_suffix(TRUNCATION_MARKER)
        .is_some_and(|body| estimate(body) <= max_tokens)
}
