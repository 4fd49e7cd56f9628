//! Text normalization before speech synthesis.

/// Maximum number of characters handed to the synthesis collaborator.
/// This is a product limit, not an error condition.
pub const MAX_SPEECH_CHARS: usize = 5000;

/// Appended when normalized text exceeds [`MAX_SPEECH_CHARS`].
pub const TRUNCATION_MARKER: &str = "... [Content truncated]";

/// Collapses all whitespace runs (including newlines) to single spaces,
/// trims, and caps the result at [`MAX_SPEECH_CHARS`] characters.
///
/// Truncation cuts at a char boundary, so multi-byte text never splits
/// mid-character. Never fails; empty input yields an empty string.
pub fn normalize_for_speech(text: &str) -> String {
    normalize_with_limit(text, MAX_SPEECH_CHARS)
}

/// Same as [`normalize_for_speech`] with a caller-chosen character cap.
pub fn normalize_with_limit(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    match collapsed.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            let mut capped = collapsed[..byte_idx].to_string();
            capped.push_str(TRUNCATION_MARKER);
            capped
        }
        None => collapsed,
    }
}
