//! Whitespace and length helpers shared by the inspector
//!
//! All lengths are counted in characters, never bytes, so multi-byte text is
//! never split inside a code point.

/// Replaces every run of whitespace with a single space
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }

    out
}

/// Returns the first `max` characters of `text`
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Caps `text` at `max` characters, cutting back to the last whole word
///
/// If the cut lands inside a word, the partial word is dropped. A single word
/// longer than `max` has no boundary to fall back to and is kept at exactly
/// `max` characters. Trailing whitespace is removed in every case.
pub fn trim_to_word(text: &str, max: usize) -> String {
    let Some((cut, next)) = text.char_indices().nth(max) else {
        return text.trim_end().to_string();
    };

    let head = &text[..cut];
    if next.is_whitespace() {
        return head.trim_end().to_string();
    }

    match head.rfind(char::is_whitespace) {
        Some(space) => head[..space].trim_end().to_string(),
        None => head.to_string(),
    }
}
