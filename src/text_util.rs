/// Number of characters kept as a document's content preview.
pub const DEFAULT_PREVIEW_CHARS: usize = 500;

/// Return the first `max_chars` characters of `text`.
///
/// Counts Unicode scalar values, so a multi-byte character is never split.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Split text into lowercase word tokens.
///
/// A token is a maximal run of alphanumeric characters, optionally joined by
/// inner apostrophes or hyphens ("year-over-year", "company's"). Tokens made
/// only of digits are kept; callers filter them when they need to.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_alphanumeric() {
            current.extend(c.to_lowercase());
        } else if (c == '\'' || c == '-' || c == '\u{2019}')
            && !current.is_empty()
            && chars.peek().is_some_and(|next| next.is_alphanumeric())
        {
            current.push(if c == '-' { '-' } else { '\'' });
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}
