//! Text helpers for notification messages.

use regex::Regex;
use std::sync::LazyLock;

/// `@name` preceded by start-of-text or a character that cannot be part of
/// an email local part, so `someone@example.com` is not a mention.
static MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w@.-])@([A-Za-z0-9_-]+)").expect("mention pattern is valid")
});

/// Up to `max_chars` leading characters of `text`, cut on a char boundary.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Distinct usernames mentioned as `@name`, in order of first appearance.
pub fn mentioned_usernames(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in MENTION.captures_iter(content) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
