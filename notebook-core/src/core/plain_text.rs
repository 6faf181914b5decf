//! Projection of rich-text bodies onto lowercase searchable text.

use regex::Regex;
use std::sync::LazyLock;

static DATA_URI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)data:[^;]+;base64,[A-Za-z0-9+/=]+").unwrap());

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Strips embedded base64 payloads and markup from `html`, collapses
/// whitespace and lowercases the result.
///
/// Data URIs are removed before tags, and each tag becomes a single space.
/// The projection is idempotent.
///
/// ```rust
/// use notebook_core::project;
///
/// assert_eq!(project("<p>Hello <b>World</b></p>"), "hello world");
/// ```
pub fn project(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let text = DATA_URI_RE.replace_all(html, "");
    let text = TAG_RE.replace_all(&text, " ");
    let text = WHITESPACE_RE.replace_all(&text, " ");
    text.trim().to_lowercase()
}
