//! Rich-text HTML to Markdown conversion for export.
//!
//! The conversion runs as a fixed pipeline of small steps so each can be
//! tested on its own:
//!
//! 1. [`protect_sized_images`] swaps `<img>` tags that carry `style`, `width`
//!    or `height` for placeholder tokens.
//! 2. [`blank_empty_emphasis`] turns emphasis elements holding only whitespace
//!    into a plain space, so the words around them stay apart.
//! 3. [`html_to_markdown`] runs the HTML to Markdown transform.
//! 4. [`tighten_bullets`] writes list markers as `* ` instead of `*   `.
//! 5. [`restore_images`] puts the original tags back, each in its own block.
//! 6. [`strip_empty_emphasis`], [`drop_marker_only_lines`] and
//!    [`collapse_blank_lines`] clean up what the transform leaves behind for
//!    empty formatted regions.

use crate::{NotebookError, Result};
use htmd::HtmlToMarkdown;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

static IMG_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").unwrap());

static SIZED_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s(?:style|width|height)\s*=").unwrap());

static EMPTY_EMPHASIS_ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)<(?:em|strong|b|i)(?:\s[^>]*)?>(?:\s|&nbsp;|&#0*160;|&#x0*a0;|\x{a0})*</(?:em|strong|b|i)\s*>",
    )
    .unwrap()
});

static LOOSE_BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)\*[ \t]{2,}(\S)").unwrap());

static EMPTY_STRONG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(^|[ \t])(?:\*\*|__)[ \t]*(?:\*\*|__)([ \t]|$)").unwrap()
});

static EMPTY_EM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(^|[ \t])_[ \t]+_([ \t]|$)").unwrap());

static MARKER_ONLY_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[*_]+[ \t]*$").unwrap());

static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:[ \t]*\n){3,}").unwrap());

const PLACEHOLDER_PREFIX: &str = "NBIMGPROTECT";
const PLACEHOLDER_SUFFIX: &str = "END";

/// HTML whose sized images have been replaced by placeholder tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectedHtml {
    pub html: String,
    /// Original tags, indexed by placeholder number.
    pub images: Vec<String>,
}

fn placeholder(index: usize) -> String {
    format!("{PLACEHOLDER_PREFIX}{index}{PLACEHOLDER_SUFFIX}")
}

/// Replaces every `<img>` carrying `style`, `width` or `height` with a
/// placeholder token. Unsized images are left for the transform.
pub fn protect_sized_images(html: &str) -> ProtectedHtml {
    let mut images = Vec::new();
    let html = IMG_TAG_RE
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[0];
            if SIZED_ATTR_RE.is_match(tag) {
                images.push(tag.to_string());
                placeholder(images.len() - 1)
            } else {
                tag.to_string()
            }
        })
        .into_owned();
    ProtectedHtml { html, images }
}

/// Replaces `<em>`, `<strong>`, `<b>` and `<i>` elements that hold only
/// whitespace or `&nbsp;` with a single space. Nested empty elements collapse
/// from the inside out.
pub fn blank_empty_emphasis(html: &str) -> String {
    let mut current = html.to_string();
    loop {
        match EMPTY_EMPHASIS_ELEMENT_RE.replace_all(&current, " ") {
            Cow::Borrowed(_) => return current,
            Cow::Owned(next) => current = next,
        }
    }
}

/// Rewrites `*   item` list markers as `* item`, keeping any indentation.
pub fn tighten_bullets(markdown: &str) -> String {
    LOOSE_BULLET_RE.replace_all(markdown, "${1}* ${2}").into_owned()
}

/// Converts HTML to Markdown without wrapping lines; links stay inline.
///
/// # Errors
///
/// Returns [`NotebookError::Conversion`] if the transform fails.
pub fn html_to_markdown(html: &str) -> Result<String> {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "head"])
        .build();
    converter
        .convert(html)
        .map_err(|e| NotebookError::Conversion(e.to_string()))
}

/// Re-inserts each protected tag at its placeholder, surrounded by blank lines.
pub fn restore_images(markdown: &str, images: &[String]) -> String {
    let mut restored = markdown.to_string();
    for (index, tag) in images.iter().enumerate() {
        restored = restored.replace(&placeholder(index), &format!("\n\n{tag}\n\n"));
    }
    restored
}

/// Removes `** **`, `__ __` and `_ _` pairs that wrap nothing but whitespace.
pub fn strip_empty_emphasis(markdown: &str) -> String {
    let stripped = EMPTY_STRONG_RE.replace_all(markdown, "${1}${2}");
    EMPTY_EM_RE.replace_all(&stripped, "${1}${2}").into_owned()
}

/// Blanks lines made only of `*` and `_` characters.
///
/// Spaced thematic breaks such as `* * *` are kept.
pub fn drop_marker_only_lines(markdown: &str) -> String {
    MARKER_ONLY_LINE_RE.replace_all(markdown, "").into_owned()
}

/// Collapses runs of blank lines to a single blank line.
pub fn collapse_blank_lines(markdown: &str) -> String {
    BLANK_RUN_RE.replace_all(markdown, "\n\n").into_owned()
}

/// Runs the full pipeline over a node body and trims the result.
///
/// # Errors
///
/// Returns [`NotebookError::Conversion`] if the HTML transform fails.
pub fn convert_body(html: &str) -> Result<String> {
    let protected = protect_sized_images(html);
    let html = blank_empty_emphasis(&protected.html);
    let markdown = html_to_markdown(&html)?;
    let markdown = tighten_bullets(&markdown);
    let markdown = restore_images(&markdown, &protected.images);
    let markdown = strip_empty_emphasis(&markdown);
    let markdown = drop_marker_only_lines(&markdown);
    let markdown = collapse_blank_lines(&markdown);
    Ok(markdown.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZED: &str =
        r#"<img src="data:image/png;base64,123" style="width: 100px; height: 50px;" alt="Resized">"#;

    #[test]
    fn test_protect_sized_images() {
        let html = format!(r#"<p>a {SIZED} b <img src="x.png" alt="plain"> <img src="y.png" width="20"></p>"#);
        let protected = protect_sized_images(&html);

        assert_eq!(protected.images.len(), 2);
        assert_eq!(protected.images[0], SIZED);
        assert_eq!(protected.images[1], r#"<img src="y.png" width="20">"#);
        assert!(protected.html.contains("NBIMGPROTECT0END"));
        assert!(protected.html.contains("NBIMGPROTECT1END"));
        assert!(protected.html.contains(r#"<img src="x.png" alt="plain">"#));
    }

    #[test]
    fn test_protect_ignores_attribute_names_inside_values() {
        let protected = protect_sized_images(r#"<img src="style=big.png" alt="x">"#);
        assert!(protected.images.is_empty());
    }

    #[test]
    fn test_restore_images_isolates_blocks() {
        let images = vec![SIZED.to_string()];
        let restored = restore_images("Check this: NBIMGPROTECT0END", &images);
        assert_eq!(restored, format!("Check this: \n\n{SIZED}\n\n"));
    }

    #[test]
    fn test_restore_distinguishes_multi_digit_indexes() {
        let images: Vec<String> = (0..11).map(|i| format!("<img id=\"{i}\" width=\"1\">")).collect();
        let restored = restore_images("NBIMGPROTECT1END|NBIMGPROTECT10END", &images);
        assert!(restored.contains(r#"<img id="1" width="1">"#));
        assert!(restored.contains(r#"<img id="10" width="1">"#));
    }

    #[test]
    fn test_strip_empty_emphasis() {
        assert_eq!(strip_empty_emphasis("before ** ** after"), "before  after");
        assert_eq!(strip_empty_emphasis("****\ntext"), "\ntext");
        assert_eq!(strip_empty_emphasis("x __  __ y"), "x  y");
        assert_eq!(strip_empty_emphasis("x _ _ y"), "x  y");
    }

    #[test]
    fn test_strip_empty_emphasis_keeps_real_emphasis() {
        assert_eq!(strip_empty_emphasis("**a** **b**"), "**a** **b**");
        assert_eq!(strip_empty_emphasis("_a_ _b_"), "_a_ _b_");
        assert_eq!(strip_empty_emphasis("snake_case_name"), "snake_case_name");
    }

    #[test]
    fn test_drop_marker_only_lines() {
        assert_eq!(drop_marker_only_lines("a\n**\nb"), "a\n\nb");
        assert_eq!(drop_marker_only_lines("a\n  __ \nb"), "a\n\nb");
        assert_eq!(drop_marker_only_lines("a\n* * *\nb"), "a\n* * *\nb");
        assert_eq!(drop_marker_only_lines("*   item"), "*   item");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n \n\t\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_convert_body_bold() {
        let markdown = convert_body("<p>Hello <strong>World</strong></p>").unwrap();
        assert_eq!(markdown, "Hello **World**");
    }

    #[test]
    fn test_convert_body_list() {
        let markdown = convert_body("<ul><li>Item 1</li><li>Item 2</li></ul>").unwrap();
        assert_eq!(markdown, "* Item 1\n* Item 2");
    }

    #[test]
    fn test_convert_body_empty_emphasis_keeps_words_apart() {
        assert_eq!(convert_body("<p>a<em> </em>b</p>").unwrap(), "a b");
        assert_eq!(convert_body("<p>a<strong>&nbsp;</strong>b</p>").unwrap(), "a b");
        assert_eq!(convert_body("<p>a<b><i> </i></b>b</p>").unwrap(), "a b");
    }

    #[test]
    fn test_blank_empty_emphasis() {
        assert_eq!(blank_empty_emphasis("a<em> </em>b"), "a b");
        assert_eq!(blank_empty_emphasis("a<strong class=\"x\">&nbsp;</strong>b"), "a b");
        assert_eq!(blank_empty_emphasis("a<strong><em>\t</em></strong>b"), "a b");
        assert_eq!(blank_empty_emphasis("<em>kept</em><br><img src=\"x\">"), "<em>kept</em><br><img src=\"x\">");
    }

    #[test]
    fn test_tighten_bullets() {
        assert_eq!(tighten_bullets("*   Item 1\n    *   Nested"), "* Item 1\n    * Nested");
        assert_eq!(tighten_bullets("* * *"), "* * *");
        assert_eq!(tighten_bullets("**bold**  text"), "**bold**  text");
    }

    #[test]
    fn test_convert_body_keeps_links() {
        let markdown =
            convert_body(r#"<p>See <a href="https://example.com/docs">the docs</a></p>"#).unwrap();
        assert!(markdown.contains("[the docs](https://example.com/docs)"));
    }

    #[test]
    fn test_convert_body_keeps_sized_image_verbatim() {
        let html = format!("<p>Check this: {SIZED}</p>");
        let markdown = convert_body(&html).unwrap();

        assert!(markdown.contains(&format!("\n\n{SIZED}")));
        assert!(markdown.ends_with(SIZED));
        assert!(!markdown.contains("![Resized]"));
    }

    #[test]
    fn test_convert_body_does_not_wrap_long_lines() {
        let long = "word ".repeat(60);
        let markdown = convert_body(&format!("<p>{long}</p>")).unwrap();
        assert_eq!(markdown.lines().count(), 1);
    }

    #[test]
    fn test_convert_body_empty() {
        assert_eq!(convert_body("").unwrap(), "");
    }
}
