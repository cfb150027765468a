//! Hyperlink span detection for rich-text link facets.
//!
//! Offsets are byte positions in the UTF-8 encoding of the text, which is
//! what the AT Protocol facet index expects.

use std::sync::LazyLock;

use regex::Regex;

/// Bare `http`/`https` URL up to the next space, tab, CR or LF.
static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^ \t\r\n]*").expect("URL pattern is valid"));

/// A URL and where it sits in the encoded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpan {
    pub url: String,
    pub byte_start: usize,
    pub byte_end: usize,
}

/// Find every bare URL in `text`, left to right.
///
/// Matches never overlap. No normalisation or deduplication is done.
pub fn locate_links(text: &str) -> Vec<LinkSpan> {
    URL_REGEX
        .find_iter(text)
        .map(|m| LinkSpan {
            url: m.as_str().to_string(),
            byte_start: m.start(),
            byte_end: m.end(),
        })
        .collect()
}
