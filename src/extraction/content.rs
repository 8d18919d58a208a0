//! Readable text extraction
//!
//! Turns fetched HTML or an in-page subtree into dense, whitespace-normalized
//! text suitable for summarization.

use crate::dom::query;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, instrument, warn};

/// Minimum text for a modal or located element to be worth summarizing
pub const MIN_ELEMENT_TEXT: usize = 50;

/// Minimum text for a selector candidate to count as a locator hit
pub const MIN_CANDIDATE_TEXT: usize = 100;

/// Minimum text for whole-page scans (scored search, hidden modals, frames)
pub const MIN_PAGE_SCAN_TEXT: usize = 200;

/// Elements dropped from fetched pages before measuring text
const PAGE_STRIP_TAGS: &[&str] = &["script", "style", "noscript", "svg", "canvas"];

/// Elements dropped from in-page subtrees
const ELEMENT_STRIP_TAGS: &[&str] = &["script", "style", "noscript"];

/// "Main content" containers, tried in order; the longest text wins
const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    r#"[role="main"]"#,
    "article",
    ".content",
    "#content",
    ".main-content",
    ".page-content",
    ".entry-content",
    ".post-content",
    "body",
];

static MAIN_CONTENT: LazyLock<Vec<Selector>> =
    LazyLock::new(|| query::selectors(MAIN_CONTENT_SELECTORS));

static SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t ]+").expect("BUG: hardcoded regex"));
static SPACE_AROUND_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" *\n *").expect("BUG: hardcoded regex"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("BUG: hardcoded regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("BUG: hardcoded regex"));

/// Extracted text and its length in characters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Cleaned text; empty when below the threshold it was checked against
    pub text: String,
    /// Character count of `text`
    pub length: usize,
}

impl ExtractionResult {
    /// Keep `text` only if it has at least `min_len` characters
    pub fn with_min_length(text: String, min_len: usize) -> Self {
        let length = text.chars().count();
        if length == 0 || length < min_len {
            return Self::default();
        }
        Self { text, length }
    }

    /// Whether nothing qualifying was found
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Text extraction functionality
pub struct ContentExtractor;

impl ContentExtractor {
    /// Extract the readable text of a fetched page.
    ///
    /// Every main-content candidate is measured and the longest cleaned text
    /// is returned, since many sites keep the real policy in a container
    /// other than the first semantic match.
    #[instrument(skip(html), fields(html_len = html.len()))]
    pub fn extract_from_html(html: &str) -> String {
        if html.trim().is_empty() {
            warn!("No HTML provided");
            return String::new();
        }

        let doc = Html::parse_document(html);

        let mut best = String::new();
        for sel in MAIN_CONTENT.iter() {
            let Some(candidate) = doc.select(sel).next() else {
                continue;
            };
            let cleaned = Self::clean_page_text(&query::text_without(candidate, PAGE_STRIP_TAGS));
            if cleaned.chars().count() > best.chars().count() {
                best = cleaned;
            }
        }

        if best.is_empty() {
            best = Self::clean_page_text(&query::text_without(doc.root_element(), PAGE_STRIP_TAGS));
        }

        debug!("Extracted {} chars", best.chars().count());
        best
    }

    /// Extract the text of an in-page subtree, collapsed to single spaces.
    pub fn extract_from_element(el: ElementRef<'_>) -> String {
        Self::collapse_whitespace(&query::text_without(el, ELEMENT_STRIP_TAGS))
    }

    /// Page cleaning: non-breaking spaces, intra-line runs, spaces around
    /// newlines, and runs of blank lines.
    pub fn clean_page_text(raw: &str) -> String {
        let text = raw.replace('\u{a0}', " ");
        let text = SPACES.replace_all(&text, " ");
        let text = SPACE_AROUND_NEWLINE.replace_all(&text, "\n");
        let text = BLANK_LINES.replace_all(&text, "\n\n");
        text.trim().to_string()
    }

    /// Collapse every whitespace run to one space and trim
    pub fn collapse_whitespace(raw: &str) -> String {
        WHITESPACE.replace_all(raw, " ").trim().to_string()
    }
}
