//! Legal-link classification
//!
//! A link qualifies when its label, accessible name, title, target or id
//! mention one of [`KEYWORDS`] after normalization. Elements inside code
//! samples and our own branding are excluded up front.

use crate::detection::normalize::normalize;
use crate::dom::query;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use tracing::trace;

/// Product name stripped from candidate text before matching
pub const BRAND_NAME: &str = "termsdigest";

/// Phrases that mark an element as pointing at legal content
pub const KEYWORDS: &[&str] = &[
    "terms",
    "terms of service",
    "terms & conditions",
    "terms and conditions",
    "t&c",
    "t & c",
    "privacy",
    "privacy policy",
    "privacy statement",
    "refund",
    "refund policy",
    "return",
    "returns",
    "return policy",
    "exchange",
    "exchanges",
    "cancellation",
    "cancellation policy",
    "billing",
    "subscription",
    "eula",
    "end user license",
    "licence agreement",
    "license agreement",
    "legal",
    "legal notice",
    "cookie policy",
    "data protection",
];

/// Visible labels longer than this are paragraphs, not link labels
pub const MAX_LABEL_CHARS: usize = 100;

/// Elements a user can hover as a link or button
pub static INTERACTIVE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a, button, [role="link"], [role="button"], [onclick]"#)
        .expect("BUG: hardcoded interactive selector")
});

static CODE_CONTAINER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"pre, code, .hljs, .highlight, .prism-code, [class*="code"], [class*="syntax"]"#,
    )
    .expect("BUG: hardcoded code container selector")
});

const CODE_CLASS_MARKERS: &[&str] = &["code", "syntax", "hljs", "prism"];

/// Whether lowercased text mentions any legal keyword
pub fn contains_legal_keyword(text: &str) -> bool {
    KEYWORDS.iter().any(|k| text.contains(k))
}

/// Legal-link predicate
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    brand: String,
}

impl Default for LinkClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkClassifier {
    /// Classifier that strips [`BRAND_NAME`]
    pub fn new() -> Self {
        Self::with_brand(BRAND_NAME)
    }

    /// Classifier that strips a different product name
    pub fn with_brand<S: AsRef<str>>(brand: S) -> Self {
        Self {
            brand: normalize(brand.as_ref()),
        }
    }

    /// Nearest inclusive ancestor that is a link, button or clickable element
    pub fn interactive_ancestor(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
        query::closest(el, &INTERACTIVE)
    }

    /// Anchors, buttons, link/button roles and `onclick` elements
    pub fn is_eligible(el: ElementRef<'_>) -> bool {
        let role = query::attr(el, "role").unwrap_or("");
        matches!(query::tag(el), "a" | "button")
            || role == "link"
            || role == "button"
            || query::attr(el, "onclick").is_some()
    }

    /// Inside a code sample, or styled as one
    pub fn is_code_like(el: ElementRef<'_>) -> bool {
        if query::closest(el, &CODE_CONTAINER).is_some() {
            return true;
        }
        let class = query::class_name(el).to_lowercase();
        CODE_CLASS_MARKERS.iter().any(|m| class.contains(m))
    }

    /// Decide whether `el` is likely a link to legal content.
    pub fn is_legal_link(&self, el: ElementRef<'_>) -> bool {
        if !Self::is_eligible(el) || Self::is_code_like(el) {
            return false;
        }

        let href = query::first_attr(el, &["href", "data-href"]);
        if query::tag(el) == "a" && href == "#" {
            return false;
        }

        let label = normalize(query::text_content(el).as_str());
        let combined = format!(
            "{} {} {} {} {}",
            label,
            normalize(query::attr(el, "aria-label")),
            normalize(query::attr(el, "title")),
            normalize(href),
            normalize(query::id(el)),
        );

        if combined.trim().is_empty() {
            return false;
        }
        if label.chars().count() > MAX_LABEL_CHARS {
            trace!("Label too long for a link ({} chars)", label.chars().count());
            return false;
        }

        let combined = if self.brand.is_empty() {
            combined
        } else {
            combined.replace(&self.brand, "")
        };
        contains_legal_keyword(&combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn check(html: &str) -> bool {
        let doc = Html::parse_fragment(html);
        let el = doc
            .select(&Selector::parse("#t").unwrap())
            .next()
            .expect("fixture needs #t");
        LinkClassifier::new().is_legal_link(el)
    }

    #[test]
    fn test_plain_terms_link() {
        assert!(check(r#"<a id="t" href="/terms">Terms of Service</a>"#));
    }

    #[test]
    fn test_bare_hash_rejected() {
        assert!(!check(r##"<a id="t" href="#">Privacy Policy</a>"##));
    }

    #[test]
    fn test_javascript_href_allowed() {
        assert!(check(r#"<a id="t" href="javascript:void(0)">Privacy Policy</a>"#));
    }

    #[test]
    fn test_code_block_rejected() {
        assert!(!check(r#"<pre><a id="t" href="/x">terms and conditions</a></pre>"#));
        assert!(!check(r#"<code><button id="t">return</button></code>"#));
        assert!(!check(r#"<button id="t" class="hljs-keyword">return</button>"#));
    }

    #[test]
    fn test_non_interactive_rejected() {
        assert!(!check(r#"<span id="t">Terms of Service</span>"#));
        assert!(check(r#"<span id="t" role="button">Terms of Service</span>"#));
        assert!(check(r#"<div id="t" onclick="openTerms()">Terms</div>"#));
    }

    #[test]
    fn test_long_label_rejected() {
        let para = "By continuing you agree to the terms that govern this site and every other thing we could think of writing here today";
        assert!(!check(&format!(r#"<a id="t" href="/x">{}</a>"#, para)));
    }

    #[test]
    fn test_brand_stripped() {
        assert!(!check(r#"<a id="t" href="https://termsdigest.com/">TermsDigest</a>"#));
        assert!(check(r#"<a id="t" href="/tos">TermsDigest Terms of Service</a>"#));
    }

    #[test]
    fn test_attribute_matches() {
        assert!(check(r#"<a id="t" href="/p" aria-label="Privacy Policy">🔒</a>"#));
        assert!(check(r#"<button id="t" data-href="/legal/refund-policy">Read</button>"#));
        assert!(check(r#"<a id="t" href="/x"><span>Terms&amp;Conditions</span></a>"#));
    }
}
