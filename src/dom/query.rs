//! Element query helpers
//!
//! Thin, total wrappers over `scraper` so the heuristics never have to deal
//! with missing attributes or unparsable selectors as special cases.

use scraper::{ElementRef, Selector};
use tracing::trace;

/// Parse a CSS selector, returning `None` when the selector is invalid.
///
/// Guessed selectors (built from element ids or attribute values) are often
/// invalid CSS; they are skipped rather than treated as errors.
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            trace!("Skipping invalid selector {:?}: {}", css, e);
            None
        }
    }
}

/// Parse a list of hard-coded selectors, dropping any that fail.
pub fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter().filter_map(|css| selector(css)).collect()
}

/// Attribute value, if present
pub fn attr<'a>(el: ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value().attr(name)
}

/// First non-empty value among the given attributes, or `""`.
///
/// Mirrors `el.getAttribute(a) || el.getAttribute(b) || ""`.
pub fn first_attr<'a>(el: ElementRef<'a>, names: &[&str]) -> &'a str {
    names
        .iter()
        .filter_map(|name| attr(el, name))
        .find(|value| !value.is_empty())
        .unwrap_or("")
}

/// Lowercase tag name
pub fn tag(el: ElementRef<'_>) -> &str {
    el.value().name()
}

/// The `id` attribute, or `""`
pub fn id(el: ElementRef<'_>) -> &str {
    attr(el, "id").unwrap_or("")
}

/// The raw `class` attribute, or `""`
pub fn class_name(el: ElementRef<'_>) -> &str {
    attr(el, "class").unwrap_or("")
}

/// Concatenation of every descendant text node (DOM `textContent`).
pub fn text_content(el: ElementRef<'_>) -> String {
    el.text().collect()
}

/// `textContent` with the subtrees of the given tags left out.
///
/// The live tree is never touched; skipping during traversal has the same
/// effect as cloning the subtree and removing those elements.
pub fn text_without(el: ElementRef<'_>, skip_tags: &[&str]) -> String {
    let mut out = String::new();
    collect_text(el, skip_tags, &mut out);
    out
}

fn collect_text(el: ElementRef<'_>, skip_tags: &[&str], out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if !skip_tags.contains(&tag(child_el)) {
                collect_text(child_el, skip_tags, out);
            }
        }
    }
}

/// Number of characters in the trimmed text content
pub fn text_len(el: ElementRef<'_>) -> usize {
    text_content(el).trim().chars().count()
}

/// Parent element, skipping the document node
pub fn parent_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.parent().and_then(ElementRef::wrap)
}

/// Nearest inclusive ancestor matching `sel` (DOM `closest`).
pub fn closest<'a>(el: ElementRef<'a>, sel: &Selector) -> Option<ElementRef<'a>> {
    std::iter::successors(Some(el), |current| parent_element(*current)).find(|e| sel.matches(e))
}

/// Best-effort visibility test from markup alone.
///
/// Without layout, an element counts as hidden when it or an ancestor carries
/// the `hidden` attribute, `aria-hidden="true"`, or an inline
/// `display:none`/`visibility:hidden` style.
pub fn is_hidden(el: ElementRef<'_>) -> bool {
    std::iter::successors(Some(el), |current| parent_element(*current)).any(|e| {
        if attr(e, "hidden").is_some() || attr(e, "aria-hidden") == Some("true") {
            return true;
        }
        let style: String = attr(e, "style")
            .unwrap_or("")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first<'a>(doc: &'a Html, css: &str) -> ElementRef<'a> {
        doc.select(&Selector::parse(css).unwrap()).next().unwrap()
    }

    #[test]
    fn test_invalid_selector_is_none() {
        assert!(selector("#123-bad[").is_none());
        assert!(selector("#terms-modal").is_some());
    }

    #[test]
    fn test_first_attr_skips_empty() {
        let doc = Html::parse_fragment(r#"<a href="" data-href="/terms">Terms</a>"#);
        let a = first(&doc, "a");
        assert_eq!(first_attr(a, &["href", "data-href"]), "/terms");
        assert_eq!(first_attr(a, &["data-url", "data-link"]), "");
    }

    #[test]
    fn test_text_without_skips_scripts() {
        let doc = Html::parse_fragment(
            "<div>Keep <script>drop()</script>this<style>.x{}</style> text</div>",
        );
        let div = first(&doc, "div");
        assert_eq!(text_without(div, &["script", "style"]), "Keep this text");
        assert!(text_content(div).contains("drop()"));
    }

    #[test]
    fn test_closest_includes_self() {
        let doc = Html::parse_fragment("<pre><code><a href='/t'>terms</a></code></pre>");
        let a = first(&doc, "a");
        let code = Selector::parse("pre").unwrap();
        assert_eq!(tag(closest(a, &code).unwrap()), "pre");
        let anchor = Selector::parse("a").unwrap();
        assert_eq!(closest(a, &anchor), Some(a));
    }

    #[test]
    fn test_is_hidden() {
        let doc = Html::parse_fragment(
            r#"<div style="display: none"><p id="a">x</p></div><p id="b">y</p><p id="c" hidden>z</p>"#,
        );
        assert!(is_hidden(first(&doc, "#a")));
        assert!(!is_hidden(first(&doc, "#b")));
        assert!(is_hidden(first(&doc, "#c")));
    }
}
