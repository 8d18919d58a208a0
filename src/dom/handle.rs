//! Element identity across snapshots
//!
//! A [`NodeId`](ego_tree::NodeId) is an index into one parsed tree and means
//! nothing in the next snapshot. An [`ElementHandle`] remembers what the
//! element looked like instead (tag, `id`, `href`, collapsed text) and which
//! of the identical-looking elements it was, then finds it again in any later
//! snapshot of the same page.

use crate::dom::{query, Page};
use scraper::ElementRef;

/// Snapshot-independent identity of an element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    tag: String,
    id: String,
    href: String,
    text: String,
    ordinal: usize,
}

impl ElementHandle {
    /// Identity of `el`, which must belong to `page`
    pub fn of(page: &Page, el: ElementRef<'_>) -> Self {
        let mut handle = Self {
            tag: query::tag(el).to_string(),
            id: query::id(el).to_string(),
            href: query::attr(el, "href").unwrap_or("").to_string(),
            text: collapsed_text(el),
            ordinal: 0,
        };
        handle.ordinal = elements(page)
            .filter(|candidate| handle.matches(*candidate))
            .position(|candidate| candidate.id() == el.id())
            .unwrap_or(0);
        handle
    }

    /// Find the element again in `page`.
    ///
    /// Elements carrying an `id` are still found by tag and `id` when their
    /// text changed (a button relabelled after a click).
    pub fn resolve<'a>(&self, page: &'a Page) -> Option<ElementRef<'a>> {
        elements(page)
            .filter(|el| self.matches(*el))
            .nth(self.ordinal)
            .or_else(|| {
                if self.id.is_empty() {
                    return None;
                }
                elements(page).find(|el| query::tag(*el) == self.tag && query::id(*el) == self.id)
            })
    }

    /// The element's `id` attribute, or `""`
    pub fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, el: ElementRef<'_>) -> bool {
        query::tag(el) == self.tag
            && query::id(el) == self.id
            && query::attr(el, "href").unwrap_or("") == self.href
            && collapsed_text(el) == self.text
    }
}

fn elements(page: &Page) -> impl Iterator<Item = ElementRef<'_>> + '_ {
    page.document()
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
}

fn collapsed_text(el: ElementRef<'_>) -> String {
    query::text_content(el)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
