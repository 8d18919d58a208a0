//! Page-wide legal-link scan
//!
//! Finds every interactive element that passes the classifier and reports
//! each one only once, so callers can highlight links as they appear without
//! re-processing elements they already decorated. Reported links are
//! remembered by [`ElementHandle`], so the scan can be repeated on every new
//! snapshot of a mutating page.

use crate::detection::classifier::{LinkClassifier, INTERACTIVE};
use crate::dom::{ElementHandle, Page};
use ego_tree::NodeId;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Highlight-once scanner
#[derive(Debug, Default)]
pub struct LinkScanner {
    classifier: LinkClassifier,
    seen: HashSet<ElementHandle>,
}

impl LinkScanner {
    /// Scanner using the default classifier
    pub fn new() -> Self {
        Self::default()
    }

    /// Scanner using a specific classifier
    pub fn with_classifier(classifier: LinkClassifier) -> Self {
        Self {
            classifier,
            seen: HashSet::new(),
        }
    }

    /// Legal links not reported by an earlier scan, in document order
    #[instrument(skip_all, fields(url = %page.url()))]
    pub fn scan(&mut self, page: &Page) -> Vec<NodeId> {
        let mut found = Vec::new();
        for el in page.select_all(&INTERACTIVE) {
            if !self.classifier.is_legal_link(el) {
                continue;
            }
            if self.seen.insert(ElementHandle::of(page, el)) {
                found.push(el.id());
            }
        }
        debug!("Found {} new legal links", found.len());
        found
    }

    /// Whether the element at `id` in `page` was already reported
    pub fn is_seen(&self, page: &Page, id: NodeId) -> bool {
        page.element(id)
            .is_some_and(|el| self.seen.contains(&ElementHandle::of(page, el)))
    }

    /// Forget everything (navigated to a new document)
    pub fn reset(&mut self) {
        self.seen.clear();
    }
}
