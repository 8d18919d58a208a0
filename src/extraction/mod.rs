//! Content extraction module
//!
//! Resolves legal links to a content source, locates in-page content when
//! there is no URL, and turns HTML or subtrees into clean text.

pub mod content;
pub mod links;
pub mod locator;

pub use content::{
    ContentExtractor, ExtractionResult, MIN_CANDIDATE_TEXT, MIN_ELEMENT_TEXT, MIN_PAGE_SCAN_TEXT,
};
pub use links::{LinkResolver, LinkTarget};
pub use locator::{LocateContext, ModalLocator, Strategy, StrategyFn, DEFAULT_STRATEGIES};
