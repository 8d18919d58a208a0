//! TermsDigest - Legal-Link Detection & Hover Summaries
//!
//! This crate is the engine behind the TermsDigest hover popover: it finds
//! links to legal documents on a page, works out where their text lives,
//! extracts it, and hands it to a summarizer.
//!
//! # Features
//!
//! - **Detection**: Keyword classifier for legal links in any language-mixed markup
//! - **Resolution**: Navigable URLs, framework modals, in-page content, click-to-load
//! - **Modal Discovery**: Ten ordered strategies for locating in-page legal text
//! - **Extraction**: Readable text from fetched HTML or located elements
//! - **Orchestration**: One hover session at a time with epoch-based cancellation
//!
//! # Architecture
//!
//! ```text
//! pointer events ──▶ Orchestrator ──▶ LinkClassifier
//!                        │
//!                        ▼
//!                   LinkResolver ──▶ ModalLocator (in-page)
//!                        │
//!              ┌─────────┴──────────┐
//!              ▼                    ▼
//!        PageFetcher          ContentExtractor
//!              │                    │
//!              └─────────┬──────────┘
//!                        ▼
//!                   Summarizer ──▶ PopoverSink
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use termsdigest::detection::LinkScanner;
//! use termsdigest::dom::Page;
//! use url::Url;
//!
//! let page = Page::parse(
//!     Url::parse("https://shop.example.com/").unwrap(),
//!     r#"<footer><a href="/terms">Terms of Service</a><a href="/blog">Blog</a></footer>"#,
//! );
//!
//! let mut scanner = LinkScanner::new();
//! assert_eq!(scanner.scan(&page).len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backend;
pub mod config;
pub mod detection;
pub mod dom;
pub mod error;
pub mod extraction;
pub mod hover;
pub mod render;

// Re-exports for convenience
pub use backend::{BackendSummarizer, CachedSummarizer, HttpFetcher, Summary};
pub use config::{BackendConfig, OrchestratorConfig, Preferences};
pub use detection::{normalize, ContentType, LinkClassifier, LinkScanner};
pub use dom::{DomHost, ElementHandle, Page, StaticHost};
pub use error::{Error, Result};
pub use extraction::{ContentExtractor, LinkResolver, LinkTarget, ModalLocator};
pub use hover::{Collaborators, Orchestrator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
