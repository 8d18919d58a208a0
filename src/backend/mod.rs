//! External collaborators
//!
//! Fetching page HTML and summarizing text are the only network-facing
//! operations. Both sit behind traits so the hover orchestrator can be driven
//! by in-memory fakes.

pub mod cache;
pub mod fetch;
pub mod summarizer;
pub mod summary;

pub use cache::{cache_key, CachedSummarizer};
pub use fetch::{fetch_readable_text, FetchResponse, FetchedText, HttpFetcher, PageFetcher};
pub use summarizer::{BackendSummarizer, Summarizer, SummaryResponse, MAX_TEXT_CHARS};
pub use summary::{Confidence, Quote, Summary};
