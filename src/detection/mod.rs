//! Legal-link detection
//!
//! Decides whether an interactive element points at legal content and, if
//! so, which kind. Everything here is a pure function of the element's
//! current attributes and text.

pub mod classifier;
pub mod content_type;
pub mod normalize;
pub mod scanner;

pub use classifier::{LinkClassifier, BRAND_NAME, KEYWORDS};
pub use content_type::ContentType;
pub use normalize::normalize;
pub use scanner::LinkScanner;
