//! Error types for TermsDigest
//!
//! This module provides the error hierarchy using `thiserror`. The display
//! strings of the per-step errors are the messages shown in the popover, so
//! they are written for end users rather than for logs.

use thiserror::Error;

/// The main error type for TermsDigest operations
#[derive(Error, Debug)]
pub enum Error {
    /// Page fetch errors
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Content extraction errors
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Summarizer errors
    #[error(transparent)]
    Summarize(#[from] SummarizeError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Failures while obtaining a page's HTML
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The collaborator could not be reached at all
    #[error("Failed to fetch page HTML.")]
    Unreachable,

    /// The page answered with a non-success status (0 when no response arrived)
    #[error("Fetch failed ({}). This site may block automated access.", status_label(*.status))]
    Status {
        /// HTTP status code
        status: u16,
    },
}

fn status_label(status: u16) -> String {
    if status == 0 {
        "?".to_string()
    } else {
        status.to_string()
    }
}

/// Failures while turning a page or element into readable text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// A framework modal selector matched nothing
    #[error("Could not find modal element \"{0}\" on this page.")]
    ModalNotFound(String),

    /// The modal exists but holds too little text
    #[error("Modal appears to be empty or has very little content.")]
    EmptyModal,

    /// A located element holds too little text
    #[error("Content appears to be empty or has very little text.")]
    EmptyElement,

    /// Fetched HTML yielded no usable text
    #[error("Could not extract readable text. HTML received: {html_len} chars. The page may require JavaScript or be blocked.")]
    Unreadable {
        /// Length of the HTML that was received
        html_len: usize,
    },

    /// The click-and-retry path still found nothing
    #[error("Content still not found after clicking. The page may use a different loading mechanism.")]
    NotFoundAfterClick,

    /// The anchor disappeared from the page between hover and extraction
    #[error("The hovered element is no longer on the page.")]
    AnchorDetached,
}

/// Failures reported by the summarizer collaborator
///
/// Backend messages are carried verbatim: the presentation layer pattern-matches
/// on them to offer remediation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SummarizeError {
    /// Opaque failure message from the summarizer
    #[error("{0}")]
    Backend(String),
}

impl SummarizeError {
    /// Create a backend error from a message
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        SummarizeError::Backend(msg.into())
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is missing
    #[error("{0} environment variable not set")]
    MissingVar(&'static str),

    /// A value could not be parsed
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// Setting name
        key: &'static str,
        /// Parse failure detail
        message: String,
    },

    /// Preferences file could not be read or parsed
    #[error("Could not load preferences from {path}: {message}")]
    Preferences {
        /// File path
        path: String,
        /// Failure detail
        message: String,
    },
}

/// Result type alias for TermsDigest operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }
}
