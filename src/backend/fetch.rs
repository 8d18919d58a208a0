//! Page fetching
//!
//! The fetch collaborator reports failures as `ok = false` with a status code
//! instead of an error, so a blocked site and an unreachable one look the same
//! to callers: a status to show the user.

use crate::error::{Error, ExtractionError, FetchError, Result};
use crate::extraction::{ContentExtractor, ExtractionResult, MIN_ELEMENT_TEXT};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.5";

/// Outcome of fetching a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    /// Whether the status was 2xx
    pub ok: bool,
    /// HTTP status; 0 when no response arrived
    pub status: u16,
    /// URL after redirects
    pub final_url: String,
    /// Response body
    pub html: String,
    /// `Content-Type` header, or `""`
    pub content_type: String,
}

impl FetchResponse {
    /// A fetch that produced no response
    pub fn failed(url: &Url) -> Self {
        Self {
            ok: false,
            status: 0,
            final_url: url.to_string(),
            ..Self::default()
        }
    }

    /// Successful response with an HTML body
    pub fn html<S: Into<String>>(url: &Url, html: S) -> Self {
        Self {
            ok: true,
            status: 200,
            final_url: url.to_string(),
            html: html.into(),
            content_type: "text/html".to_string(),
        }
    }

    /// Convert a non-success response into an error
    pub fn error_for_status(self) -> std::result::Result<Self, FetchError> {
        if self.ok {
            Ok(self)
        } else {
            Err(FetchError::Status {
                status: self.status,
            })
        }
    }
}

/// Fetches raw page HTML
#[async_trait(?Send)]
pub trait PageFetcher {
    /// Fetch `url`.
    ///
    /// HTTP failures come back as `ok = false`; `Err` means the fetcher
    /// itself could not be used.
    async fn fetch_page(&self, url: &Url) -> std::result::Result<FetchResponse, FetchError>;
}

/// Page fetcher over HTTP
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with a request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("termsdigest/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| Error::generic(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Use an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait(?Send)]
impl PageFetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch_page(&self, url: &Url) -> std::result::Result<FetchResponse, FetchError> {
        let mut url = url.clone();
        url.set_fragment(None);

        let response = match self
            .client
            .get(url.clone())
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_VALUE)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Request failed: {}", e);
                return Ok(FetchResponse::failed(&url));
            }
        };

        let status = response.status();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let html = response.text().await.map_err(|e| {
            warn!("Failed to read body: {}", e);
            FetchError::Unreachable
        })?;

        info!("Fetched {} ({}, {} bytes)", final_url, status, html.len());
        Ok(FetchResponse {
            ok: status.is_success(),
            status: status.as_u16(),
            final_url,
            html,
            content_type,
        })
    }
}

/// Readable text of a fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedText {
    /// URL after redirects
    pub final_url: String,
    /// Extracted text and its length
    pub content: ExtractionResult,
    /// Size in characters of the HTML the text came from
    pub html_len: usize,
}

/// Fetch `url` and extract its readable text.
///
/// A non-2xx status is a [`FetchError`]; a page whose text is shorter than
/// [`MIN_ELEMENT_TEXT`] is [`ExtractionError::Unreadable`], which usually
/// means a script-rendered or blocked page rather than a network problem.
pub async fn fetch_readable_text(fetcher: &dyn PageFetcher, url: &Url) -> Result<FetchedText> {
    let response = fetcher.fetch_page(url).await?.error_for_status()?;
    let final_url = if response.final_url.is_empty() {
        url.to_string()
    } else {
        response.final_url
    };

    let html_len = response.html.chars().count();
    let text = ContentExtractor::extract_from_html(&response.html);
    let content = ExtractionResult::with_min_length(text, MIN_ELEMENT_TEXT);
    if content.is_empty() {
        return Err(ExtractionError::Unreadable { html_len }.into());
    }

    debug!("{} chars of text from {}", content.length, final_url);
    Ok(FetchedText {
        final_url,
        content,
        html_len,
    })
}
