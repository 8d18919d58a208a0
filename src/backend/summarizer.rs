//! Summarization collaborator

use crate::backend::summary::Summary;
use crate::config::BackendConfig;
use crate::error::{Error, Result, SummarizeError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, instrument, warn};

/// Largest text sent for summarization, in characters
pub const MAX_TEXT_CHARS: usize = 45_000;

/// Longest slice of an error body quoted back to the user
const MAX_ERROR_BODY_CHARS: usize = 200;

/// A summary plus whether it came from a cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResponse {
    /// The summary
    pub summary: Summary,
    /// Served without calling the backend
    pub from_cache: bool,
}

impl SummaryResponse {
    /// A freshly generated summary
    pub fn fresh(summary: Summary) -> Self {
        Self {
            summary,
            from_cache: false,
        }
    }
}

/// Produces summaries for extracted text
///
/// `key` identifies the content (a URL, or a page URL with a `#link:` suffix
/// for in-page content). Failures carry a user-facing message.
#[async_trait(?Send)]
pub trait Summarizer {
    /// Summarize `text`
    async fn summarize(
        &self,
        key: &str,
        text: &str,
    ) -> std::result::Result<SummaryResponse, SummarizeError>;
}

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    url: &'a str,
    text: &'a str,
}

/// Summarizer backed by the TermsDigest API
#[derive(Debug, Clone)]
pub struct BackendSummarizer {
    client: Client,
    config: BackendConfig,
}

impl BackendSummarizer {
    /// Create a summarizer for `config`
    pub fn new(config: BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::generic(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// The backend settings
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }
}

/// First `max` characters of `text`
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// `key` with any URL fragment removed
fn page_url(key: &str) -> &str {
    key.split_once('#').map_or(key, |(base, _)| base)
}

fn parse_summary(body: serde_json::Value) -> std::result::Result<Summary, SummarizeError> {
    let inner = match body {
        serde_json::Value::Object(mut map) => match map.remove("summary") {
            Some(summary) if !summary.is_null() => summary,
            _ => serde_json::Value::Object(map),
        },
        other => other,
    };

    match inner {
        serde_json::Value::String(raw) => Ok(Summary::from_model_output(&raw)),
        value => serde_json::from_value(value)
            .map_err(|e| SummarizeError::backend(format!("Invalid summary response: {e}"))),
    }
}

#[async_trait(?Send)]
impl Summarizer for BackendSummarizer {
    #[instrument(skip_all, fields(key = %key, text_len = text.len()))]
    async fn summarize(
        &self,
        key: &str,
        text: &str,
    ) -> std::result::Result<SummaryResponse, SummarizeError> {
        let Some(token) = self.config.token.as_deref() else {
            return Err(SummarizeError::backend(
                "No API access. Please login to subscribe or add your own OpenAI API key in Settings.",
            ));
        };

        let text = truncate_chars(text, MAX_TEXT_CHARS);
        if text.trim().is_empty() {
            return Err(SummarizeError::backend("No text extracted from page."));
        }

        let request = SummarizeRequest {
            url: page_url(key),
            text,
        };
        let response = self
            .client
            .post(self.config.summarize_url())
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Backend request failed: {}", e);
                SummarizeError::backend(format!("Backend request failed: {e}"))
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SummarizeError::backend("Session expired. Please login again."));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::backend(format!(
                "Backend error ({}): {}",
                status.as_u16(),
                truncate_chars(&body, MAX_ERROR_BODY_CHARS)
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SummarizeError::backend(format!("Invalid summary response: {e}")))?;
        let summary = parse_summary(body)?;
        debug!("Summary received ({} confidence)", summary.confidence);
        Ok(SummaryResponse::fresh(summary))
    }
}
