//! Structured summary returned by the summarizer
//!
//! Deserialization is lenient: backends and models often return partial
//! objects, non-string list items or unknown confidence labels.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// How much the summarizer trusts its own output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Verify manually
    Low,
    /// Reasonable summary, some parts unclear
    #[default]
    Medium,
    /// Clear, well-structured legal text
    High,
}

impl Confidence {
    /// Parse a label; anything unrecognized is `Medium`
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Confidence::Low,
            "high" => Confidence::High,
            _ => Confidence::Medium,
        }
    }

    /// Lowercase label
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A quoted clause and why it matters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quote {
    /// Verbatim text from the document
    #[serde(deserialize_with = "lenient_string")]
    pub quote: String,
    /// Short explanation
    #[serde(deserialize_with = "lenient_string")]
    pub why_it_matters: String,
}

/// Summary of a legal document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Summary {
    /// Document title
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    /// One-paragraph overview
    #[serde(deserialize_with = "lenient_string")]
    pub tldr: String,
    /// Prices, renewals, auto-billing
    #[serde(deserialize_with = "string_list")]
    pub costs_and_renewal: Vec<String>,
    /// How to cancel and get money back
    #[serde(deserialize_with = "string_list")]
    pub cancellation_and_refunds: Vec<String>,
    /// Liability limits, arbitration, governing law
    #[serde(deserialize_with = "string_list")]
    pub liability_and_disputes: Vec<String>,
    /// Data collection and sharing
    #[serde(deserialize_with = "string_list")]
    pub privacy_and_data: Vec<String>,
    /// Clauses worth a second look
    #[serde(deserialize_with = "string_list")]
    pub red_flags: Vec<String>,
    /// Supporting quotes
    #[serde(deserialize_with = "quote_list")]
    pub quotes: Vec<Quote>,
    /// Self-reported confidence
    #[serde(deserialize_with = "lenient_confidence")]
    pub confidence: Confidence,
    /// Set when the model output could not be parsed
    #[serde(rename = "_note", skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Summary {
    /// Interpret raw model text.
    ///
    /// Markdown code fences are removed before parsing. Text that is not a
    /// JSON summary becomes a low-confidence summary whose `tldr` is the raw
    /// output.
    pub fn from_model_output(raw: &str) -> Self {
        let trimmed = raw.trim();
        let cleaned = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .unwrap_or(trimmed);
        let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned).trim();

        match serde_json::from_str::<Summary>(cleaned) {
            Ok(summary) => summary,
            Err(e) => {
                tracing::debug!("Model output is not a JSON summary: {}", e);
                Summary {
                    tldr: trimmed.to_string(),
                    confidence: Confidence::Low,
                    note: Some("Model did not return valid JSON; showing raw output.".to_string()),
                    ..Summary::default()
                }
            }
        }
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}

fn quote_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Quote>, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn lenient_confidence<'de, D: Deserializer<'de>>(d: D) -> Result<Confidence, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(value.as_str().map(Confidence::parse).unwrap_or_default())
}
