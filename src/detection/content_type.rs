//! Legal content categories

use crate::detection::normalize::normalize;
use crate::dom::query;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of legal document an element points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Privacy policy / statement / notice
    Privacy,
    /// Terms of service, terms & conditions, EULA
    Terms,
    /// Cookie policy
    Cookie,
    /// Security policy
    Security,
    /// Refund, return and cancellation policies
    Refund,
    /// Anything else legal
    Legal,
}

impl ContentType {
    /// Classify an element from its visible text and id.
    ///
    /// Checked in a fixed order and the first family that matches wins:
    /// privacy, terms, cookie, security, refund, then generic legal.
    pub fn classify(el: ElementRef<'_>) -> Self {
        let text = format!(
            "{} {}",
            normalize(query::text_content(el).as_str()),
            normalize(query::id(el))
        );
        Self::from_text(&text)
    }

    /// Classify already-normalized text
    pub fn from_text(text: &str) -> Self {
        let any = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

        if any(&["privacy", "privacystatement", "privacy-statement"]) {
            ContentType::Privacy
        } else if any(&["terms", "termsandconditions", "conditions", "eula"]) {
            ContentType::Terms
        } else if any(&["cookie"]) {
            ContentType::Cookie
        } else if any(&["security"]) {
            ContentType::Security
        } else if any(&["refund", "cancellation", "return"]) {
            ContentType::Refund
        } else {
            ContentType::Legal
        }
    }

    /// Token used when matching class names and ids
    pub fn keyword(self) -> &'static str {
        match self {
            ContentType::Privacy => "privacy",
            ContentType::Terms => "terms",
            ContentType::Cookie => "cookie",
            ContentType::Security => "security",
            ContentType::Refund => "refund",
            ContentType::Legal => "legal",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
