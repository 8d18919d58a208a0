//! Presentation boundary
//!
//! The orchestrator never builds markup. It calls a [`PopoverSink`], and the
//! helpers here turn summaries and error messages into view models a sink can
//! draw however it likes.

use crate::backend::{Confidence, Quote, Summary};
use crate::config::Preferences;
use ego_tree::NodeId;
use std::cell::RefCell;
use std::fmt;

/// Most items shown per summary section
pub const MAX_SECTION_ITEMS: usize = 6;

/// Most quotes shown
pub const MAX_QUOTES: usize = 3;

/// Receives what the popover should show
pub trait PopoverSink {
    /// Work started for `url`
    fn loading(&self, url: &str);

    /// A summary is ready
    fn summary(&self, summary: &Summary, url: &str, from_cache: bool);

    /// A step failed; `message` is user-facing
    fn error(&self, message: &str, url: &str);

    /// Content only appears after clicking `anchor`
    fn click_to_load(&self, anchor: NodeId, label: &str);

    /// Hide and clear the popover
    fn hide(&self);
}

/// Something a sink was asked to show
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// Loading indicator
    Loading(String),
    /// Summary
    Summary {
        /// The summary
        summary: Summary,
        /// Source shown with it
        url: String,
        /// Served from cache
        from_cache: bool,
    },
    /// Error
    Error {
        /// User-facing message
        message: String,
        /// Source the error relates to
        url: String,
    },
    /// Click-to-load offer
    ClickToLoad {
        /// Element to click
        anchor: NodeId,
        /// Its visible label
        label: String,
    },
    /// Popover hidden
    Hidden,
}

/// Sink that records every call, for headless embedding and tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<Rendered>>,
}

impl RecordingSink {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything rendered so far
    pub fn events(&self) -> Vec<Rendered> {
        self.events.borrow().clone()
    }

    /// Most recent event
    pub fn last(&self) -> Option<Rendered> {
        self.events.borrow().last().cloned()
    }

    /// Summaries rendered so far
    pub fn summaries(&self) -> Vec<Summary> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Rendered::Summary { summary, .. } => Some(summary.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Rendered) {
        self.events.borrow_mut().push(event);
    }
}

impl PopoverSink for RecordingSink {
    fn loading(&self, url: &str) {
        self.push(Rendered::Loading(url.to_string()));
    }

    fn summary(&self, summary: &Summary, url: &str, from_cache: bool) {
        self.push(Rendered::Summary {
            summary: summary.clone(),
            url: url.to_string(),
            from_cache,
        });
    }

    fn error(&self, message: &str, url: &str) {
        self.push(Rendered::Error {
            message: message.to_string(),
            url: url.to_string(),
        });
    }

    fn click_to_load(&self, anchor: NodeId, label: &str) {
        self.push(Rendered::ClickToLoad {
            anchor,
            label: label.to_string(),
        });
    }

    fn hide(&self) {
        self.push(Rendered::Hidden);
    }
}

/// Recovery action offered with an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remediation {
    /// The host page must be reloaded
    RefreshPage,
    /// The user must sign in again
    SignIn,
    /// The plan's quota is used up
    Upgrade,
    /// Nothing specific; offer settings
    None,
}

/// Error view: header, message and actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    /// Popover header
    pub title: &'static str,
    /// Message shown to the user
    pub message: String,
    /// Primary recovery action
    pub remediation: Remediation,
    /// Offer to open the original link
    pub offer_original_link: bool,
}

impl ErrorNotice {
    /// Classify an error message by what it mentions.
    ///
    /// Summarizer errors arrive as plain strings, so this is substring
    /// matching; a backend with typed error codes should map those instead.
    pub fn from_message(message: &str) -> Self {
        let message = if message.trim().is_empty() {
            "Unknown error"
        } else {
            message
        };
        let has = |needles: &[&str]| needles.iter().any(|n| message.contains(n));

        if has(&["Extension context invalidated", "message port closed"]) {
            Self::new("Summary unavailable", "Extension needs page refresh", Remediation::RefreshPage)
        } else if has(&["No API access", "Please login", "sign in"]) {
            Self::new("Sign in required", "Please sign in to continue", Remediation::SignIn)
        } else if has(&["Quota exceeded", "quotaExceeded"]) {
            Self::new("Usage limit reached", "You've hit your usage limit", Remediation::Upgrade)
        } else if has(&["Session expired", "Invalid JWT", "401", "Unauthorized"]) {
            Self::new("Sign in required", "Session expired", Remediation::SignIn)
        } else {
            Self::new("Summary unavailable", message, Remediation::None)
        }
    }

    fn new(title: &'static str, message: &str, remediation: Remediation) -> Self {
        Self {
            title,
            message: message.to_string(),
            remediation,
            offer_original_link: remediation != Remediation::Upgrade,
        }
    }
}

/// A titled list of summary points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Heading
    pub heading: &'static str,
    /// Points, at most [`MAX_SECTION_ITEMS`]
    pub items: Vec<String>,
}

/// Summary view model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryView {
    /// Title, `"Summary"` when the model gave none
    pub title: String,
    /// Confidence level
    pub confidence: Confidence,
    /// Badge text, e.g. `"medium • cached"`
    pub badge: String,
    /// Explanation of the confidence level
    pub badge_tooltip: &'static str,
    /// One-paragraph overview
    pub tldr: String,
    /// Non-empty sections in display order
    pub sections: Vec<Section>,
    /// Quotes, at most [`MAX_QUOTES`]
    pub quotes: Vec<Quote>,
}

fn clean_items(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(MAX_SECTION_ITEMS)
        .map(str::to_string)
        .collect()
}

/// Tooltip explaining a confidence level
pub fn confidence_tooltip(confidence: Confidence) -> &'static str {
    match confidence {
        Confidence::High => "High confidence: Clear, well-structured legal text found",
        Confidence::Medium => {
            "Medium confidence: Reasonable summary but some parts may be unclear"
        }
        Confidence::Low => "Low confidence: AI struggled with this page, verify manually",
    }
}

impl SummaryView {
    /// Build the view, applying display preferences
    pub fn new(summary: &Summary, prefs: &Preferences, from_cache: bool) -> Self {
        let title = match summary.title.trim() {
            "" => "Summary".to_string(),
            t => t.to_string(),
        };
        let confidence = summary.confidence;
        let badge = if from_cache {
            format!("{} • cached", confidence)
        } else {
            confidence.to_string()
        };

        let mut lists: Vec<(&'static str, &[String])> = vec![
            ("Costs & renewal", summary.costs_and_renewal.as_slice()),
            ("Cancellation & refunds", summary.cancellation_and_refunds.as_slice()),
            ("Liability & disputes", summary.liability_and_disputes.as_slice()),
            ("Privacy & data", summary.privacy_and_data.as_slice()),
        ];
        if prefs.show_red_flags {
            lists.push(("Red flags", summary.red_flags.as_slice()));
        }
        let sections = lists
            .into_iter()
            .map(|(heading, items)| Section {
                heading,
                items: clean_items(items),
            })
            .filter(|s| !s.items.is_empty())
            .collect();

        let quotes = if prefs.show_quotes {
            summary
                .quotes
                .iter()
                .map(|q| Quote {
                    quote: q.quote.trim().to_string(),
                    why_it_matters: q.why_it_matters.trim().to_string(),
                })
                .filter(|q| !q.quote.is_empty())
                .take(MAX_QUOTES)
                .collect()
        } else {
            Vec::new()
        };

        Self {
            title,
            confidence,
            badge,
            badge_tooltip: confidence_tooltip(confidence),
            tldr: summary.tldr.trim().to_string(),
            sections,
            quotes,
        }
    }
}

impl fmt::Display for SummaryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}]", self.title, self.badge)?;
        if !self.tldr.is_empty() {
            writeln!(f)?;
            writeln!(f, "{}", self.tldr)?;
        }
        for section in &self.sections {
            writeln!(f)?;
            writeln!(f, "{}:", section.heading)?;
            for item in &section.items {
                writeln!(f, "  - {}", item)?;
            }
        }
        if !self.quotes.is_empty() {
            writeln!(f)?;
            writeln!(f, "Supporting quotes:")?;
            for q in &self.quotes {
                if q.why_it_matters.is_empty() {
                    writeln!(f, "  \"{}\"", q.quote)?;
                } else {
                    writeln!(f, "  \"{}\" ({})", q.quote, q.why_it_matters)?;
                }
            }
        }
        Ok(())
    }
}
