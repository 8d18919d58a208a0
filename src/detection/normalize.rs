//! Text normalization for keyword matching

use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("BUG: hardcoded whitespace regex"));

/// Concatenated compounds seen in class names and ids, and their spaced form
const COMPOUNDS: &[(&str, &str)] = &[
    ("termsandconditions", "terms and conditions"),
    ("privacystatement", "privacy statement"),
    ("privacypolicy", "privacy policy"),
    ("cookiepolicy", "cookie policy"),
];

/// Canonicalize a string for keyword matching.
///
/// Lowercases, decodes `&amp;`, splits known compounds, collapses whitespace
/// runs and trims. Total: `None` normalizes to the empty string.
pub fn normalize<'a>(s: impl Into<Option<&'a str>>) -> String {
    let Some(s) = s.into() else {
        return String::new();
    };

    let mut out = s.to_lowercase().replace("&amp;", "&");
    for (compound, spaced) in COMPOUNDS {
        if out.contains(compound) {
            out = out.replace(compound, spaced);
        }
    }

    WHITESPACE.replace_all(&out, " ").trim().to_string()
}
