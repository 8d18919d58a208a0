//! Runtime configuration
//!
//! User preferences come from a [`PreferenceSource`] and can be refreshed at
//! any time. Backend settings are read from the environment:
//!
//! - `TERMSDIGEST_BACKEND_URL` (required): base URL of the summarization backend
//! - `TERMSDIGEST_TOKEN` (optional): bearer token for the backend
//! - `TERMSDIGEST_TIMEOUT_SECS` (optional): request timeout (default: 60)

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default delay between hovering a link and starting work
pub const DEFAULT_HOVER_DELAY_MS: u64 = 750;

/// User preferences
///
/// Field names follow the extension's stored JSON (`autoHover`, `hoverDelay`, ...).
/// Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    /// Start a summary automatically on hover (default: true)
    pub auto_hover: bool,
    /// Show the red-flags section (default: true)
    pub show_red_flags: bool,
    /// Show supporting quotes (default: true)
    pub show_quotes: bool,
    /// Hover delay in milliseconds (default: 750)
    #[serde(rename = "hoverDelay")]
    pub hover_delay_ms: u64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            auto_hover: true,
            show_red_flags: true,
            show_quotes: true,
            hover_delay_ms: DEFAULT_HOVER_DELAY_MS,
        }
    }
}

impl Preferences {
    /// Create a new preferences builder
    pub fn builder() -> PreferencesBuilder {
        PreferencesBuilder::default()
    }

    /// Hover delay as a duration
    pub fn hover_delay(&self) -> Duration {
        Duration::from_millis(self.hover_delay_ms)
    }
}

/// Builder for Preferences
#[derive(Default)]
pub struct PreferencesBuilder {
    prefs: Preferences,
}

impl PreferencesBuilder {
    /// Enable/disable automatic hover summaries
    pub fn auto_hover(mut self, enabled: bool) -> Self {
        self.prefs.auto_hover = enabled;
        self
    }

    /// Show/hide red flags
    pub fn show_red_flags(mut self, show: bool) -> Self {
        self.prefs.show_red_flags = show;
        self
    }

    /// Show/hide quotes
    pub fn show_quotes(mut self, show: bool) -> Self {
        self.prefs.show_quotes = show;
        self
    }

    /// Set the hover delay
    pub fn hover_delay_ms(mut self, ms: u64) -> Self {
        self.prefs.hover_delay_ms = ms;
        self
    }

    /// Build the preferences
    pub fn build(self) -> Preferences {
        self.prefs
    }
}

/// Where preferences are read from
pub trait PreferenceSource {
    /// Current preferences
    fn preferences(&self) -> Result<Preferences, ConfigError>;
}

/// Fixed preferences
#[derive(Debug, Clone, Default)]
pub struct StaticPreferences(pub Preferences);

impl PreferenceSource for StaticPreferences {
    fn preferences(&self) -> Result<Preferences, ConfigError> {
        Ok(self.0.clone())
    }
}

/// Preferences stored as JSON, re-read on every call
#[derive(Debug, Clone)]
pub struct FilePreferences {
    path: PathBuf,
}

impl FilePreferences {
    /// Read preferences from `path`
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// The backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, message: impl ToString) -> ConfigError {
        ConfigError::Preferences {
            path: self.path.display().to_string(),
            message: message.to_string(),
        }
    }
}

impl PreferenceSource for FilePreferences {
    fn preferences(&self) -> Result<Preferences, ConfigError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No preferences at {}, using defaults", self.path.display());
                return Ok(Preferences::default());
            }
            Err(e) => return Err(self.error(e)),
        };
        serde_json::from_str(&raw).map_err(|e| self.error(e))
    }
}

/// Timing knobs of the hover orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Wait after the pointer leaves the link or popover before closing (default: 150ms)
    pub dismiss_debounce: Duration,
    /// Wait after clicking a click-to-load link before searching again (default: 1.5s).
    ///
    /// A fixed guess: nothing confirms the content actually loaded.
    pub click_settle_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            dismiss_debounce: Duration::from_millis(150),
            click_settle_delay: Duration::from_millis(1500),
        }
    }
}

impl OrchestratorConfig {
    /// Set the dismissal debounce
    pub fn with_dismiss_debounce(mut self, debounce: Duration) -> Self {
        self.dismiss_debounce = debounce;
        self
    }

    /// Set the click settle delay
    pub fn with_click_settle_delay(mut self, delay: Duration) -> Self {
        self.click_settle_delay = delay;
        self
    }
}

/// Summarization backend settings
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL; requests go to `{base_url}/summarize`
    pub base_url: Url,
    /// Bearer token, if signed in
    pub token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl BackendConfig {
    /// Config for a backend with no token
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            token: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Set the bearer token
    pub fn with_token<S: Into<String>>(mut self, token: S) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Load from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVar` if `TERMSDIGEST_BACKEND_URL` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup("TERMSDIGEST_BACKEND_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingVar("TERMSDIGEST_BACKEND_URL"))?;
        let base_url = Url::parse(raw_url.trim()).map_err(|e| ConfigError::InvalidValue {
            key: "TERMSDIGEST_BACKEND_URL",
            message: e.to_string(),
        })?;

        let token = lookup("TERMSDIGEST_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if token.is_none() {
            warn!("TERMSDIGEST_TOKEN not set; summaries will be refused by the backend");
        }

        let timeout_secs = match lookup("TERMSDIGEST_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                key: "TERMSDIGEST_TIMEOUT_SECS",
                message: e.to_string(),
            })?,
            None => 60,
        };

        Ok(Self {
            base_url,
            token,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// The summarize endpoint
    pub fn summarize_url(&self) -> String {
        format!("{}/summarize", self.base_url.as_str().trim_end_matches('/'))
    }
}
