//! Hover session state
//!
//! One session exists at a time. Every new hover and every close advances the
//! session [`Epoch`]; asynchronous work captures the epoch it started under and
//! checks [`HoverSession::is_current`] before touching the popover, so results
//! from superseded hovers are dropped instead of rendered.

use crate::dom::ElementHandle;
use std::fmt;
use tokio::task::JoinHandle;

/// Generation token of the hover session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Epoch(u64);

impl Epoch {
    /// Raw counter value
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Epoch(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where the current cycle is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No candidate
    #[default]
    Idle,
    /// Candidate accepted, waiting out the hover delay
    Classifying,
    /// Working out how to reach the content
    Resolving,
    /// Fetching and extracting text
    Extracting,
    /// Waiting for the summarizer
    Summarizing,
    /// Summary or click-to-load offer on screen
    Displaying,
    /// Error on screen; the next hover or close starts over
    Error,
}

/// The single active hover session
#[derive(Debug, Default)]
pub struct HoverSession {
    epoch: Epoch,
    anchor: Option<ElementHandle>,
    state: SessionState,
    url: Option<String>,
    timer: Option<JoinHandle<()>>,
    over_anchor: bool,
    over_popover: bool,
    visible: bool,
}

impl HoverSession {
    /// Idle session at epoch 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Current epoch
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Whether `epoch` is still the live one
    pub fn is_current(&self, epoch: Epoch) -> bool {
        self.epoch == epoch
    }

    /// Anchor of the session, if any
    pub fn anchor(&self) -> Option<&ElementHandle> {
        self.anchor.as_ref()
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Source URL shown with errors
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Whether the popover is showing
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether a hover timer is pending
    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Start a session on `anchor`, superseding anything in flight
    pub fn begin(&mut self, anchor: ElementHandle) -> Epoch {
        self.clear_timer();
        self.epoch = self.epoch.next();
        self.anchor = Some(anchor);
        self.state = SessionState::Classifying;
        self.url = None;
        self.over_anchor = true;
        self.epoch
    }

    /// New epoch for the same anchor (explicit retry)
    pub fn renew(&mut self) -> Epoch {
        self.clear_timer();
        self.epoch = self.epoch.next();
        self.epoch
    }

    /// Move to `state` if `epoch` is current
    pub fn advance(&mut self, epoch: Epoch, state: SessionState) -> bool {
        if !self.is_current(epoch) {
            return false;
        }
        self.state = state;
        if matches!(state, SessionState::Displaying | SessionState::Error) {
            self.visible = true;
        }
        true
    }

    /// Record the source URL if `epoch` is current
    pub fn set_url(&mut self, epoch: Epoch, url: String) {
        if self.is_current(epoch) {
            self.url = Some(url);
        }
    }

    /// Mark the popover as showing (loading or result)
    pub fn show(&mut self, epoch: Epoch) -> bool {
        if self.is_current(epoch) {
            self.visible = true;
        }
        self.visible && self.is_current(epoch)
    }

    /// Keep the handle of the pending hover timer
    pub fn set_timer(&mut self, timer: JoinHandle<()>) {
        self.clear_timer();
        self.timer = Some(timer);
    }

    /// Called by the timer when it fires; false if it was superseded
    pub fn timer_fired(&mut self, epoch: Epoch) -> bool {
        if !self.is_current(epoch) {
            return false;
        }
        self.timer = None;
        true
    }

    /// Cancel the pending hover timer, if any
    pub fn clear_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Pointer entered or left the anchor
    pub fn set_over_anchor(&mut self, over: bool) {
        self.over_anchor = over;
    }

    /// Pointer entered or left the popover
    pub fn set_over_popover(&mut self, over: bool) {
        self.over_popover = over;
    }

    /// Whether a pending dismissal check should close the session
    pub fn should_dismiss(&self) -> bool {
        self.anchor.is_some() && !self.over_anchor && !self.over_popover
    }

    /// Back to idle without closing (nothing to show for this anchor)
    pub fn finish(&mut self, epoch: Epoch) {
        if self.is_current(epoch) {
            self.state = SessionState::Idle;
        }
    }

    /// Close the session: cancel the timer and invalidate in-flight work
    pub fn close(&mut self) -> Epoch {
        self.clear_timer();
        self.epoch = self.epoch.next();
        self.anchor = None;
        self.url = None;
        self.state = SessionState::Idle;
        self.over_anchor = false;
        self.over_popover = false;
        self.visible = false;
        self.epoch
    }
}
