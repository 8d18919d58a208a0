//! Hover/popover orchestrator
//!
//! Drives one hover cycle at a time: a pointer resting on a legal link for the
//! configured delay resolves the link, extracts its text, summarizes it and
//! renders the result. Moving to another link starts a new epoch; work left
//! over from the previous one finishes quietly and is never rendered.
//!
//! All state lives on one thread. Timers and cycles are spawned with
//! [`tokio::task::spawn_local`], so the orchestrator must be driven from
//! inside a [`tokio::task::LocalSet`].

use crate::backend::{fetch_readable_text, PageFetcher, Summarizer, SummaryResponse};
use crate::config::{OrchestratorConfig, PreferenceSource, Preferences};
use crate::detection::classifier::LinkClassifier;
use crate::dom::{query, DomHost, ElementHandle, NodeId, Page};
use crate::error::{Error, ExtractionError, Result};
use crate::extraction::{ContentExtractor, LinkResolver, LinkTarget, MIN_ELEMENT_TEXT};
use crate::hover::session::{Epoch, HoverSession, SessionState};
use crate::render::PopoverSink;
use scraper::ElementRef;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, instrument, trace, warn};

/// Longest anchor slug used in in-page cache keys
const MAX_SLUG_CHARS: usize = 50;

/// The outside world as seen by the orchestrator
#[derive(Clone)]
pub struct Collaborators {
    /// The page
    pub host: Rc<dyn DomHost>,
    /// Fetches linked documents
    pub fetcher: Rc<dyn PageFetcher>,
    /// Summarizes extracted text
    pub summarizer: Rc<dyn Summarizer>,
    /// Renders the popover
    pub sink: Rc<dyn PopoverSink>,
    /// User preferences
    pub preferences: Rc<dyn PreferenceSource>,
}

struct Inner {
    deps: Collaborators,
    config: OrchestratorConfig,
    classifier: LinkClassifier,
    resolver: LinkResolver,
    prefs: RefCell<Preferences>,
    session: RefCell<HoverSession>,
}

/// Hover orchestrator handle; clones share the same session
#[derive(Clone)]
pub struct Orchestrator {
    inner: Rc<Inner>,
}

impl Orchestrator {
    /// Create an orchestrator with the default classifier and resolver
    pub fn new(deps: Collaborators, config: OrchestratorConfig) -> Self {
        Self::with_parts(deps, config, LinkClassifier::new(), LinkResolver::new())
    }

    /// Create an orchestrator with a custom classifier and resolver
    pub fn with_parts(
        deps: Collaborators,
        config: OrchestratorConfig,
        classifier: LinkClassifier,
        resolver: LinkResolver,
    ) -> Self {
        let prefs = deps.preferences.preferences().unwrap_or_else(|e| {
            warn!("Failed to load preferences, using defaults: {}", e);
            Preferences::default()
        });
        Self {
            inner: Rc::new(Inner {
                deps,
                config,
                classifier,
                resolver,
                prefs: RefCell::new(prefs),
                session: RefCell::new(HoverSession::new()),
            }),
        }
    }

    /// Preferences in effect
    pub fn preferences(&self) -> Preferences {
        self.inner.prefs.borrow().clone()
    }

    /// Re-read preferences; a failed read keeps the current ones
    pub fn refresh_preferences(&self) {
        match self.inner.deps.preferences.preferences() {
            Ok(prefs) => {
                debug!(auto_hover = prefs.auto_hover, "Preferences refreshed");
                *self.inner.prefs.borrow_mut() = prefs;
            }
            Err(e) => warn!("Failed to refresh preferences: {}", e),
        }
    }

    /// State of the current session
    pub fn state(&self) -> SessionState {
        self.inner.session.borrow().state()
    }

    /// Current session epoch
    pub fn epoch(&self) -> Epoch {
        self.inner.session.borrow().epoch()
    }

    /// Anchor of the current session, located in the current snapshot
    pub fn active_anchor(&self) -> Option<NodeId> {
        let handle = self.inner.session.borrow().anchor().cloned()?;
        let page = self.inner.deps.host.snapshot();
        handle.resolve(&page).map(|el| el.id())
    }

    /// Whether the popover is showing
    pub fn is_visible(&self) -> bool {
        self.inner.session.borrow().is_visible()
    }

    /// The pointer moved over `target`.
    ///
    /// Starts a new session when the nearest interactive ancestor of `target`
    /// is a legal link other than the active one. The cycle runs once the
    /// pointer has rested for the hover delay.
    #[instrument(skip(self))]
    pub fn pointer_over(&self, target: NodeId) {
        if !self.inner.prefs.borrow().auto_hover {
            return;
        }

        let page = self.inner.deps.host.snapshot();
        let Some(anchor) = page
            .element(target)
            .and_then(LinkClassifier::interactive_ancestor)
        else {
            return;
        };

        {
            let mut session = self.inner.session.borrow_mut();
            let same = session
                .anchor()
                .and_then(|active| active.resolve(&page))
                .is_some_and(|active| active.id() == anchor.id());
            if same {
                session.set_over_anchor(true);
                return;
            }
        }

        if !self.inner.classifier.is_legal_link(anchor) {
            trace!("Not a legal link");
            return;
        }

        let delay = self.inner.prefs.borrow().hover_delay();
        let handle = ElementHandle::of(&page, anchor);
        let epoch = self.inner.session.borrow_mut().begin(handle.clone());
        debug!(%epoch, ?delay, "Hover started");

        let this = self.clone();
        let timer = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            if !this.inner.session.borrow_mut().timer_fired(epoch) {
                return;
            }
            // The timer handle is gone from the session now, so nothing aborts the cycle.
            this.run_cycle(epoch, &handle).await;
        });
        self.inner.session.borrow_mut().set_timer(timer);
    }

    /// The pointer left `target`
    #[instrument(skip(self))]
    pub fn pointer_out(&self, target: NodeId) {
        let Some(handle) = self.inner.session.borrow().anchor().cloned() else {
            return;
        };
        let page = self.inner.deps.host.snapshot();
        // An anchor gone from the page can no longer be under the pointer.
        let left_anchor = match handle.resolve(&page) {
            None => true,
            Some(active) => {
                target == active.id()
                    || page
                        .element(target)
                        .and_then(LinkClassifier::interactive_ancestor)
                        .is_some_and(|anchor| anchor.id() == active.id())
            }
        };
        if !left_anchor {
            return;
        }
        self.inner.session.borrow_mut().set_over_anchor(false);
        self.schedule_hide_check();
    }

    /// The pointer entered the popover
    pub fn popover_enter(&self) {
        self.inner.session.borrow_mut().set_over_popover(true);
    }

    /// The pointer left the popover
    pub fn popover_leave(&self) {
        self.inner.session.borrow_mut().set_over_popover(false);
        self.schedule_hide_check();
    }

    /// Hide the popover and invalidate everything in flight
    pub fn close(&self) {
        let epoch = self.inner.session.borrow_mut().close();
        debug!(%epoch, "Session closed");
        self.inner.deps.sink.hide();
    }

    fn schedule_hide_check(&self) {
        let this = self.clone();
        let debounce = self.inner.config.dismiss_debounce;
        tokio::task::spawn_local(async move {
            tokio::time::sleep(debounce).await;
            let dismiss = this.inner.session.borrow().should_dismiss();
            if dismiss {
                this.close();
            }
        });
    }

    /// Click the active anchor and look for its content again after the
    /// settle delay. Used when the link offered click-to-load.
    #[instrument(skip(self))]
    pub fn click_and_retry(&self) {
        let Some(handle) = self.inner.session.borrow().anchor().cloned() else {
            return;
        };
        let epoch = self.epoch();
        let page = self.inner.deps.host.snapshot();
        let Some(anchor) = handle.resolve(&page) else {
            self.fail(epoch, &ExtractionError::AnchorDetached.into());
            return;
        };
        let page_url = page.url().clone();
        self.inner.deps.host.click(anchor.id());

        self.render_loading(epoch, &format!("{} (loading content...)", page_url));

        let this = self.clone();
        let settle = self.inner.config.click_settle_delay;
        tokio::task::spawn_local(async move {
            tokio::time::sleep(settle).await;
            if !this.is_current(epoch) {
                return;
            }
            this.retry_after_click(epoch, &handle).await;
        });
    }

    async fn retry_after_click(&self, epoch: Epoch, handle: &ElementHandle) {
        let page = self.inner.deps.host.snapshot();
        let Some(anchor) = handle.resolve(&page) else {
            self.fail(epoch, &ExtractionError::AnchorDetached.into());
            return;
        };

        match self.inner.resolver.locator().locate(&page, anchor) {
            Some(found) => {
                let epoch = self.inner.session.borrow_mut().renew();
                debug!(%epoch, "Content appeared after click");
                if let Err(e) = self.summarize_element(epoch, &page, anchor, found).await {
                    self.fail(epoch, &e);
                }
            }
            None => self.fail(epoch, &ExtractionError::NotFoundAfterClick.into()),
        }
    }

    async fn run_cycle(&self, epoch: Epoch, handle: &ElementHandle) {
        let page = self.inner.deps.host.snapshot();
        if let Err(e) = self.drive(epoch, handle, &page).await {
            self.fail(epoch, &e);
        }
    }

    async fn drive(&self, epoch: Epoch, handle: &ElementHandle, page: &Page) -> Result<()> {
        let anchor = handle
            .resolve(page)
            .ok_or(ExtractionError::AnchorDetached)?;
        if !self.advance(epoch, SessionState::Resolving) {
            return Ok(());
        }

        let Some(target) = self.inner.resolver.resolve(page, anchor) else {
            debug!("Nothing to summarize for this link");
            self.inner.session.borrow_mut().finish(epoch);
            return Ok(());
        };
        info!(%epoch, target = %target, "Resolved link");

        match target {
            LinkTarget::Url(url) => {
                self.set_url(epoch, url.to_string());
                self.render_loading(epoch, url.as_str());
                self.advance(epoch, SessionState::Extracting);

                let fetched = fetch_readable_text(&*self.inner.deps.fetcher, &url).await?;
                if !self.advance(epoch, SessionState::Summarizing) {
                    return Ok(());
                }

                let response = self
                    .inner
                    .deps
                    .summarizer
                    .summarize(fetched.final_url.as_str(), &fetched.content.text)
                    .await?;
                self.show_summary(epoch, &response, fetched.final_url.as_str());
                Ok(())
            }
            LinkTarget::ModalSelector(css) => {
                self.set_url(epoch, format!("{}{}", page.url(), css));
                self.render_loading(epoch, &format!("{} (in-page modal)", page.url()));
                self.advance(epoch, SessionState::Extracting);

                let modal = query::selector(&css)
                    .and_then(|sel| page.select_first(&sel))
                    .ok_or_else(|| ExtractionError::ModalNotFound(css.clone()))?;
                let text = ContentExtractor::extract_from_element(modal);
                if text.chars().count() < MIN_ELEMENT_TEXT {
                    return Err(ExtractionError::EmptyModal.into());
                }
                self.summarize_in_page(epoch, page, anchor, text).await
            }
            LinkTarget::ModalElement(found) => {
                self.summarize_element(epoch, page, anchor, found).await
            }
            LinkTarget::ClickToLoad(el) => {
                self.set_url(epoch, page.url().to_string());
                let label = query::text_content(el).trim().to_string();
                if self.advance(epoch, SessionState::Displaying) {
                    self.inner.deps.sink.click_to_load(anchor.id(), &label);
                }
                Ok(())
            }
        }
    }

    async fn summarize_element(
        &self,
        epoch: Epoch,
        page: &Page,
        anchor: ElementRef<'_>,
        found: ElementRef<'_>,
    ) -> Result<()> {
        self.set_url(epoch, page.url().to_string());
        self.render_loading(epoch, &format!("{} (in-page content)", page.url()));
        self.advance(epoch, SessionState::Extracting);

        let text = ContentExtractor::extract_from_element(found);
        if text.chars().count() < MIN_ELEMENT_TEXT {
            return Err(ExtractionError::EmptyElement.into());
        }
        self.summarize_in_page(epoch, page, anchor, text).await
    }

    async fn summarize_in_page(
        &self,
        epoch: Epoch,
        page: &Page,
        anchor: ElementRef<'_>,
        text: String,
    ) -> Result<()> {
        if !self.advance(epoch, SessionState::Summarizing) {
            return Ok(());
        }
        let key = in_page_key(page, anchor);
        let response = self.inner.deps.summarizer.summarize(&key, &text).await?;
        self.show_summary(epoch, &response, page.url().as_str());
        Ok(())
    }

    fn show_summary(&self, epoch: Epoch, response: &SummaryResponse, url: &str) {
        if !self.advance(epoch, SessionState::Displaying) {
            trace!(%epoch, "Dropping stale summary");
            return;
        }
        self.inner
            .deps
            .sink
            .summary(&response.summary, url, response.from_cache);
    }

    fn fail(&self, epoch: Epoch, error: &Error) {
        let url = {
            let mut session = self.inner.session.borrow_mut();
            if !session.advance(epoch, SessionState::Error) {
                trace!(%epoch, "Dropping stale error: {}", error);
                return;
            }
            session.url().unwrap_or_default().to_string()
        };
        warn!(%epoch, "Hover cycle failed: {}", error);
        self.inner.deps.sink.error(&error.to_string(), &url);
    }

    fn render_loading(&self, epoch: Epoch, url: &str) {
        if self.inner.session.borrow_mut().show(epoch) {
            self.inner.deps.sink.loading(url);
        }
    }

    fn is_current(&self, epoch: Epoch) -> bool {
        self.inner.session.borrow().is_current(epoch)
    }

    fn advance(&self, epoch: Epoch, state: SessionState) -> bool {
        self.inner.session.borrow_mut().advance(epoch, state)
    }

    fn set_url(&self, epoch: Epoch, url: String) {
        self.inner.session.borrow_mut().set_url(epoch, url);
    }
}

/// Lowercased text of `anchor` with whitespace runs replaced by `-`,
/// at most 50 characters
pub fn anchor_slug(anchor: ElementRef<'_>) -> String {
    query::text_content(anchor)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .take(MAX_SLUG_CHARS)
        .collect()
}

/// Summary key for content reached through `anchor` on `page`:
/// `{page url}#link:{anchor id or slug}`
pub fn in_page_key(page: &Page, anchor: ElementRef<'_>) -> String {
    let mut base = page.url().clone();
    base.set_fragment(None);
    let id = query::id(anchor);
    let tail = if id.is_empty() {
        anchor_slug(anchor)
    } else {
        id.to_string()
    };
    format!("{}#link:{}", base, tail)
}
