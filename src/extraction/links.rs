//! Link target resolution
//!
//! Turns a classified element into a plan for getting at its content: a URL
//! to fetch, a framework modal selector, an element already in the page, or
//! a request for the user to click first.

use crate::dom::{query, Page};
use crate::extraction::locator::ModalLocator;
use scraper::ElementRef;
use std::fmt;
use tracing::{debug, instrument};
use url::Url;

/// How to reach the legal content behind an element
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget<'a> {
    /// Absolute URL to fetch
    Url(Url),
    /// CSS id selector of a framework modal (`data-bs-target="#termsModal"`)
    ModalSelector(String),
    /// Subtree already present in the page
    ModalElement(ElementRef<'a>),
    /// Content only appears after a real click on this element
    ClickToLoad(ElementRef<'a>),
}

impl LinkTarget<'_> {
    /// Short name of the variant, for logs and listings
    pub fn kind(&self) -> &'static str {
        match self {
            LinkTarget::Url(_) => "url",
            LinkTarget::ModalSelector(_) => "modal",
            LinkTarget::ModalElement(_) => "modal-element",
            LinkTarget::ClickToLoad(_) => "click-to-load",
        }
    }
}

impl fmt::Display for LinkTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkTarget::Url(url) => write!(f, "url {}", url),
            LinkTarget::ModalSelector(sel) => write!(f, "modal {}", sel),
            LinkTarget::ModalElement(el) => {
                write!(f, "in-page <{}", query::tag(*el))?;
                let id = query::id(*el);
                if !id.is_empty() {
                    write!(f, " id=\"{}\"", id)?;
                }
                f.write_str(">")
            }
            LinkTarget::ClickToLoad(_) => f.write_str("click to load"),
        }
    }
}

fn is_script_href(href: &str) -> bool {
    href.trim_start().to_ascii_lowercase().starts_with("javascript:")
}

/// Link target resolution functionality
#[derive(Debug, Default)]
pub struct LinkResolver {
    locator: ModalLocator,
}

impl LinkResolver {
    /// Resolver using the standard locator cascade
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver using a custom locator
    pub fn with_locator(locator: ModalLocator) -> Self {
        Self { locator }
    }

    /// The locator used for script-driven links
    pub fn locator(&self) -> &ModalLocator {
        &self.locator
    }

    /// Resolve `el` against the current page state.
    ///
    /// First applicable rule wins: explicit URL, `data-url`/`data-link`,
    /// framework modal target, then the locator cascade for script links.
    /// Returns `None` for elements that have nothing to resolve (e.g. an
    /// in-page `#section` anchor).
    #[instrument(skip_all, fields(tag = query::tag(el)))]
    pub fn resolve<'a>(&self, page: &'a Page, el: ElementRef<'a>) -> Option<LinkTarget<'a>> {
        let href = query::first_attr(el, &["href", "data-href"]);
        if !href.is_empty() && !href.starts_with('#') && !is_script_href(href) {
            return page.resolve_url(href).map(LinkTarget::Url);
        }

        let data_url = query::first_attr(el, &["data-url", "data-link"]);
        if !data_url.is_empty() {
            return page.resolve_url(data_url).map(LinkTarget::Url);
        }

        let modal_target = query::first_attr(el, &["data-target", "data-bs-target"]);
        if modal_target.starts_with('#') {
            return Some(LinkTarget::ModalSelector(modal_target.to_string()));
        }

        if is_script_href(href) || href.is_empty() || href == "#" {
            return Some(match self.locator.locate(page, el) {
                Some(found) => LinkTarget::ModalElement(found),
                None => {
                    debug!("No in-page content found; content must be loaded by a click");
                    LinkTarget::ClickToLoad(el)
                }
            });
        }

        None
    }
}
