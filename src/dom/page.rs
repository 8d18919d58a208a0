//! Page snapshots and frame access
//!
//! A [`Page`] is one parsed snapshot of the live document. Hosts hand out a
//! fresh snapshot whenever the page mutates; nothing in the core caches
//! query results across snapshots.

use crate::dom::query;
use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;
use tracing::{debug, trace};
use url::Url;

static IFRAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("iframe").expect("BUG: hardcoded selector 'iframe'"));

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("BUG: hardcoded selector 'body'"));

/// Result of asking for an iframe's document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAccess<'a> {
    /// Same-origin frame; the body of its document
    SameOrigin(ElementRef<'a>),
    /// Frame from another origin; its content cannot be read
    CrossOrigin,
    /// Frame with no loaded document (about:blank, unresolvable src, not attached)
    Unavailable,
}

/// A parsed document plus the URL it was loaded from
pub struct Page {
    url: Url,
    document: Html,
    frames: HashMap<String, Html>,
    srcdoc_frames: HashMap<NodeId, Html>,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("url", &self.url.as_str())
            .field("frames", &self.frames.len())
            .field("srcdoc_frames", &self.srcdoc_frames.len())
            .finish()
    }
}

impl Page {
    /// Parse `html` as the document located at `url`.
    ///
    /// Inline `srcdoc` frames are parsed eagerly; they always share the
    /// page's origin.
    pub fn parse(url: Url, html: &str) -> Self {
        let document = Html::parse_document(html);
        let srcdoc_frames = document
            .select(&IFRAME)
            .filter_map(|frame| {
                query::attr(frame, "srcdoc").map(|src| (frame.id(), Html::parse_document(src)))
            })
            .collect();

        Self {
            url,
            document,
            frames: HashMap::new(),
            srcdoc_frames,
        }
    }

    /// Attach the loaded document of an `iframe src` frame.
    ///
    /// Whether it can be read is still decided by [`Page::frame_access`].
    pub fn attach_frame(&mut self, src: &Url, html: &str) {
        self.frames
            .insert(frame_key(src), Html::parse_document(html));
    }

    /// The document URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The parsed document
    pub fn document(&self) -> &Html {
        &self.document
    }

    /// Element at `id` in this snapshot.
    ///
    /// Ids are only meaningful for the snapshot they came from; use
    /// [`ElementHandle`](crate::dom::ElementHandle) to follow an element
    /// into a later one.
    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.document.tree.get(id).and_then(ElementRef::wrap)
    }

    /// The document body (or root element for body-less documents)
    pub fn body(&self) -> ElementRef<'_> {
        body_of(&self.document)
    }

    /// All elements in document order matching `sel`.
    ///
    /// The elements borrow the page only, so they outlive `sel`.
    pub fn select_all<'a, 'b>(&'a self, sel: &'b Selector) -> impl Iterator<Item = ElementRef<'a>> + 'b
    where
        'a: 'b,
    {
        self.document.select(sel)
    }

    /// First element matching `sel` (DOM `querySelector`)
    pub fn select_first(&self, sel: &Selector) -> Option<ElementRef<'_>> {
        self.document.select(sel).next()
    }

    /// Resolve `href` against the page URL
    pub fn resolve_url(&self, href: &str) -> Option<Url> {
        match self.url.join(href.trim()) {
            Ok(url) => Some(url),
            Err(e) => {
                debug!("Could not resolve {:?} against {}: {}", href, self.url, e);
                None
            }
        }
    }

    /// Every `iframe` element in the document
    pub fn iframes(&self) -> impl Iterator<Item = ElementRef<'_>> + '_ {
        self.document.select(&IFRAME)
    }

    /// Same-origin capability check for an `iframe` element.
    pub fn frame_access<'a>(&'a self, iframe: ElementRef<'a>) -> FrameAccess<'a> {
        if let Some(doc) = self.srcdoc_frames.get(&iframe.id()) {
            return FrameAccess::SameOrigin(body_of(doc));
        }

        let src = query::attr(iframe, "src").unwrap_or("").trim();
        if src.is_empty() || src == "about:blank" {
            return FrameAccess::Unavailable;
        }

        let Some(resolved) = self.resolve_url(src) else {
            return FrameAccess::Unavailable;
        };

        if resolved.origin() != self.url.origin() {
            trace!("Frame {} is cross-origin", resolved);
            return FrameAccess::CrossOrigin;
        }

        match self.frames.get(&frame_key(&resolved)) {
            Some(doc) => FrameAccess::SameOrigin(body_of(doc)),
            None => FrameAccess::Unavailable,
        }
    }
}

fn frame_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

fn body_of(doc: &Html) -> ElementRef<'_> {
    doc.select(&BODY).next().unwrap_or_else(|| doc.root_element())
}

/// The live page as seen by the hover orchestrator
///
/// `snapshot` must reflect the page as it is now; `click` activates an
/// element the way a user click would (used by click-to-load retries).
pub trait DomHost {
    /// Current state of the page
    fn snapshot(&self) -> Rc<Page>;

    /// Activate an element
    fn click(&self, element: NodeId);
}

/// A host over a fixed snapshot, optionally swapped on the first click.
///
/// Used by the command-line front end and by tests.
pub struct StaticHost {
    page: RefCell<Rc<Page>>,
    after_click: RefCell<Option<Rc<Page>>>,
    clicks: RefCell<Vec<NodeId>>,
}

impl StaticHost {
    /// Create a host serving `page`
    pub fn new(page: Page) -> Self {
        Self {
            page: RefCell::new(Rc::new(page)),
            after_click: RefCell::new(None),
            clicks: RefCell::new(Vec::new()),
        }
    }

    /// Replace the page once an element is clicked (content loaded by a handler)
    pub fn with_page_after_click(self, page: Page) -> Self {
        *self.after_click.borrow_mut() = Some(Rc::new(page));
        self
    }

    /// Replace the current snapshot (page mutated)
    pub fn replace(&self, page: Page) {
        *self.page.borrow_mut() = Rc::new(page);
    }

    /// Elements clicked so far
    pub fn clicks(&self) -> Vec<NodeId> {
        self.clicks.borrow().clone()
    }
}

impl DomHost for StaticHost {
    fn snapshot(&self) -> Rc<Page> {
        Rc::clone(&self.page.borrow())
    }

    fn click(&self, element: NodeId) {
        self.clicks.borrow_mut().push(element);
        if let Some(next) = self.after_click.borrow_mut().take() {
            *self.page.borrow_mut() = next;
        }
    }
}
