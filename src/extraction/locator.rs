//! In-page content location
//!
//! When a legal link has no URL, its text usually lives somewhere in the
//! page already: a framework modal, a hidden overlay, a section further down,
//! or a same-origin frame. [`ModalLocator`] runs an ordered list of
//! [`Strategy`] functions and returns the first hit. Cheap, specific checks
//! come before whole-document scans, and the order decides which candidate
//! wins when several would qualify.

use crate::detection::{classifier::contains_legal_keyword, ContentType};
use crate::dom::{query, FrameAccess, Page};
use crate::extraction::content::{MIN_CANDIDATE_TEXT, MIN_PAGE_SCAN_TEXT};
use scraper::{ElementRef, Selector};
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, instrument, trace};

/// Maximum number of ancestors inspected by the enclosing-modal strategy
pub const MAX_ANCESTOR_DEPTH: usize = 10;

/// Everything a strategy may look at
#[derive(Debug, Clone, Copy)]
pub struct LocateContext<'a> {
    /// Current page snapshot
    pub page: &'a Page,
    /// The hovered link or button
    pub trigger: ElementRef<'a>,
    /// What kind of legal content the trigger points at
    pub content_type: ContentType,
}

impl<'a> LocateContext<'a> {
    /// Build a context, classifying the trigger
    pub fn new(page: &'a Page, trigger: ElementRef<'a>) -> Self {
        Self {
            page,
            trigger,
            content_type: ContentType::classify(trigger),
        }
    }

    fn is_trigger(&self, el: ElementRef<'a>) -> bool {
        el == self.trigger
    }
}

/// Strategy signature: total, returns `None` when nothing qualifies
pub type StrategyFn = for<'a> fn(&LocateContext<'a>) -> Option<ElementRef<'a>>;

/// One named step of the locator cascade
#[derive(Clone, Copy)]
pub struct Strategy {
    name: &'static str,
    run: StrategyFn,
}

impl Strategy {
    /// Wrap a strategy function
    pub const fn new(name: &'static str, run: StrategyFn) -> Self {
        Self { name, run }
    }

    /// Strategy name, used in logs
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run against a context
    pub fn run<'a>(&self, cx: &LocateContext<'a>) -> Option<ElementRef<'a>> {
        (self.run)(cx)
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Strategy").field(&self.name).finish()
    }
}

/// The standard cascade, most specific first
pub const DEFAULT_STRATEGIES: [Strategy; 10] = [
    Strategy::new("framework-target", framework_target),
    Strategy::new("type-selectors", type_selectors),
    Strategy::new("id-guesses", id_guesses),
    Strategy::new("aria-relations", aria_relations),
    Strategy::new("visible-modals", visible_modals),
    Strategy::new("scored-scan", scored_scan),
    Strategy::new("generic-legal", generic_legal),
    Strategy::new("hidden-modals", hidden_modals),
    Strategy::new("ancestor-modal", ancestor_modal),
    Strategy::new("same-origin-frames", same_origin_frames),
];

/// Ordered strategy driver
#[derive(Debug, Clone)]
pub struct ModalLocator {
    strategies: Vec<Strategy>,
}

impl Default for ModalLocator {
    fn default() -> Self {
        Self {
            strategies: DEFAULT_STRATEGIES.to_vec(),
        }
    }
}

impl ModalLocator {
    /// Locator with the standard cascade
    pub fn new() -> Self {
        Self::default()
    }

    /// Locator with a custom strategy list
    pub fn with_strategies(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    /// Strategies in the order they run
    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Find the subtree holding the content behind `trigger`.
    #[instrument(skip_all, fields(trigger = query::tag(trigger)))]
    pub fn locate<'a>(&self, page: &'a Page, trigger: ElementRef<'a>) -> Option<ElementRef<'a>> {
        let cx = LocateContext::new(page, trigger);
        self.locate_with(&cx)
    }

    /// Run the cascade against a prepared context
    pub fn locate_with<'a>(&self, cx: &LocateContext<'a>) -> Option<ElementRef<'a>> {
        for strategy in &self.strategies {
            if let Some(found) = strategy.run(cx) {
                debug!(
                    "Strategy {} found <{} id={:?}> for {} link",
                    strategy.name(),
                    query::tag(found),
                    query::id(found),
                    cx.content_type
                );
                return Some(found);
            }
            trace!("Strategy {} found nothing", strategy.name());
        }
        debug!("All {} strategies exhausted", self.strategies.len());
        None
    }
}

static PRIVACY_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    query::selectors(&[
        ".privacy-statement",
        ".privacy-policy",
        ".privacy-notice",
        ".privacy-content",
        r#"section[class*="privacy"]"#,
        r#"div[class*="privacy"]"#,
        r#"[id*="privacy"]"#,
        r#"[class*="privacystatement"]"#,
        r#"[class*="privacy-statement"]"#,
    ])
});

static TERMS_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    query::selectors(&[
        ".terms-conditions",
        ".terms-and-conditions",
        ".terms-content",
        ".terms-statement",
        ".termsandconditions",
        ".terms-of-use",
        ".terms-of-service",
        r#"section[class*="terms"]"#,
        r#"div[class*="terms"]"#,
        r#"[id*="terms"]"#,
        r#"[class*="termsandconditions"]"#,
        r#"[class*="conditions"]"#,
    ])
});

static COOKIE_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    query::selectors(&[
        ".cookie-policy",
        ".cookie-notice",
        ".cookie-content",
        ".cookies",
        r#"section[class*="cookie"]"#,
        r#"div[class*="cookie"]"#,
        r#"[id*="cookie"]"#,
    ])
});

static SECURITY_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    query::selectors(&[
        ".security-policy",
        ".security-notice",
        ".security-content",
        ".security-statement",
        r#"section[class*="security"]"#,
        r#"div[class*="security"]"#,
        r#"[id*="security"]"#,
    ])
});

static REFUND_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    query::selectors(&[
        ".refund-policy",
        ".return-policy",
        ".refund-content",
        ".cancellation-policy",
        r#"section[class*="refund"]"#,
        r#"div[class*="refund"]"#,
        r#"[id*="refund"]"#,
        r#"[class*="return-policy"]"#,
    ])
});

static GENERIC_LEGAL_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    query::selectors(&[
        ".legal-content",
        ".legal-statement",
        ".legal-notice",
        r#"section[class*="legal"]"#,
        r#"div[class*="legal"]"#,
    ])
});

static VISIBLE_MODALS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#".modal.show, .overlay.show, [role="dialog"], .modal"#)
        .expect("BUG: hardcoded modal selector")
});

static ANY_MODAL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#".modal, .overlay, [role="dialog"], [class*="modal"], [class*="overlay"]"#,
    )
    .expect("BUG: hardcoded modal selector")
});

static MODAL_LIKE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#".modal, .overlay, [role="dialog"]"#).expect("BUG: hardcoded modal selector")
});

static SCAN_CONTAINERS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("section, div, article, main").expect("BUG: hardcoded container selector")
});

fn type_selector_list(content_type: ContentType) -> &'static [Selector] {
    match content_type {
        ContentType::Privacy => PRIVACY_SELECTORS.as_slice(),
        ContentType::Terms => TERMS_SELECTORS.as_slice(),
        ContentType::Cookie => COOKIE_SELECTORS.as_slice(),
        ContentType::Security => SECURITY_SELECTORS.as_slice(),
        ContentType::Refund => REFUND_SELECTORS.as_slice(),
        ContentType::Legal => &[],
    }
}

/// Phrases that earn a scored-scan bonus for each type
fn score_phrases(content_type: ContentType) -> &'static [&'static str] {
    match content_type {
        ContentType::Privacy => &["privacy policy", "privacy notice"],
        ContentType::Terms => &["terms of use", "terms and conditions", "terms of service"],
        ContentType::Cookie => &["cookie policy", "cookie notice"],
        ContentType::Security => &["security policy", "security notice"],
        ContentType::Refund => &["refund policy", "return policy", "cancellation policy"],
        ContentType::Legal => &["legal notice", "legal information"],
    }
}

/// First match across `selectors`, skipping the trigger, with more than
/// `min_len` characters of text
fn first_with_text<'a>(
    cx: &LocateContext<'a>,
    selectors: &[Selector],
    min_len: usize,
) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|sel| {
        cx.page
            .select_all(sel)
            .find(|candidate| !cx.is_trigger(*candidate) && query::text_len(*candidate) > min_len)
    })
}

fn mentions_type(el: ElementRef<'_>, keyword: &str) -> bool {
    query::text_content(el).to_lowercase().contains(keyword)
        || query::class_name(el).to_lowercase().contains(keyword)
        || query::id(el).to_lowercase().contains(keyword)
}

fn is_legal_block(el: ElementRef<'_>) -> bool {
    query::text_len(el) > MIN_PAGE_SCAN_TEXT
        && contains_legal_keyword(&query::text_content(el).to_lowercase())
}

fn looks_like_modal(el: ElementRef<'_>) -> bool {
    if MODAL_LIKE.matches(&el) {
        return true;
    }
    let class = query::class_name(el).to_lowercase();
    class.contains("modal") || class.contains("overlay")
}

/// Strip link decorations from an id to get the shared base token
pub fn base_id(id: &str) -> &str {
    let id = id.strip_suffix("-link").unwrap_or(id);
    let id = id.strip_suffix("-button").unwrap_or(id);
    let id = id.strip_prefix("footer-").unwrap_or(id);
    id.strip_prefix("welcome-overlay-").unwrap_or(id)
}

/// 1. `data-target`/`data-bs-target` resolved as an id selector
pub fn framework_target<'a>(cx: &LocateContext<'a>) -> Option<ElementRef<'a>> {
    let target = query::first_attr(cx.trigger, &["data-target", "data-bs-target"]);
    if !target.starts_with('#') {
        return None;
    }
    let sel = query::selector(target)?;
    cx.page.select_first(&sel)
}

/// 2. Selectors named after the content type
pub fn type_selectors<'a>(cx: &LocateContext<'a>) -> Option<ElementRef<'a>> {
    first_with_text(cx, type_selector_list(cx.content_type), MIN_CANDIDATE_TEXT)
}

/// 3. Ids and classes guessed from the trigger's own id
pub fn id_guesses<'a>(cx: &LocateContext<'a>) -> Option<ElementRef<'a>> {
    let base = base_id(query::id(cx.trigger));
    if base.is_empty() {
        return None;
    }

    let guesses = [
        format!("#{}-modal", base),
        format!("#{}-overlay", base),
        format!("#{}-dialog", base),
        format!("#{}-content", base),
        format!("#{}", base),
        format!(".{}", base),
        format!(r#"[class*="{}"]"#, base),
        format!("section.{}", base),
    ];

    guesses.iter().find_map(|css| {
        let sel = query::selector(css)?;
        cx.page
            .select_first(&sel)
            .filter(|found| !cx.is_trigger(*found) && query::text_len(*found) > MIN_CANDIDATE_TEXT)
    })
}

/// 4. `aria-controls`/`aria-describedby` id references
pub fn aria_relations<'a>(cx: &LocateContext<'a>) -> Option<ElementRef<'a>> {
    let ids = query::first_attr(cx.trigger, &["aria-controls", "aria-describedby"]);
    ids.split_whitespace().find_map(|id| {
        let sel = query::selector(&format!("#{}", id))?;
        cx.page.select_first(&sel)
    })
}

/// 5. Open dialogs and overlays that mention the content type
pub fn visible_modals<'a>(cx: &LocateContext<'a>) -> Option<ElementRef<'a>> {
    let keyword = cx.content_type.keyword();
    cx.page.select_all(&VISIBLE_MODALS).find(|modal| {
        !cx.is_trigger(*modal)
            && !query::is_hidden(*modal)
            && mentions_type(*modal, keyword)
            && query::text_len(*modal) > MIN_CANDIDATE_TEXT
    })
}

/// Relevance of a container for the scored scan; zero means unrelated
pub fn relevance(el: ElementRef<'_>, content_type: ContentType) -> u32 {
    let keyword = content_type.keyword();
    let mut score = 0;
    if query::class_name(el).to_lowercase().contains(keyword)
        || query::id(el).to_lowercase().contains(keyword)
    {
        score += 10;
    }
    let text = query::text_content(el).to_lowercase();
    if score_phrases(content_type).iter().any(|p| text.contains(p)) {
        score += 5;
    }
    score
}

/// 6. Best-scoring large container anywhere in the document
pub fn scored_scan<'a>(cx: &LocateContext<'a>) -> Option<ElementRef<'a>> {
    let mut best: Option<(ElementRef<'a>, u32)> = None;
    for el in cx.page.select_all(&SCAN_CONTAINERS) {
        if cx.is_trigger(el) || query::text_len(el) <= MIN_PAGE_SCAN_TEXT {
            continue;
        }
        let score = relevance(el, cx.content_type);
        if score > best.map_or(0, |(_, s)| s) {
            best = Some((el, score));
        }
    }
    best.map(|(el, _)| el)
}

/// 7. Generic legal containers, whatever the type
pub fn generic_legal<'a>(cx: &LocateContext<'a>) -> Option<ElementRef<'a>> {
    first_with_text(cx, GENERIC_LEGAL_SELECTORS.as_slice(), MIN_CANDIDATE_TEXT)
}

/// 8. Modal-like elements, hidden or not, holding legal text
pub fn hidden_modals<'a>(cx: &LocateContext<'a>) -> Option<ElementRef<'a>> {
    cx.page
        .select_all(&ANY_MODAL)
        .find(|modal| !cx.is_trigger(*modal) && is_legal_block(*modal))
}

/// 9. A modal enclosing the trigger itself
pub fn ancestor_modal<'a>(cx: &LocateContext<'a>) -> Option<ElementRef<'a>> {
    std::iter::successors(query::parent_element(cx.trigger), |el| {
        query::parent_element(*el)
    })
    .take(MAX_ANCESTOR_DEPTH)
    .find(|el| looks_like_modal(*el) && is_legal_block(*el))
}

/// 10. Bodies of same-origin frames; other origins are skipped
pub fn same_origin_frames<'a>(cx: &LocateContext<'a>) -> Option<ElementRef<'a>> {
    cx.page
        .iframes()
        .find_map(|frame| match cx.page.frame_access(frame) {
            FrameAccess::SameOrigin(body) if is_legal_block(body) => Some(body),
            FrameAccess::SameOrigin(_) => None,
            FrameAccess::CrossOrigin => {
                trace!("Skipping cross-origin frame");
                None
            }
            FrameAccess::Unavailable => None,
        })
}
