//! Hover orchestrator tests
//!
//! These tests drive full hover cycles against in-memory collaborators with
//! paused tokio time, so delays and debounces are exact.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use scraper::Selector;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use termsdigest::backend::{Confidence, FetchResponse, PageFetcher, Summarizer, Summary, SummaryResponse};
use termsdigest::config::{OrchestratorConfig, Preferences, StaticPreferences};
use termsdigest::dom::{DomHost, NodeId, Page, StaticHost};
use termsdigest::error::{FetchError, SummarizeError};
use termsdigest::hover::{Collaborators, Orchestrator, SessionState};
use termsdigest::render::{RecordingSink, Rendered, SummaryView};
use tokio::task::LocalSet;
use tokio::time::sleep;
use url::Url;

const PAGE_URL: &str = "https://shop.example.com/";

// ============================================================================
// FAKES
// ============================================================================

#[derive(Default)]
struct FakeFetcher {
    pages: HashMap<String, (Duration, FetchResponse)>,
    calls: RefCell<Vec<String>>,
}

impl FakeFetcher {
    fn page(mut self, url: &str, delay: Duration, response: FetchResponse) -> Self {
        self.pages.insert(url.to_string(), (delay, response));
        self
    }

    fn html(self, url: &str, html: &str) -> Self {
        let parsed = Url::parse(url).unwrap();
        self.page(url, Duration::ZERO, FetchResponse::html(&parsed, html))
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

#[async_trait(?Send)]
impl PageFetcher for FakeFetcher {
    async fn fetch_page(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        self.calls.borrow_mut().push(url.to_string());
        match self.pages.get(url.as_str()) {
            Some((delay, response)) => {
                sleep(*delay).await;
                Ok(response.clone())
            }
            None => Ok(FetchResponse::failed(url)),
        }
    }
}

/// Summarizer that titles each summary with its key
#[derive(Default)]
struct FakeSummarizer {
    delays: HashMap<String, Duration>,
    keys: RefCell<Vec<String>>,
}

impl FakeSummarizer {
    fn delay(mut self, key: &str, delay: Duration) -> Self {
        self.delays.insert(key.to_string(), delay);
        self
    }

    fn keys(&self) -> Vec<String> {
        self.keys.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, key: &str, text: &str) -> Result<SummaryResponse, SummarizeError> {
        self.keys.borrow_mut().push(key.to_string());
        if let Some(delay) = self.delays.get(key) {
            sleep(*delay).await;
        }
        Ok(SummaryResponse::fresh(Summary {
            title: key.to_string(),
            tldr: text.chars().take(40).collect(),
            confidence: Confidence::High,
            ..Summary::default()
        }))
    }
}

struct Harness {
    host: Rc<StaticHost>,
    fetcher: Rc<FakeFetcher>,
    summarizer: Rc<FakeSummarizer>,
    sink: Rc<RecordingSink>,
    orch: Orchestrator,
}

impl Harness {
    fn new(host: StaticHost, fetcher: FakeFetcher, summarizer: FakeSummarizer) -> Self {
        Self::with_prefs(host, fetcher, summarizer, Preferences::default())
    }

    fn with_prefs(
        host: StaticHost,
        fetcher: FakeFetcher,
        summarizer: FakeSummarizer,
        prefs: Preferences,
    ) -> Self {
        let host = Rc::new(host);
        let fetcher = Rc::new(fetcher);
        let summarizer = Rc::new(summarizer);
        let sink = Rc::new(RecordingSink::new());
        let orch = Orchestrator::new(
            Collaborators {
                host: host.clone(),
                fetcher: fetcher.clone(),
                summarizer: summarizer.clone(),
                sink: sink.clone(),
                preferences: Rc::new(StaticPreferences(prefs)),
            },
            OrchestratorConfig::default(),
        );
        Self {
            host,
            fetcher,
            summarizer,
            sink,
            orch,
        }
    }

    fn node(&self, css: &str) -> NodeId {
        let page = self.host.snapshot();
        let sel = Selector::parse(css).unwrap();
        page.select_first(&sel).expect("fixture element").id()
    }

    fn errors(&self) -> Vec<String> {
        self.sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Rendered::Error { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }
}

fn page(body: &str) -> Page {
    Page::parse(Url::parse(PAGE_URL).unwrap(), &format!("<html><body>{body}</body></html>"))
}

fn policy_html(name: &str) -> String {
    let para = format!("<p>These {name} govern your use of the store and every order you place.</p>\n");
    format!("<html><body><nav>Home</nav>\n<main><h1>{name}</h1>\n{}</main></body></html>", para.repeat(40))
}

fn legal_text(len: usize) -> String {
    "By placing an order you agree to these terms of service. "
        .repeat(len / 56 + 1)
}

// ============================================================================
// FULL CYCLES
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_footer_terms_link_summarized() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new(
                StaticHost::new(page(r#"<footer><a id="t" href="/terms">Terms of Service</a></footer>"#)),
                FakeFetcher::default().html("https://shop.example.com/terms", &policy_html("Terms of Service")),
                FakeSummarizer::default(),
            );

            h.orch.pointer_over(h.node("#t"));
            sleep(Duration::from_secs(2)).await;

            assert_eq!(h.fetcher.calls(), vec!["https://shop.example.com/terms"]);
            assert_eq!(h.summarizer.keys(), vec!["https://shop.example.com/terms"]);

            let events = h.sink.events();
            assert_eq!(events[0], Rendered::Loading("https://shop.example.com/terms".into()));
            match events.last() {
                Some(Rendered::Summary { summary, url, from_cache }) => {
                    assert_eq!(url, "https://shop.example.com/terms");
                    assert!(!from_cache);
                    let view = SummaryView::new(summary, &Preferences::default(), *from_cache);
                    assert_eq!(view.badge, "high");
                }
                other => panic!("expected a summary, got {:?}", other),
            }
            assert_eq!(h.orch.state(), SessionState::Displaying);
            assert!(h.orch.is_visible());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_modal_summarized_without_fetch() {
    LocalSet::new()
        .run_until(async {
            let body = format!(
                r##"<button data-bs-target="#termsModal">Terms</button>
                <div id="termsModal" class="modal" style="display:none"><p>{}</p></div>"##,
                legal_text(400)
            );
            let h = Harness::new(
                StaticHost::new(page(&body)),
                FakeFetcher::default(),
                FakeSummarizer::default(),
            );

            h.orch.pointer_over(h.node("button"));
            sleep(Duration::from_secs(2)).await;

            assert!(h.fetcher.calls().is_empty());
            assert_eq!(h.summarizer.keys(), vec!["https://shop.example.com/#link:terms"]);
            assert_eq!(
                h.sink.events()[0],
                Rendered::Loading("https://shop.example.com/ (in-page modal)".into())
            );
            assert_eq!(h.sink.summaries().len(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_missing_modal_reports_selector() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new(
                StaticHost::new(page(r##"<button data-target="#gone">Privacy Policy</button>"##)),
                FakeFetcher::default(),
                FakeSummarizer::default(),
            );

            h.orch.pointer_over(h.node("button"));
            sleep(Duration::from_secs(2)).await;

            assert_eq!(
                h.errors(),
                vec!["Could not find modal element \"#gone\" on this page.".to_string()]
            );
            assert_eq!(h.orch.state(), SessionState::Error);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_click_to_load_then_retry() {
    LocalSet::new()
        .run_until(async {
            let before = r#"<button onclick="openTerms()">Terms</button>"#;
            let after = format!(
                r#"<button onclick="openTerms()">Terms</button><div class="terms-content">{}</div>"#,
                legal_text(400)
            );
            let host = StaticHost::new(page(before)).with_page_after_click(page(&after));
            let h = Harness::new(host, FakeFetcher::default(), FakeSummarizer::default());
            let button = h.node("button");

            h.orch.pointer_over(button);
            sleep(Duration::from_secs(2)).await;
            assert_eq!(
                h.sink.last(),
                Some(Rendered::ClickToLoad {
                    anchor: button,
                    label: "Terms".into()
                })
            );
            assert!(h.summarizer.keys().is_empty());

            h.orch.click_and_retry();
            assert_eq!(h.host.clicks(), vec![button]);
            assert_eq!(
                h.sink.last(),
                Some(Rendered::Loading("https://shop.example.com/ (loading content...)".into()))
            );

            sleep(Duration::from_secs(2)).await;
            assert_eq!(h.summarizer.keys(), vec!["https://shop.example.com/#link:terms"]);
            assert_eq!(h.sink.summaries().len(), 1);
            assert_eq!(h.orch.state(), SessionState::Displaying);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_click_retry_follows_anchor_when_content_lands_before_it() {
    LocalSet::new()
        .run_until(async {
            let before = r#"<footer><button id="tos-btn" onclick="openTerms()">Terms</button></footer>"#;
            let after = format!(
                r#"<div class="banner"><p>Free shipping over $50</p></div>
                <div class="terms-content">{}</div>
                <footer><button id="tos-btn" onclick="openTerms()">Terms</button></footer>"#,
                legal_text(400)
            );
            let host = StaticHost::new(page(before)).with_page_after_click(page(&after));
            let h = Harness::new(host, FakeFetcher::default(), FakeSummarizer::default());
            let button = h.node("#tos-btn");

            h.orch.pointer_over(button);
            sleep(Duration::from_secs(2)).await;
            assert!(matches!(h.sink.last(), Some(Rendered::ClickToLoad { .. })));

            h.orch.click_and_retry();
            assert_eq!(h.host.clicks(), vec![button]);

            sleep(Duration::from_secs(2)).await;
            assert!(h.errors().is_empty());
            assert_eq!(h.summarizer.keys(), vec!["https://shop.example.com/#link:tos-btn"]);
            assert_eq!(h.orch.state(), SessionState::Displaying);
            assert_eq!(h.orch.active_anchor(), Some(h.node("#tos-btn")));
            assert_ne!(h.orch.active_anchor(), Some(button));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_pointer_out_after_page_mutation() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new(
                StaticHost::new(page(r#"<footer><a id="t" href="/terms">Terms of Service</a></footer>"#)),
                FakeFetcher::default().html("https://shop.example.com/terms", &policy_html("Terms of Service")),
                FakeSummarizer::default(),
            );
            h.orch.pointer_over(h.node("#t"));
            sleep(Duration::from_secs(2)).await;
            assert!(h.orch.is_visible());

            h.host.replace(page(
                r#"<div class="toast"><p>Added to cart</p></div>
                <footer><a id="t" href="/terms">Terms of Service</a></footer>"#,
            ));
            h.orch.pointer_over(h.node("#t"));
            assert_eq!(h.summarizer.keys().len(), 1);

            h.orch.pointer_out(h.node("#t"));
            sleep(Duration::from_secs(1)).await;
            assert!(!h.orch.is_visible());
            assert_eq!(h.sink.last(), Some(Rendered::Hidden));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_click_retry_finds_nothing() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new(
                StaticHost::new(page(r#"<button onclick="openTerms()">Terms</button>"#)),
                FakeFetcher::default(),
                FakeSummarizer::default(),
            );

            h.orch.pointer_over(h.node("button"));
            sleep(Duration::from_secs(1)).await;
            h.orch.click_and_retry();
            sleep(Duration::from_secs(2)).await;

            assert_eq!(
                h.errors(),
                vec![
                    "Content still not found after clicking. The page may use a different loading mechanism."
                        .to_string()
                ]
            );
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_script_shell_is_unreadable() {
    LocalSet::new()
        .run_until(async {
            let shell = r#"<html><body><div id="root"></div><script>window.boot()</script></body></html>"#;
            let h = Harness::new(
                StaticHost::new(page(r#"<a href="/terms">Terms</a>"#)),
                FakeFetcher::default().html("https://shop.example.com/terms", shell),
                FakeSummarizer::default(),
            );

            h.orch.pointer_over(h.node("a"));
            sleep(Duration::from_secs(2)).await;

            let errors = h.errors();
            assert_eq!(errors.len(), 1);
            assert!(errors[0].starts_with("Could not extract readable text. HTML received:"));
            assert!(h.summarizer.keys().is_empty());
            match h.sink.last() {
                Some(Rendered::Error { url, .. }) => assert_eq!(url, "https://shop.example.com/terms"),
                other => panic!("expected an error, got {:?}", other),
            }
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_blocked_fetch_shows_status() {
    LocalSet::new()
        .run_until(async {
            let blocked = FetchResponse {
                ok: false,
                status: 403,
                final_url: "https://shop.example.com/privacy".into(),
                ..FetchResponse::default()
            };
            let h = Harness::new(
                StaticHost::new(page(r#"<a href="/privacy">Privacy Policy</a>"#)),
                FakeFetcher::default().page("https://shop.example.com/privacy", Duration::ZERO, blocked),
                FakeSummarizer::default(),
            );

            h.orch.pointer_over(h.node("a"));
            sleep(Duration::from_secs(2)).await;

            assert_eq!(
                h.errors(),
                vec!["Fetch failed (403). This site may block automated access.".to_string()]
            );
        })
        .await;
}

// ============================================================================
// CANCELLATION
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_superseded_summary_never_rendered() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new(
                StaticHost::new(page(
                    r#"<footer><a id="a" href="/terms">Terms</a> <a id="b" href="/privacy">Privacy</a></footer>"#,
                )),
                FakeFetcher::default()
                    .html("https://shop.example.com/terms", &policy_html("Terms"))
                    .html("https://shop.example.com/privacy", &policy_html("Privacy Policy")),
                FakeSummarizer::default()
                    .delay("https://shop.example.com/terms", Duration::from_secs(5))
                    .delay("https://shop.example.com/privacy", Duration::from_millis(100)),
            );

            h.orch.pointer_over(h.node("#a"));
            sleep(Duration::from_secs(1)).await;
            h.orch.pointer_over(h.node("#b"));
            sleep(Duration::from_secs(10)).await;

            // The first request still ran to completion
            assert_eq!(
                h.summarizer.keys(),
                vec!["https://shop.example.com/terms", "https://shop.example.com/privacy"]
            );
            let titles: Vec<String> = h.sink.summaries().into_iter().map(|s| s.title).collect();
            assert_eq!(titles, vec!["https://shop.example.com/privacy"]);
            assert_eq!(h.orch.active_anchor(), Some(h.node("#b")));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_superseded_error_never_rendered() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new(
                StaticHost::new(page(
                    r#"<a id="a" href="/terms">Terms</a> <a id="b" href="/privacy">Privacy</a>"#,
                )),
                FakeFetcher::default()
                    .page(
                        "https://shop.example.com/terms",
                        Duration::from_secs(3),
                        FetchResponse {
                            ok: false,
                            status: 500,
                            ..FetchResponse::default()
                        },
                    )
                    .html("https://shop.example.com/privacy", &policy_html("Privacy Policy")),
                FakeSummarizer::default(),
            );

            h.orch.pointer_over(h.node("#a"));
            sleep(Duration::from_secs(1)).await;
            h.orch.pointer_over(h.node("#b"));
            sleep(Duration::from_secs(5)).await;

            assert!(h.errors().is_empty());
            assert_eq!(h.sink.summaries().len(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_leaving_before_delay_cancels() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new(
                StaticHost::new(page(r#"<a id="t" href="/terms">Terms</a>"#)),
                FakeFetcher::default().html("https://shop.example.com/terms", &policy_html("Terms")),
                FakeSummarizer::default(),
            );
            let link = h.node("#t");

            h.orch.pointer_over(link);
            sleep(Duration::from_millis(300)).await;
            h.orch.pointer_out(link);
            sleep(Duration::from_secs(2)).await;

            assert!(h.fetcher.calls().is_empty());
            assert_eq!(h.sink.events(), vec![Rendered::Hidden]);
            assert_eq!(h.orch.state(), SessionState::Idle);
            assert_eq!(h.orch.active_anchor(), None);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_popover_hover_keeps_session() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new(
                StaticHost::new(page(r#"<a id="t" href="/terms">Terms</a>"#)),
                FakeFetcher::default().html("https://shop.example.com/terms", &policy_html("Terms")),
                FakeSummarizer::default(),
            );
            let link = h.node("#t");

            h.orch.pointer_over(link);
            sleep(Duration::from_secs(2)).await;
            assert_eq!(h.orch.state(), SessionState::Displaying);

            // Crossing the gap from link to popover inside the debounce
            h.orch.pointer_out(link);
            sleep(Duration::from_millis(50)).await;
            h.orch.popover_enter();
            sleep(Duration::from_millis(500)).await;
            assert_eq!(h.orch.state(), SessionState::Displaying);
            assert!(h.orch.is_visible());

            h.orch.popover_leave();
            sleep(Duration::from_millis(200)).await;
            assert_eq!(h.orch.state(), SessionState::Idle);
            assert_eq!(h.sink.last(), Some(Rendered::Hidden));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_rehover_same_link_does_not_restart() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new(
                StaticHost::new(page(r#"<a id="t" href="/terms"><span>Terms</span></a>"#)),
                FakeFetcher::default().html("https://shop.example.com/terms", &policy_html("Terms")),
                FakeSummarizer::default(),
            );

            h.orch.pointer_over(h.node("#t"));
            sleep(Duration::from_secs(2)).await;
            let epoch = h.orch.epoch();

            // Moving onto the inner span resolves to the same anchor
            h.orch.pointer_over(h.node("#t span"));
            sleep(Duration::from_secs(2)).await;

            assert_eq!(h.orch.epoch(), epoch);
            assert_eq!(h.fetcher.calls().len(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_auto_hover_disabled() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::with_prefs(
                StaticHost::new(page(r#"<a id="t" href="/terms">Terms</a>"#)),
                FakeFetcher::default(),
                FakeSummarizer::default(),
                Preferences::builder().auto_hover(false).build(),
            );

            h.orch.pointer_over(h.node("#t"));
            sleep(Duration::from_secs(2)).await;

            assert!(h.sink.events().is_empty());
            assert_eq!(h.orch.active_anchor(), None);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_non_legal_link_ignored() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new(
                StaticHost::new(page(r#"<a id="t" href="/blog">Read our blog</a>"#)),
                FakeFetcher::default(),
                FakeSummarizer::default(),
            );

            h.orch.pointer_over(h.node("#t"));
            sleep(Duration::from_secs(2)).await;

            assert!(h.sink.events().is_empty());
            assert!(h.fetcher.calls().is_empty());
        })
        .await;
}
