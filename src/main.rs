//! TermsDigest command-line front end
//!
//! Runs the detection, extraction and summarization pipeline outside a
//! browser: scan a saved page for legal links, print the readable text of a
//! legal document, or summarize it through the backend.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use termsdigest::backend::{fetch_readable_text, BackendSummarizer, CachedSummarizer, HttpFetcher, PageFetcher, Summarizer};
use termsdigest::config::{BackendConfig, FilePreferences, PreferenceSource, Preferences};
use termsdigest::detection::{normalize, ContentType, LinkScanner};
use termsdigest::dom::{query, Page};
use termsdigest::extraction::LinkResolver;
use termsdigest::render::{ErrorNotice, SummaryView};
use url::Url;

/// TermsDigest CLI
#[derive(Parser, Debug)]
#[command(name = "termsdigest")]
#[command(author = "TermsDigest Team <team@termsdigest.com>")]
#[command(version)]
#[command(about = "Find, extract and summarize legal documents linked from a page")]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Fetch timeout in seconds
    #[arg(long, default_value = "30", global = true)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the legal links on a page and where each one leads
    Scan {
        /// HTML file or http(s) URL
        source: String,

        /// Base URL for resolving relative links (defaults to the source)
        #[arg(long)]
        base: Option<Url>,
    },

    /// Print the readable text of a legal document
    Extract {
        /// Document URL
        url: Url,
    },

    /// Summarize a legal document through the backend
    ///
    /// Reads TERMSDIGEST_BACKEND_URL, TERMSDIGEST_TOKEN and
    /// TERMSDIGEST_TIMEOUT_SECS from the environment.
    Summarize {
        /// Document URL
        url: Url,

        /// Preferences file (JSON, same keys as the extension settings)
        #[arg(long)]
        prefs: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let fetcher = HttpFetcher::new(Duration::from_secs(args.timeout))?;

    match args.command {
        Command::Scan { source, base } => scan(&fetcher, &source, base).await,
        Command::Extract { url } => {
            let fetched = fetch_readable_text(&fetcher, &url).await?;
            eprintln!("{} chars from {}", fetched.content.length, fetched.final_url);
            println!("{}", fetched.content.text);
            Ok(())
        }
        Command::Summarize { url, prefs } => summarize(&fetcher, &url, prefs).await,
    }
}

async fn load_page(fetcher: &dyn PageFetcher, source: &str, base: Option<Url>) -> anyhow::Result<Page> {
    if let Ok(url) = Url::parse(source) {
        if matches!(url.scheme(), "http" | "https") {
            let response = fetcher.fetch_page(&url).await?.error_for_status()?;
            let page_url = match base {
                Some(base) => base,
                None => Url::parse(&response.final_url).unwrap_or(url),
            };
            return Ok(Page::parse(page_url, &response.html));
        }
    }

    let path = std::fs::canonicalize(source).with_context(|| format!("cannot open {source}"))?;
    let html = std::fs::read_to_string(&path).with_context(|| format!("cannot read {}", path.display()))?;
    let page_url = match base {
        Some(base) => base,
        None => Url::from_file_path(&path).map_err(|_| anyhow!("cannot turn {} into a URL", path.display()))?,
    };
    Ok(Page::parse(page_url, &html))
}

async fn scan(fetcher: &dyn PageFetcher, source: &str, base: Option<Url>) -> anyhow::Result<()> {
    let page = load_page(fetcher, source, base).await?;
    let resolver = LinkResolver::new();
    let mut scanner = LinkScanner::new();

    let found = scanner.scan(&page);
    if found.is_empty() {
        println!("No legal links found on {}", page.url());
        return Ok(());
    }

    for id in found {
        let Some(el) = page.element(id) else {
            continue;
        };
        let label = normalize(query::text_content(el).as_str());
        let target = resolver
            .resolve(&page, el)
            .map_or_else(|| "nothing to summarize".to_string(), |t| t.to_string());
        println!("[{}] {} -> {}", ContentType::classify(el), label, target);
    }
    Ok(())
}

async fn summarize(fetcher: &dyn PageFetcher, url: &Url, prefs: Option<PathBuf>) -> anyhow::Result<()> {
    let prefs = match prefs {
        Some(path) => FilePreferences::new(path).preferences()?,
        None => Preferences::default(),
    };
    let config = BackendConfig::from_env()?;
    let summarizer = CachedSummarizer::new(BackendSummarizer::new(config)?);

    let fetched = fetch_readable_text(fetcher, url).await?;
    match summarizer.summarize(&fetched.final_url, &fetched.content.text).await {
        Ok(response) => {
            println!("{}", SummaryView::new(&response.summary, &prefs, response.from_cache));
            println!("Source: {}", fetched.final_url);
            Ok(())
        }
        Err(e) => {
            let notice = ErrorNotice::from_message(&e.to_string());
            Err(anyhow!("{}: {}", notice.title, notice.message))
        }
    }
}
