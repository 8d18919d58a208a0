//! In-memory summary cache

use crate::backend::summarizer::{Summarizer, SummaryResponse};
use crate::backend::summary::Summary;
use crate::error::SummarizeError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::{debug, trace};
use url::Url;

/// How long a summary stays valid
pub const DEFAULT_TTL_DAYS: i64 = 30;

/// Maximum number of cached summaries
pub const DEFAULT_CAPACITY: usize = 200;

#[derive(Debug, Clone)]
struct CacheEntry {
    created_at: DateTime<Utc>,
    summary: Summary,
}

/// Cache key for content identified by `key`.
///
/// URL fragments are dropped so `/terms#section-2` and `/terms` share an
/// entry; the `#link:` suffix of in-page content is kept so each link on a
/// page gets its own entry.
pub fn cache_key(key: &str) -> String {
    match Url::parse(key) {
        Ok(mut url) => {
            if !url.fragment().is_some_and(|f| f.starts_with("link:")) {
                url.set_fragment(None);
            }
            format!("summary:{}", url)
        }
        Err(_) => format!("summary:{}", key),
    }
}

/// Caching wrapper around another summarizer
pub struct CachedSummarizer<S> {
    inner: S,
    entries: RefCell<HashMap<String, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl<S: Summarizer> CachedSummarizer<S> {
    /// Wrap `inner` with the default TTL and capacity
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            entries: RefCell::new(HashMap::new()),
            ttl: Duration::days(DEFAULT_TTL_DAYS),
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Set the time-to-live
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the maximum number of entries
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Number of cached summaries, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Cached summary for `key` as of `now`
    pub fn lookup_at(&self, key: &str, now: DateTime<Utc>) -> Option<Summary> {
        let entries = self.entries.borrow();
        let entry = entries.get(&cache_key(key))?;
        if now - entry.created_at > self.ttl {
            trace!("Cache entry for {} expired", key);
            return None;
        }
        Some(entry.summary.clone())
    }

    /// Store a summary created at `now`, evicting the oldest entries over capacity
    pub fn store_at(&self, key: &str, summary: Summary, now: DateTime<Utc>) {
        let mut entries = self.entries.borrow_mut();
        entries.insert(
            cache_key(key),
            CacheEntry {
                created_at: now,
                summary,
            },
        );

        if entries.len() > self.capacity {
            let mut by_age: Vec<(String, DateTime<Utc>)> = entries
                .iter()
                .map(|(k, e)| (k.clone(), e.created_at))
                .collect();
            by_age.sort_by_key(|(_, created_at)| *created_at);
            let excess = entries.len() - self.capacity;
            for (k, _) in by_age.into_iter().take(excess) {
                entries.remove(&k);
            }
            debug!("Evicted {} cached summaries", excess);
        }
    }
}

#[async_trait(?Send)]
impl<S: Summarizer> Summarizer for CachedSummarizer<S> {
    async fn summarize(
        &self,
        key: &str,
        text: &str,
    ) -> Result<SummaryResponse, SummarizeError> {
        if let Some(summary) = self.lookup_at(key, Utc::now()) {
            debug!("Cache hit for {}", key);
            return Ok(SummaryResponse {
                summary,
                from_cache: true,
            });
        }

        let response = self.inner.summarize(key, text).await?;
        self.store_at(key, response.summary.clone(), Utc::now());
        Ok(SummaryResponse {
            summary: response.summary,
            from_cache: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counting {
        calls: Cell<usize>,
    }

    #[async_trait(?Send)]
    impl Summarizer for Counting {
        async fn summarize(
            &self,
            key: &str,
            _text: &str,
        ) -> Result<SummaryResponse, SummarizeError> {
            self.calls.set(self.calls.get() + 1);
            Ok(SummaryResponse::fresh(Summary {
                title: key.to_string(),
                ..Summary::default()
            }))
        }
    }

    fn counting() -> CachedSummarizer<Counting> {
        CachedSummarizer::new(Counting {
            calls: Cell::new(0),
        })
    }

    #[test]
    fn test_cache_key_fragments() {
        assert_eq!(
            cache_key("https://a.example/terms#section-2"),
            "summary:https://a.example/terms"
        );
        assert_eq!(
            cache_key("https://a.example/cart#link:privacy-link"),
            "summary:https://a.example/cart#link:privacy-link"
        );
        assert_ne!(
            cache_key("https://a.example/cart#link:terms"),
            cache_key("https://a.example/cart#link:privacy")
        );
    }

    #[tokio::test]
    async fn test_second_call_is_cached() {
        let cache = counting();
        let first = cache.summarize("https://a.example/terms", "text").await.unwrap();
        assert!(!first.from_cache);
        let second = cache.summarize("https://a.example/terms#top", "text").await.unwrap();
        assert!(second.from_cache);
        assert_eq!(cache.inner.calls.get(), 1);
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = counting();
        let t0 = Utc::now();
        cache.store_at("https://a.example/terms", Summary::default(), t0);
        assert!(cache
            .lookup_at("https://a.example/terms", t0 + Duration::days(29))
            .is_some());
        assert!(cache
            .lookup_at("https://a.example/terms", t0 + Duration::days(31))
            .is_none());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = counting().with_capacity(2);
        let t0 = Utc::now();
        cache.store_at("https://a.example/1", Summary::default(), t0);
        cache.store_at("https://a.example/2", Summary::default(), t0 + Duration::seconds(1));
        cache.store_at("https://a.example/3", Summary::default(), t0 + Duration::seconds(2));
        assert_eq!(cache.len(), 2);
        assert!(cache.lookup_at("https://a.example/1", t0).is_none());
        assert!(cache.lookup_at("https://a.example/3", t0).is_some());
    }
}
