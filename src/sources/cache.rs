// src/sources/cache.rs - LRU cache of search results
use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::SourceAdapter;
use crate::models::{MatchCandidate, Platform};

/// Caches successful search responses by normalized query text. Errors are never cached,
/// and identifier lookups always go upstream.
pub struct CachedAdapter {
    inner: Arc<dyn SourceAdapter>,
    cache: Mutex<LruCache<String, Vec<MatchCandidate>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl CachedAdapter {
    pub fn new(inner: Arc<dyn SourceAdapter>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        info!(
            "Initializing search cache for {} with capacity: {}",
            inner.platform(),
            capacity
        );
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn cache_key(query: &str) -> String {
        query
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// (hits, misses)
    pub fn stats(&self) -> (usize, usize) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

#[async_trait]
impl SourceAdapter for CachedAdapter {
    fn platform(&self) -> Platform {
        self.inner.platform()
    }

    fn request_interval(&self) -> Duration {
        self.inner.request_interval()
    }

    async fn search(&self, query: &str) -> Result<Vec<MatchCandidate>> {
        let key = Self::cache_key(query);
        if let Some(hit) = self.cache.lock().await.get(&key) {
            let hits = self.hits.fetch_add(1, Ordering::Relaxed) + 1;
            if hits % 100 == 0 {
                let misses = self.misses.load(Ordering::Relaxed);
                info!(
                    "Search cache stats for {} - hits: {}, misses: {}, hit rate: {:.2}%",
                    self.inner.platform(),
                    hits,
                    misses,
                    (hits as f64 / (hits + misses) as f64) * 100.0
                );
            }
            debug!("Search cache hit for \"{}\"", key);
            return Ok(hit.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let candidates = self.inner.search(query).await?;
        self.cache.lock().await.put(key, candidates.clone());
        Ok(candidates)
    }

    fn supports_lookup(&self) -> bool {
        self.inner.supports_lookup()
    }

    async fn fetch_by_id(&self, identifier: &str) -> Result<Option<MatchCandidate>> {
        self.inner.fetch_by_id(identifier).await
    }

    fn cache_stats(&self) -> Option<(usize, usize)> {
        Some(self.stats())
    }
}
