// src/sources/throttle.rs - Fixed-interval pacing shared by every caller of an adapter
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{sleep, Instant};

use super::SourceAdapter;
use crate::models::{MatchCandidate, Platform};

/// Spaces calls at least `interval` apart, across all tasks holding the limiter.
pub struct RateLimiter {
    interval: Duration,
    last_tick: AsyncMutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: AsyncMutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }
        let mut guard = self.last_tick.lock().await;
        if let Some(prev) = *guard {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                sleep(self.interval - elapsed).await;
            }
        }
        *guard = Some(Instant::now());
    }
}

/// Applies a `RateLimiter` in front of every upstream call of the wrapped adapter.
pub struct ThrottledAdapter {
    inner: Arc<dyn SourceAdapter>,
    limiter: RateLimiter,
}

impl ThrottledAdapter {
    pub fn new(inner: Arc<dyn SourceAdapter>, interval: Duration) -> Self {
        Self {
            inner,
            limiter: RateLimiter::new(interval),
        }
    }
}

#[async_trait]
impl SourceAdapter for ThrottledAdapter {
    fn platform(&self) -> Platform {
        self.inner.platform()
    }

    fn request_interval(&self) -> Duration {
        self.limiter.interval()
    }

    async fn search(&self, query: &str) -> Result<Vec<MatchCandidate>> {
        self.limiter.wait().await;
        self.inner.search(query).await
    }

    fn supports_lookup(&self) -> bool {
        self.inner.supports_lookup()
    }

    async fn fetch_by_id(&self, identifier: &str) -> Result<Option<MatchCandidate>> {
        self.limiter.wait().await;
        self.inner.fetch_by_id(identifier).await
    }
}
