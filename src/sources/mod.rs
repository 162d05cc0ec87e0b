// src/sources/mod.rs - Listing platform adapters
pub mod cache;
pub mod config;
pub mod google_places;
pub mod scraper_job;
pub mod throttle;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{MatchCandidate, Platform};
use crate::utils::cancel::CancelToken;

pub use cache::CachedAdapter;
pub use config::SourcesConfig;
pub use google_places::GooglePlacesAdapter;
pub use scraper_job::ScraperJobAdapter;
pub use throttle::{RateLimiter, ThrottledAdapter};

/// One listing platform, searched by free text.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Minimum spacing between calls to the upstream.
    fn request_interval(&self) -> Duration {
        Duration::ZERO
    }

    /// Candidate listings for a free-text query. An empty list is a valid answer.
    async fn search(&self, query: &str) -> Result<Vec<MatchCandidate>>;

    /// Whether `fetch_by_id` can return anything.
    fn supports_lookup(&self) -> bool {
        false
    }

    /// Looks up a listing by its platform identifier.
    async fn fetch_by_id(&self, _identifier: &str) -> Result<Option<MatchCandidate>> {
        Ok(None)
    }

    /// Search cache (hits, misses), when the adapter keeps one.
    fn cache_stats(&self) -> Option<(usize, usize)> {
        None
    }
}

/// Upstream failure kinds adapters attach to their errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    RateLimited(String),
    Timeout(String),
    Unavailable(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::RateLimited(msg) => write!(f, "rate limited: {}", msg),
            SourceError::Timeout(msg) => write!(f, "timed out: {}", msg),
            SourceError::Unavailable(msg) => write!(f, "unavailable: {}", msg),
        }
    }
}

impl std::error::Error for SourceError {}

/// How an adapter failure ends a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    Timeout,
    Unavailable,
}

/// Maps an HTTP status to the failure kind it signals, if any.
pub fn failure_for_status(status: reqwest::StatusCode) -> Option<FailureKind> {
    use reqwest::StatusCode;
    match status {
        StatusCode::TOO_MANY_REQUESTS => Some(FailureKind::RateLimited),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Some(FailureKind::Timeout),
        s if s.is_success() => None,
        _ => Some(FailureKind::Unavailable),
    }
}

// A bare status code, not part of a longer number ("1429 Main St").
static RATE_LIMIT_STATUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b429\b").expect("rate limit status pattern"));

/// Wraps a transport error in the matching `SourceError`.
pub fn source_error_from_reqwest(context: &str, err: reqwest::Error) -> SourceError {
    let message = format!("{}: {}", context, err);
    if err.is_timeout() {
        return SourceError::Timeout(message);
    }
    match err.status().and_then(failure_for_status) {
        Some(FailureKind::RateLimited) => SourceError::RateLimited(message),
        Some(FailureKind::Timeout) => SourceError::Timeout(message),
        _ => SourceError::Unavailable(message),
    }
}

/// Classifies an adapter error, preferring a typed `SourceError` anywhere in the chain and
/// falling back to message patterns for foreign errors.
pub fn classify_error(err: &anyhow::Error) -> FailureKind {
    for cause in err.chain() {
        if let Some(source_err) = cause.downcast_ref::<SourceError>() {
            return match source_err {
                SourceError::RateLimited(_) => FailureKind::RateLimited,
                SourceError::Timeout(_) => FailureKind::Timeout,
                SourceError::Unavailable(_) => FailureKind::Unavailable,
            };
        }
        if let Some(http_err) = cause.downcast_ref::<reqwest::Error>() {
            if http_err.is_timeout() {
                return FailureKind::Timeout;
            }
            if let Some(kind) = http_err.status().and_then(failure_for_status) {
                return kind;
            }
        }
    }

    let message = format!("{:#}", err).to_lowercase();
    if RATE_LIMIT_STATUS.is_match(&message)
        || message.contains("rate limit")
        || message.contains("too many requests")
    {
        FailureKind::RateLimited
    } else if message.contains("timed out") || message.contains("timeout") {
        FailureKind::Timeout
    } else {
        FailureKind::Unavailable
    }
}

/// Builds the adapter stack for one platform: the platform client, throttled to its
/// request interval, behind a search cache when one is configured. `cancel` stops
/// scraper job polling.
pub fn build_adapter(
    platform: Platform,
    config: &SourcesConfig,
    cancel: &CancelToken,
) -> Result<Arc<dyn SourceAdapter>> {
    let base: Arc<dyn SourceAdapter> = match platform {
        Platform::GooglePlaces => Arc::new(
            GooglePlacesAdapter::from_config(config)
                .context("Failed to build Google Places adapter")?,
        ),
        Platform::Booking | Platform::TripAdvisor | Platform::Expedia => Arc::new(
            ScraperJobAdapter::from_config(platform, config)
                .with_context(|| format!("Failed to build scraper adapter for {}", platform))?
                .with_cancel(cancel.clone()),
        ),
    };

    let interval = config.request_interval(platform);
    let throttled: Arc<dyn SourceAdapter> = Arc::new(ThrottledAdapter::new(base, interval));
    let adapter: Arc<dyn SourceAdapter> = if config.search_cache_size > 0 {
        Arc::new(CachedAdapter::new(throttled, config.search_cache_size))
    } else {
        throttled
    };

    info!(
        "Adapter ready for {}: interval={}ms, cache={}",
        platform,
        interval.as_millis(),
        config.search_cache_size
    );
    Ok(adapter)
}

/// Builds one adapter per requested platform, failing on the first misconfiguration.
pub fn build_adapters(
    platforms: &[Platform],
    config: &SourcesConfig,
    cancel: &CancelToken,
) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    platforms
        .iter()
        .map(|p| build_adapter(*p, config, cancel))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_typed_errors_survive_context() {
        let err = anyhow::Error::new(SourceError::RateLimited("quota".into()))
            .context("search failed");
        assert_eq!(classify_error(&err), FailureKind::RateLimited);

        let err = anyhow::Error::new(SourceError::Timeout("slow".into()));
        assert_eq!(classify_error(&err), FailureKind::Timeout);
    }

    #[test]
    fn test_message_fallback() {
        assert_eq!(
            classify_error(&anyhow!("HTTP 429 from upstream")),
            FailureKind::RateLimited
        );
        assert_eq!(
            classify_error(&anyhow!("operation timed out")),
            FailureKind::Timeout
        );
        assert_eq!(
            classify_error(&anyhow!("Gateway Timeout while fetching")),
            FailureKind::Timeout
        );
        assert_eq!(
            classify_error(&anyhow!("connection refused")),
            FailureKind::Unavailable
        );
        assert_eq!(
            classify_error(&anyhow!("Too Many Requests: slow down")),
            FailureKind::RateLimited
        );
    }

    #[test]
    fn test_numbers_containing_429_are_not_rate_limits() {
        assert_eq!(
            classify_error(&anyhow!("no listing parsed for 1429 Main St")),
            FailureKind::Unavailable
        );
        assert_eq!(
            classify_error(&anyhow!("scraper run a4290b failed")),
            FailureKind::Unavailable
        );
        assert_eq!(
            classify_error(&anyhow!("upstream answered 503 Service Unavailable")),
            FailureKind::Unavailable
        );
    }

    #[test]
    fn test_status_mapping() {
        use reqwest::StatusCode;
        assert_eq!(
            failure_for_status(StatusCode::TOO_MANY_REQUESTS),
            Some(FailureKind::RateLimited)
        );
        assert_eq!(
            failure_for_status(StatusCode::SERVICE_UNAVAILABLE),
            Some(FailureKind::Unavailable)
        );
        assert_eq!(
            failure_for_status(StatusCode::GATEWAY_TIMEOUT),
            Some(FailureKind::Timeout)
        );
        assert_eq!(
            failure_for_status(StatusCode::FORBIDDEN),
            Some(FailureKind::Unavailable)
        );
        assert_eq!(failure_for_status(StatusCode::OK), None);
    }

    #[test]
    fn test_build_adapter_requires_credentials() {
        let cancel = CancelToken::new();
        let config = SourcesConfig::default();
        assert!(build_adapter(Platform::GooglePlaces, &config, &cancel).is_err());
        assert!(build_adapter(Platform::Booking, &config, &cancel).is_err());

        let mut config = SourcesConfig::default();
        config.google_places_api_key = Some("key".to_string());
        config.scraper_api_token = Some("token".to_string());
        let adapter = build_adapter(Platform::Booking, &config, &cancel).unwrap();
        assert_eq!(adapter.platform(), Platform::Booking);
        assert_eq!(adapter.request_interval(), config.request_interval(Platform::Booking));
        assert_eq!(adapter.cache_stats(), Some((0, 0)));
        let adapters = build_adapters(&Platform::ALL, &config, &cancel).unwrap();
        assert_eq!(adapters.len(), 4);

        config.search_cache_size = 0;
        let adapter = build_adapter(Platform::Expedia, &config, &cancel).unwrap();
        assert_eq!(adapter.cache_stats(), None);
    }
}
