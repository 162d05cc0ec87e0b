// src/sources/config.rs
use log::info;
use std::collections::HashMap;
use std::time::Duration;

use super::google_places::PLACES_BASE_URL;
use crate::models::Platform;
use crate::utils::constants::{
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_POLL_MAX_ATTEMPTS, DEFAULT_SEARCH_CACHE_SIZE,
};
use crate::utils::env::{env_or, env_string};
use crate::utils::poll::PollSchedule;

pub const DEFAULT_SCRAPER_BASE_URL: &str = "https://api.apify.com/v2";
pub const DEFAULT_BOOKING_ACTOR: &str = "voyager~booking-scraper";
pub const DEFAULT_TRIPADVISOR_ACTOR: &str = "maxcopell~tripadvisor";
pub const DEFAULT_EXPEDIA_ACTOR: &str = "jupri~expedia-hotels";

fn default_interval_ms(platform: Platform) -> u64 {
    match platform {
        Platform::GooglePlaces => 200,
        Platform::Booking => 2000,
        Platform::TripAdvisor => 3000,
        Platform::Expedia => 2000,
    }
}

/// Credentials and pacing for the listing platforms.
#[derive(Debug, Clone)]
pub struct SourcesConfig {
    pub google_places_api_key: Option<String>,
    pub places_base_url: String,
    pub scraper_api_token: Option<String>,
    pub scraper_base_url: String,
    pub actor_ids: HashMap<Platform, String>,
    pub request_intervals: HashMap<Platform, Duration>,
    /// Results requested per search
    pub max_results: usize,
    /// Zero disables the search cache
    pub search_cache_size: usize,
    pub poll: PollSchedule,
    pub http_timeout: Duration,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        let actor_ids = [
            (Platform::Booking, DEFAULT_BOOKING_ACTOR),
            (Platform::TripAdvisor, DEFAULT_TRIPADVISOR_ACTOR),
            (Platform::Expedia, DEFAULT_EXPEDIA_ACTOR),
        ]
        .into_iter()
        .map(|(p, id)| (p, id.to_string()))
        .collect();
        let request_intervals = Platform::ALL
            .iter()
            .map(|p| (*p, Duration::from_millis(default_interval_ms(*p))))
            .collect();

        Self {
            google_places_api_key: None,
            places_base_url: PLACES_BASE_URL.to_string(),
            scraper_api_token: None,
            scraper_base_url: DEFAULT_SCRAPER_BASE_URL.to_string(),
            actor_ids,
            request_intervals,
            max_results: 10,
            search_cache_size: DEFAULT_SEARCH_CACHE_SIZE,
            poll: PollSchedule {
                interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
                max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
            },
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl SourcesConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut actor_ids = defaults.actor_ids.clone();
        for platform in [Platform::Booking, Platform::TripAdvisor, Platform::Expedia] {
            if let Some(id) = env_string(&format!("{}_ACTOR_ID", platform.env_prefix())) {
                actor_ids.insert(platform, id);
            }
        }

        let request_intervals = Platform::ALL
            .iter()
            .map(|p| {
                let key = format!("{}_REQUEST_INTERVAL_MS", p.env_prefix());
                (*p, Duration::from_millis(env_or(&key, default_interval_ms(*p))))
            })
            .collect();

        Self {
            google_places_api_key: env_string("GOOGLE_PLACES_API_KEY"),
            places_base_url: env_string("GOOGLE_PLACES_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.places_base_url),
            scraper_api_token: env_string("SCRAPER_API_TOKEN"),
            scraper_base_url: env_string("SCRAPER_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.scraper_base_url),
            actor_ids,
            request_intervals,
            max_results: env_or("SOURCE_MAX_RESULTS", defaults.max_results).max(1),
            search_cache_size: env_or("SEARCH_CACHE_SIZE", defaults.search_cache_size),
            poll: PollSchedule {
                interval: Duration::from_millis(env_or(
                    "SCRAPER_POLL_INTERVAL_MS",
                    DEFAULT_POLL_INTERVAL_MS,
                )),
                max_attempts: env_or("SCRAPER_POLL_MAX_ATTEMPTS", DEFAULT_POLL_MAX_ATTEMPTS).max(1),
            },
            http_timeout: Duration::from_secs(env_or("SOURCE_HTTP_TIMEOUT_SECS", 30u64).max(1)),
        }
    }

    pub fn request_interval(&self, platform: Platform) -> Duration {
        self.request_intervals
            .get(&platform)
            .copied()
            .unwrap_or_else(|| Duration::from_millis(default_interval_ms(platform)))
    }

    pub fn actor_id(&self, platform: Platform) -> Option<&str> {
        self.actor_ids.get(&platform).map(String::as_str)
    }

    /// Logs the configuration without exposing secrets.
    pub fn log_config(&self) {
        info!(
            "🔌 Sources: google key set={}, scraper token set={}, scraper url={}, cache={}, poll={}x{}ms",
            self.google_places_api_key.is_some(),
            self.scraper_api_token.is_some(),
            self.scraper_base_url,
            self.search_cache_size,
            self.poll.max_attempts,
            self.poll.interval.as_millis()
        );
        for platform in Platform::ALL {
            info!(
                "   • {}: interval={}ms actor={}",
                platform,
                self.request_interval(platform).as_millis(),
                self.actor_id(platform).unwrap_or("-")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = SourcesConfig::default();
        assert!(config.google_places_api_key.is_none());
        assert_eq!(config.scraper_base_url, DEFAULT_SCRAPER_BASE_URL);
        assert_eq!(config.places_base_url, PLACES_BASE_URL);
        assert_eq!(config.actor_id(Platform::Booking), Some(DEFAULT_BOOKING_ACTOR));
        assert_eq!(config.actor_id(Platform::GooglePlaces), None);
        assert_eq!(
            config.request_interval(Platform::TripAdvisor),
            Duration::from_millis(3000)
        );
        assert_eq!(config.search_cache_size, DEFAULT_SEARCH_CACHE_SIZE);
    }

    #[test]
    fn test_env_config() {
        env::set_var("SCRAPER_API_TOKEN", "tok");
        env::set_var("SCRAPER_BASE_URL", "http://localhost:9000/v2/");
        env::set_var("EXPEDIA_ACTOR_ID", "acme~expedia");
        env::set_var("BOOKING_REQUEST_INTERVAL_MS", "750");
        env::set_var("SEARCH_CACHE_SIZE", "0");

        let config = SourcesConfig::from_env();
        assert_eq!(config.scraper_api_token.as_deref(), Some("tok"));
        assert_eq!(config.scraper_base_url, "http://localhost:9000/v2");
        assert_eq!(config.actor_id(Platform::Expedia), Some("acme~expedia"));
        assert_eq!(config.request_interval(Platform::Booking), Duration::from_millis(750));
        assert_eq!(config.search_cache_size, 0);

        env::remove_var("SCRAPER_API_TOKEN");
        env::remove_var("SCRAPER_BASE_URL");
        env::remove_var("EXPEDIA_ACTOR_ID");
        env::remove_var("BOOKING_REQUEST_INTERVAL_MS");
        env::remove_var("SEARCH_CACHE_SIZE");
    }
}
