// src/utils/resolver_config.rs
use log::info;
use std::time::Duration;

use super::constants::*;
use super::env::env_or;

/// Tunables of a resolution run.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Query variants tried per (property, platform)
    pub max_queries: usize,
    /// Candidates evaluated per query response
    pub max_candidates: usize,
    /// Upper bound on a single adapter call
    pub call_timeout: Duration,
    pub match_threshold: f64,
    /// Pause between platforms when one property is resolved everywhere
    pub inter_platform_delay: Duration,
    /// Worker pool size for batch runs
    pub max_concurrent_units: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_queries: DEFAULT_MAX_QUERIES,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            inter_platform_delay: Duration::from_millis(DEFAULT_INTER_PLATFORM_DELAY_MS),
            max_concurrent_units: DEFAULT_MAX_CONCURRENT_UNITS,
        }
    }
}

impl ResolverConfig {
    pub fn from_env() -> Self {
        Self {
            max_queries: env_or("RESOLVER_MAX_QUERIES", DEFAULT_MAX_QUERIES).max(1),
            max_candidates: env_or("RESOLVER_MAX_CANDIDATES", DEFAULT_MAX_CANDIDATES).max(1),
            call_timeout: Duration::from_secs(
                env_or("RESOLVER_CALL_TIMEOUT_SECS", DEFAULT_CALL_TIMEOUT_SECS).max(1),
            ),
            match_threshold: env_or("RESOLVER_MATCH_THRESHOLD", DEFAULT_MATCH_THRESHOLD),
            inter_platform_delay: Duration::from_millis(env_or(
                "RESOLVER_INTER_PLATFORM_DELAY_MS",
                DEFAULT_INTER_PLATFORM_DELAY_MS,
            )),
            max_concurrent_units: env_or(
                "RESOLVER_MAX_CONCURRENT_UNITS",
                DEFAULT_MAX_CONCURRENT_UNITS,
            )
            .max(1),
        }
    }

    pub fn log_config(&self) {
        info!(
            "⚙️  Resolver config: max_queries={}, max_candidates={}, call_timeout={}s, threshold={:.2}, inter_platform_delay={}ms, workers={}",
            self.max_queries,
            self.max_candidates,
            self.call_timeout.as_secs(),
            self.match_threshold,
            self.inter_platform_delay.as_millis(),
            self.max_concurrent_units
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert_eq!(config.max_queries, 3);
        assert_eq!(config.max_candidates, 5);
        assert_eq!(config.call_timeout, Duration::from_secs(45));
        assert_eq!(config.match_threshold, 0.8);
        assert_eq!(config.inter_platform_delay, Duration::from_millis(2000));
        assert_eq!(config.max_concurrent_units, 4);
    }

    #[test]
    fn test_env_config() {
        env::set_var("RESOLVER_MAX_QUERIES", "2");
        env::set_var("RESOLVER_MAX_CANDIDATES", "0");
        env::set_var("RESOLVER_CALL_TIMEOUT_SECS", "10");
        env::set_var("RESOLVER_MATCH_THRESHOLD", "0.85");
        env::set_var("RESOLVER_INTER_PLATFORM_DELAY_MS", "0");
        env::set_var("RESOLVER_MAX_CONCURRENT_UNITS", "not-a-number");

        let config = ResolverConfig::from_env();
        assert_eq!(config.max_queries, 2);
        assert_eq!(config.max_candidates, 1);
        assert_eq!(config.call_timeout, Duration::from_secs(10));
        assert_eq!(config.match_threshold, 0.85);
        assert_eq!(config.inter_platform_delay, Duration::ZERO);
        assert_eq!(config.max_concurrent_units, 4);

        env::remove_var("RESOLVER_MAX_QUERIES");
        env::remove_var("RESOLVER_MAX_CANDIDATES");
        env::remove_var("RESOLVER_CALL_TIMEOUT_SECS");
        env::remove_var("RESOLVER_MATCH_THRESHOLD");
        env::remove_var("RESOLVER_INTER_PLATFORM_DELAY_MS");
        env::remove_var("RESOLVER_MAX_CONCURRENT_UNITS");
    }
}
