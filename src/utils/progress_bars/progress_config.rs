// src/utils/progress_bars/progress_config.rs
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::utils::env::env_or;

const DEFAULT_TICK_MS: u64 = 100;
const MIN_TICK_MS: u64 = 10;
const BATCH_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} properties {msg}";

/// What a batch run shows while it works and when it ends.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressConfig {
    /// Master switch for the batch bar and every summary below.
    pub enabled: bool,
    /// Per-property phase callback on top of the batch bar.
    pub detailed: bool,
    pub tick: Duration,
    /// Search cache hits and misses per platform at the end of a run.
    pub show_cache_stats: bool,
    pub show_db_connection_stats: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detailed: true,
            tick: Duration::from_millis(DEFAULT_TICK_MS),
            show_cache_stats: true,
            show_db_connection_stats: true,
        }
    }
}

impl ProgressConfig {
    /// Reads the `PROGRESS_*` variables. Unset or malformed values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let tick_ms: u64 = env_or("PROGRESS_REFRESH_RATE_MS", DEFAULT_TICK_MS);
        Self {
            enabled: env_or("PROGRESS_ENABLED", defaults.enabled),
            detailed: env_or("PROGRESS_DETAILED", defaults.detailed),
            tick: Duration::from_millis(tick_ms.max(MIN_TICK_MS)),
            show_cache_stats: env_or("PROGRESS_SHOW_CACHE_STATS", defaults.show_cache_stats),
            show_db_connection_stats: env_or(
                "PROGRESS_SHOW_DB_CONNECTIONS",
                defaults.show_db_connection_stats,
            ),
        }
    }

    pub fn create_multi_progress(&self) -> Option<MultiProgress> {
        self.enabled.then(MultiProgress::new)
    }

    /// The run-wide bar: one step per property, message updated with the resolved count.
    pub fn batch_bar(&self, multi: &MultiProgress, properties: usize) -> ProgressBar {
        let pb = multi.add(ProgressBar::new(properties as u64));
        let style = ProgressStyle::default_bar()
            .template(BATCH_BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ");
        pb.set_style(style);
        pb.enable_steady_tick(self.tick);
        pb.set_message("starting");
        pb
    }

    pub fn should_show_detailed(&self) -> bool {
        self.enabled && self.detailed
    }

    pub fn should_show_cache_stats(&self) -> bool {
        self.enabled && self.show_cache_stats
    }

    pub fn should_show_db_connection_stats(&self) -> bool {
        self.enabled && self.show_db_connection_stats
    }
}
