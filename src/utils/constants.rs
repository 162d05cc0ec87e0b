// src/utils/constants.rs

/// Confidence attached to exact and containment name matches.
pub const EXACT_MATCH_CONFIDENCE: f64 = 0.9;
/// Confidence attached to word-overlap name matches.
pub const WORD_OVERLAP_CONFIDENCE: f64 = 0.85;
/// Confidence attached to every non-match.
pub const NON_MATCH_CONFIDENCE: f64 = 0.3;
/// Minimum confidence for an automatic resolution.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.8;

pub const DEFAULT_MAX_QUERIES: usize = 3;
pub const DEFAULT_MAX_CANDIDATES: usize = 5;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 45;
pub const DEFAULT_INTER_PLATFORM_DELAY_MS: u64 = 2000;
pub const DEFAULT_MAX_CONCURRENT_UNITS: usize = 4;

pub const DEFAULT_SEARCH_CACHE_SIZE: usize = 2000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 20;
