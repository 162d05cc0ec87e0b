// src/utils/progress_bars/logging.rs - Logging helpers for resolution units and batch runs
use log::{debug, error, info, warn};
use std::time::{Duration, Instant};

use crate::models::{MatchCandidate, Platform, ResolutionRecord, ResolutionStatus, ScoredCandidate};

fn platform_tag(platform: Platform) -> (&'static str, &'static str) {
    match platform {
        Platform::GooglePlaces => ("GOOGLE", "🗺️"),
        Platform::Booking => ("BOOKING", "🛏️"),
        Platform::TripAdvisor => ("TRIPADVISOR", "🦉"),
        Platform::Expedia => ("EXPEDIA", "✈️"),
    }
}

pub fn status_emoji(status: ResolutionStatus) -> &'static str {
    match status {
        ResolutionStatus::Resolved => "✅",
        ResolutionStatus::NeedsReview => "🔍",
        ResolutionStatus::NotListed => "🚫",
        ResolutionStatus::ScrapeFailed => "❌",
        ResolutionStatus::Timeout => "⏰",
    }
}

/// Lifecycle logging for one (property, platform) unit.
#[derive(Clone)]
pub struct ResolutionLogger {
    platform_name: &'static str,
    platform_emoji: &'static str,
    property_id: String,
    start_time: Instant,
}

impl ResolutionLogger {
    pub fn new(platform: Platform, property_id: &str) -> Self {
        let (platform_name, platform_emoji) = platform_tag(platform);
        Self {
            platform_name,
            platform_emoji,
            property_id: property_id.to_string(),
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, property_name: &str, city: &str, query_count: usize) {
        info!(
            "[{}] {} 🚀 Resolving '{}' ({}) for property {} with {} query variants",
            self.platform_name,
            self.platform_emoji,
            property_name,
            city,
            self.property_id,
            query_count
        );
    }

    pub fn log_known_identifier(&self, identifier: &str) {
        debug!(
            "[{}] {} 🔑 Trying known identifier {} for property {}",
            self.platform_name, self.platform_emoji, identifier, self.property_id
        );
    }

    pub fn log_query_attempt(&self, attempt: usize, total: usize, query: &str) {
        debug!(
            "[{}] {} 🔎 Query {}/{}: \"{}\" [+{:.1}s]",
            self.platform_name,
            self.platform_emoji,
            attempt,
            total,
            query,
            self.start_time.elapsed().as_secs_f32()
        );
    }

    pub fn log_candidates(&self, query: &str, candidates: &[MatchCandidate]) {
        if candidates.is_empty() {
            debug!(
                "[{}] {} 📭 No candidates for \"{}\"",
                self.platform_name, self.platform_emoji, query
            );
        } else {
            debug!(
                "[{}] {} 📊 {} candidates for \"{}\"",
                self.platform_name,
                self.platform_emoji,
                candidates.len(),
                query
            );
        }
    }

    pub fn log_verdict(&self, scored: &ScoredCandidate) {
        debug!(
            "[{}] {} ⚖️  '{}' -> match={} city_ok={} confidence={:.2}: {}",
            self.platform_name,
            self.platform_emoji,
            scored.candidate.display_name,
            scored.verdict.is_match,
            scored.city_ok,
            scored.confidence,
            scored.verdict.reason
        );
    }

    pub fn log_city_rejection(&self, scored: &ScoredCandidate, expected_city: &str) {
        info!(
            "[{}] {} 📍 Name matched '{}' but address {:?} is not in {}",
            self.platform_name,
            self.platform_emoji,
            scored.candidate.display_name,
            scored.candidate.formatted_address,
            expected_city
        );
    }

    pub fn log_query_error(&self, query: &str, error: &str) {
        warn!(
            "[{}] {} ⚠️  Query \"{}\" failed for property {}: {}",
            self.platform_name, self.platform_emoji, query, self.property_id, error
        );
    }

    pub fn log_cancelled(&self) {
        info!(
            "[{}] {} 🛑 Resolution of property {} cancelled after {:.2?}",
            self.platform_name,
            self.platform_emoji,
            self.property_id,
            self.start_time.elapsed()
        );
    }

    pub fn log_outcome(&self, record: &ResolutionRecord) {
        let emoji = status_emoji(record.status);
        match record.status {
            ResolutionStatus::Resolved => info!(
                "[{}] {} {} Property {} resolved to '{}' ({}) in {:.2?}: {}",
                self.platform_name,
                self.platform_emoji,
                emoji,
                self.property_id,
                record.display_name.as_deref().unwrap_or_default(),
                record
                    .identifier
                    .as_deref()
                    .or(record.url.as_deref())
                    .unwrap_or_default(),
                self.elapsed(),
                record.match_reason.as_deref().unwrap_or_default()
            ),
            ResolutionStatus::NeedsReview => info!(
                "[{}] {} {} Property {} needs review: {} candidates after {} queries",
                self.platform_name,
                self.platform_emoji,
                emoji,
                self.property_id,
                record.candidates.len(),
                record.attempts
            ),
            ResolutionStatus::NotListed => info!(
                "[{}] {} {} Property {} not listed after {} queries",
                self.platform_name, self.platform_emoji, emoji, self.property_id, record.attempts
            ),
            ResolutionStatus::ScrapeFailed | ResolutionStatus::Timeout => error!(
                "[{}] {} {} Property {} ended as {} after {:.2?}: {}",
                self.platform_name,
                self.platform_emoji,
                emoji,
                self.property_id,
                record.status.as_str(),
                self.elapsed(),
                record.last_error.as_deref().unwrap_or_default()
            ),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

// Batch-level logging functions
pub fn log_batch_start(run_id: &str, property_count: usize, platforms: &[Platform], workers: usize) {
    info!("🚀 ===== PROPERTY RESOLUTION RUN STARTING =====");
    info!("📅 Run ID: {}", run_id);
    info!("⚙️  Configuration:");
    info!("   • {} properties", property_count);
    info!(
        "   • Platforms: {}",
        platforms
            .iter()
            .map(|p| {
                let (name, emoji) = platform_tag(*p);
                format!("{} {}", name, emoji)
            })
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!("   • Concurrency limit: {} simultaneous properties", workers);
    info!("================================================");
}

pub fn log_batch_progress(completed: usize, total: usize, resolved_so_far: usize) {
    info!(
        "📊 Run Progress: {}/{} properties completed, {} listings resolved so far",
        completed, total, resolved_so_far
    );
}

pub fn log_batch_completion(
    run_id: &str,
    duration: Duration,
    status_counts: &[(ResolutionStatus, usize)],
    store_errors: usize,
    cancelled: bool,
) {
    info!("🎉 ===== PROPERTY RESOLUTION RUN COMPLETED =====");
    info!("📅 Run ID: {}", run_id);
    info!("⏱️  Total Duration: {:.2?}", duration);
    info!("📈 Status Breakdown:");
    for (status, count) in status_counts {
        info!("  {} {}: {}", status_emoji(*status), status.as_str(), count);
    }
    if store_errors > 0 {
        warn!("⚠️  {} records could not be written to the store", store_errors);
    }
    if cancelled {
        warn!("🛑 Run was cancelled before every unit finished");
    }
    info!("================================================");
}
