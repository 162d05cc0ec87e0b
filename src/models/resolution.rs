// src/models/resolution.rs
use anyhow::{anyhow, Result};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::core::Platform;
use super::matching::ScoredCandidate;

/// Marker prepended to `last_error` when an upstream signalled rate limiting.
pub const RATE_LIMITED_MARKER: &str = "RATE_LIMITED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Resolved,
    NeedsReview,
    NotListed,
    ScrapeFailed,
    Timeout,
}

impl ResolutionStatus {
    pub const ALL: [ResolutionStatus; 5] = [
        ResolutionStatus::Resolved,
        ResolutionStatus::NeedsReview,
        ResolutionStatus::NotListed,
        ResolutionStatus::ScrapeFailed,
        ResolutionStatus::Timeout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStatus::Resolved => "resolved",
            ResolutionStatus::NeedsReview => "needs_review",
            ResolutionStatus::NotListed => "not_listed",
            ResolutionStatus::ScrapeFailed => "scrape_failed",
            ResolutionStatus::Timeout => "timeout",
        }
    }

    /// Failed runs are worth re-running later; the other states are decisions.
    pub fn is_failure(&self) -> bool {
        matches!(self, ResolutionStatus::ScrapeFailed | ResolutionStatus::Timeout)
    }
}

impl FromStr for ResolutionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        ResolutionStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| anyhow!("Unknown resolution status '{}'", s))
    }
}

/// The persisted output of one (property, platform) resolution run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub property_id: String,
    pub platform: Platform,
    pub status: ResolutionStatus,
    pub identifier: Option<String>,
    pub url: Option<String>,
    pub display_name: Option<String>,
    pub confidence: Option<f64>,
    pub match_reason: Option<String>,
    pub candidates: Vec<ScoredCandidate>,
    pub last_error: Option<String>,
    pub attempts: u32,
    pub queries_tried: Vec<String>,
    pub duration_ms: u64,
    pub resolved_at: NaiveDateTime,
}

impl ResolutionRecord {
    pub fn new(property_id: &str, platform: Platform, status: ResolutionStatus) -> Self {
        Self {
            property_id: property_id.to_string(),
            platform,
            status,
            identifier: None,
            url: None,
            display_name: None,
            confidence: None,
            match_reason: None,
            candidates: Vec::new(),
            last_error: None,
            attempts: 0,
            queries_tried: Vec::new(),
            duration_ms: 0,
            resolved_at: Utc::now().naive_utc(),
        }
    }

    /// Builds a `Resolved` record from a confirmed candidate.
    pub fn resolved(property_id: &str, platform: Platform, chosen: &ScoredCandidate) -> Self {
        let mut record = Self::new(property_id, platform, ResolutionStatus::Resolved);
        record.identifier = chosen.candidate.identifier.clone();
        record.url = chosen.candidate.url.clone();
        record.display_name = Some(chosen.candidate.display_name.clone());
        record.confidence = Some(chosen.confidence);
        record.match_reason = Some(chosen.verdict.reason.clone());
        record
    }

    /// Builds a `NeedsReview` record carrying the candidates for disambiguation.
    pub fn needs_review(
        property_id: &str,
        platform: Platform,
        candidates: Vec<ScoredCandidate>,
    ) -> Self {
        let mut record = Self::new(property_id, platform, ResolutionStatus::NeedsReview);
        record.candidates = candidates;
        record
    }

    pub fn failed(
        property_id: &str,
        platform: Platform,
        status: ResolutionStatus,
        error: String,
    ) -> Self {
        let mut record = Self::new(property_id, platform, status);
        record.last_error = Some(error);
        record
    }

    pub fn was_rate_limited(&self) -> bool {
        self.last_error
            .as_deref()
            .map_or(false, |e| e.starts_with(RATE_LIMITED_MARKER))
    }

    /// Checks the per-status invariants of a complete record.
    pub fn check_invariants(&self, match_threshold: f64) -> Result<()> {
        match self.status {
            ResolutionStatus::Resolved => {
                if self.identifier.is_none() && self.url.is_none() {
                    return Err(anyhow!("resolved record has neither identifier nor url"));
                }
                match self.confidence {
                    Some(c) if c >= match_threshold => Ok(()),
                    other => Err(anyhow!(
                        "resolved record confidence {:?} below threshold {}",
                        other,
                        match_threshold
                    )),
                }
            }
            ResolutionStatus::NeedsReview => {
                if self.candidates.is_empty() {
                    return Err(anyhow!("needs_review record has no candidates"));
                }
                if self
                    .candidates
                    .iter()
                    .any(|c| c.is_confirmed() && c.confidence >= match_threshold && c.candidate.is_addressable())
                {
                    return Err(anyhow!("needs_review record holds a confirmed candidate"));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
