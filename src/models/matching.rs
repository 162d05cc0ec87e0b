// src/models/matching.rs
use serde::{Deserialize, Serialize};

/// One listing returned by a source adapter, not yet verified.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub display_name: String,
    pub formatted_address: Option<String>,
    pub identifier: Option<String>,
    pub url: Option<String>,
}

impl MatchCandidate {
    pub fn new(display_name: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.formatted_address = Some(address.to_string());
        self
    }

    pub fn with_identifier(mut self, identifier: &str) -> Self {
        self.identifier = Some(identifier.to_string());
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    /// A resolution needs something to point at.
    pub fn is_addressable(&self) -> bool {
        self.identifier.as_deref().map_or(false, |s| !s.is_empty())
            || self.url.as_deref().map_or(false, |s| !s.is_empty())
    }
}

/// Which matcher rule produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    EmptyName,
    BrandMismatch,
    BrandMissingInResult,
    SisterBrand,
    ExactMatch,
    Containment,
    WordOverlap,
    InsufficientOverlap,
}

impl MatchRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchRule::EmptyName => "empty_name",
            MatchRule::BrandMismatch => "brand_mismatch",
            MatchRule::BrandMissingInResult => "brand_missing_in_result",
            MatchRule::SisterBrand => "sister_brand",
            MatchRule::ExactMatch => "exact_match",
            MatchRule::Containment => "containment",
            MatchRule::WordOverlap => "word_overlap",
            MatchRule::InsufficientOverlap => "insufficient_overlap",
        }
    }
}

/// Structured, auditable outcome of comparing a search name with a candidate name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchVerdict {
    pub is_match: bool,
    pub rule: MatchRule,
    pub reason: String,
    pub matching_word_count: usize,
    pub search_words: Vec<String>,
    pub candidate_words: Vec<String>,
    pub matched_words: Vec<String>,
    pub search_brand: Option<String>,
    pub candidate_brand: Option<String>,
    /// Jaro-Winkler over the normalized names. Diagnostic only.
    pub similarity: f64,
}

/// A candidate as kept on a resolution record for manual review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: MatchCandidate,
    pub verdict: MatchVerdict,
    pub confidence: f64,
    pub city_ok: bool,
}

impl ScoredCandidate {
    pub fn is_confirmed(&self) -> bool {
        self.verdict.is_match && self.city_ok
    }
}
