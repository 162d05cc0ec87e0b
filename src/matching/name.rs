// src/matching/name.rs - Brand-aware hotel name matching
use log::debug;
use strsim::jaro_winkler;

use super::brand::{
    brand_family, brand_remainder, brands_compatible, extract_brand_prefix, mentions_family,
};
use super::normalize::{fold_text, normalize, significant_words};
use crate::models::matching::{MatchRule, MatchVerdict};

pub const SHORT_NAME_MAX_WORDS: usize = 2;
pub const MIN_FUZZY_WORD_LENGTH: usize = 4;
pub const MIN_DISTINCTIVE_WORD_LENGTH: usize = 6;
pub const MIN_CONTAINMENT_WORDS: usize = 2;
pub const MIN_TOKEN_OVERLAP: usize = 2;

/// Two words match when identical, or when the shorter (at least four characters)
/// appears inside the longer ("chicago" / "chicagoland").
pub fn words_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    shorter.chars().count() >= MIN_FUZZY_WORD_LENGTH && longer.contains(shorter)
}

/// Number of overlapping words required for a search name with `search_word_count` significant words.
pub fn required_overlap(search_word_count: usize) -> usize {
    if search_word_count <= SHORT_NAME_MAX_WORDS {
        search_word_count
    } else {
        MIN_TOKEN_OVERLAP.max((search_word_count + 1) / 2)
    }
}

/// The normalized forms of one raw name the matcher chooses between.
struct NameForms {
    kept: String,
    stripped: String,
    /// Text after a brand prefix, even when `stripped` kept the brand.
    remainder: Option<String>,
    brand: Option<&'static str>,
}

impl NameForms {
    fn new(raw: &str) -> Self {
        let kept = normalize(raw, true);
        let remainder = brand_remainder(&kept).map(|r| normalize(r, true));
        Self {
            stripped: normalize(raw, false),
            kept,
            remainder,
            brand: extract_brand_prefix(raw),
        }
    }

    fn brand_free(&self) -> String {
        self.remainder.clone().unwrap_or_else(|| self.stripped.clone())
    }
}

/// Whether a brand-free remainder names nothing but a place: a single word, or only words of
/// the property city. A brand found outside the prefix leaves no remainder and counts too.
fn location_only(remainder: Option<&str>, city: Option<&str>) -> bool {
    let remainder = match remainder {
        Some(r) => r,
        None => return true,
    };
    if remainder.split_whitespace().count() <= 1 {
        return true;
    }
    let city_words = match city {
        Some(c) => significant_words(&normalize(c, true)),
        None => return false,
    };
    let words = significant_words(remainder);
    !words.is_empty() && words.iter().all(|w| city_words.contains(w))
}

/// "hyatt" within "hyatt regency": a parent label and one of its own tiers.
fn tokens_nested(a: &str, b: &str) -> bool {
    let a_words: Vec<&str> = a.split_whitespace().collect();
    let b_words: Vec<&str> = b.split_whitespace().collect();
    a_words.iter().all(|w| b_words.contains(w)) || b_words.iter().all(|w| a_words.contains(w))
}

struct NameContext {
    normalized: String,
    words: Vec<String>,
    brand: Option<&'static str>,
}

impl NameContext {
    fn new(normalized: String, brand: Option<&'static str>) -> Self {
        let words = significant_words(&normalized);
        Self {
            normalized,
            words,
            brand,
        }
    }
}

struct VerdictBuilder<'a> {
    search: &'a NameContext,
    candidate: &'a NameContext,
    similarity: f64,
}

impl<'a> VerdictBuilder<'a> {
    fn build(&self, is_match: bool, rule: MatchRule, reason: String, matched: Vec<String>) -> MatchVerdict {
        MatchVerdict {
            is_match,
            rule,
            reason,
            matching_word_count: matched.len(),
            search_words: self.search.words.clone(),
            candidate_words: self.candidate.words.clone(),
            matched_words: matched,
            search_brand: self.search.brand.map(str::to_string),
            candidate_brand: self.candidate.brand.map(str::to_string),
            similarity: self.similarity,
        }
    }

    fn overlapping_words(&self) -> Vec<String> {
        self.search
            .words
            .iter()
            .filter(|sw| self.candidate.words.iter().any(|cw| words_match(sw, cw)))
            .cloned()
            .collect()
    }
}

fn describe_brand(token: &str) -> String {
    match brand_family(token) {
        Some(family) => format!("'{}' ({})", token, family),
        None => format!("'{}'", token),
    }
}

/// Decides whether a candidate listing name refers to the same hotel as the search name.
///
/// Rules are applied in order and the first one that decides wins:
/// brand veto, brand-in-search-only guard, sister-brand guard, exact normalized equality,
/// containment, then significant-word overlap. Deterministic and free of I/O.
pub fn analyze_match(search_name: &str, candidate_name: &str) -> MatchVerdict {
    analyze_match_in_city(search_name, candidate_name, None)
}

/// `analyze_match` knowing the property city, so a brand-free remainder that only repeats
/// the city ("Courtyard Salt Lake City") is recognized as carrying no identity.
pub fn analyze_match_in_city(
    search_name: &str,
    candidate_name: &str,
    city: Option<&str>,
) -> MatchVerdict {
    let search_forms = NameForms::new(search_name);
    let candidate_forms = NameForms::new(candidate_name);

    // Different sub-brands of one family compare brand-free only when something other than
    // the location is left; otherwise the brand is the identity.
    let sister_brands = match (search_forms.brand, candidate_forms.brand) {
        (Some(sb), Some(cb)) if sb != cb && brands_compatible(sb, cb) => {
            location_only(search_forms.remainder.as_deref(), city)
                || location_only(candidate_forms.remainder.as_deref(), city)
        }
        _ => false,
    };
    let (search_text, candidate_text) = match (search_forms.brand, candidate_forms.brand) {
        (Some(sb), Some(cb)) if brands_compatible(sb, cb) => {
            if sister_brands {
                (search_forms.kept.clone(), candidate_forms.kept.clone())
            } else {
                (search_forms.brand_free(), candidate_forms.brand_free())
            }
        }
        _ => (search_forms.stripped.clone(), candidate_forms.stripped.clone()),
    };

    let search = NameContext::new(search_text, search_forms.brand);
    let candidate = NameContext::new(candidate_text, candidate_forms.brand);
    let builder = VerdictBuilder {
        search: &search,
        candidate: &candidate,
        similarity: jaro_winkler(&search.normalized, &candidate.normalized),
    };

    let verdict = decide(&builder, candidate_name, sister_brands);
    debug!(
        "analyze_match('{}', '{}') -> {} [{}]: {}",
        search_name,
        candidate_name,
        verdict.is_match,
        verdict.rule.as_str(),
        verdict.reason
    );
    verdict
}

fn decide(builder: &VerdictBuilder<'_>, candidate_name: &str, sister_brands: bool) -> MatchVerdict {
    let search = builder.search;
    let candidate = builder.candidate;

    if search.normalized.is_empty() || candidate.normalized.is_empty() {
        return builder.build(
            false,
            MatchRule::EmptyName,
            "Empty name after normalization".to_string(),
            Vec::new(),
        );
    }

    // A confirmed conflicting chain affiliation is never overridden by text overlap.
    if let (Some(sb), Some(cb)) = (search.brand, candidate.brand) {
        if !brands_compatible(sb, cb) {
            return builder.build(
                false,
                MatchRule::BrandMismatch,
                format!("Brand mismatch: {} vs {}", describe_brand(sb), describe_brand(cb)),
                Vec::new(),
            );
        }
    }

    if let (Some(sb), None) = (search.brand, candidate.brand) {
        let same_text = search.normalized == candidate.normalized;
        let family_visible = brand_family(sb)
            .map_or(false, |family| mentions_family(&fold_text(candidate_name), family));
        if !same_text && !family_visible {
            return builder.build(
                false,
                MatchRule::BrandMissingInResult,
                format!("Brand {} in search but none in result", describe_brand(sb)),
                Vec::new(),
            );
        }
    }

    if let (true, Some(sb), Some(cb)) = (sister_brands, search.brand, candidate.brand) {
        if !tokens_nested(sb, cb) {
            return builder.build(
                false,
                MatchRule::SisterBrand,
                format!(
                    "Sister brands {} and {} share only location text: '{}' vs '{}'",
                    describe_brand(sb),
                    describe_brand(cb),
                    search.normalized,
                    candidate.normalized
                ),
                Vec::new(),
            );
        }
    }

    if search.normalized == candidate.normalized {
        return builder.build(
            true,
            MatchRule::ExactMatch,
            format!("Exact normalized match '{}'", search.normalized),
            search.words.clone(),
        );
    }

    if let Some(verdict) = containment_verdict(builder) {
        return verdict;
    }

    if search.words.is_empty() {
        return builder.build(
            false,
            MatchRule::InsufficientOverlap,
            format!("No significant words in search name '{}'", search.normalized),
            Vec::new(),
        );
    }

    let matched = builder.overlapping_words();
    let required = required_overlap(search.words.len());
    if matched.len() >= required {
        builder.build(
            true,
            MatchRule::WordOverlap,
            format!(
                "Word overlap {}/{} significant words [{}]",
                matched.len(),
                search.words.len(),
                matched.join(", ")
            ),
            matched,
        )
    } else {
        builder.build(
            false,
            MatchRule::InsufficientOverlap,
            format!(
                "Insufficient word overlap {}/{} (need {}) [{}]",
                matched.len(),
                search.words.len(),
                required,
                matched.join(", ")
            ),
            matched,
        )
    }
}

/// One name contained in the other. Short, ambiguous containments defer to word overlap.
fn containment_verdict(builder: &VerdictBuilder<'_>) -> Option<MatchVerdict> {
    let search = builder.search;
    let candidate = builder.candidate;

    let (shorter, longer) = if candidate.normalized.contains(&search.normalized) {
        (search, candidate)
    } else if search.normalized.contains(&candidate.normalized) {
        (candidate, search)
    } else {
        return None;
    };

    let matched = builder.overlapping_words();

    if shorter.words.len() >= MIN_CONTAINMENT_WORDS {
        return Some(builder.build(
            true,
            MatchRule::Containment,
            format!(
                "Containment: '{}' within '{}' ({} significant words)",
                shorter.normalized,
                longer.normalized,
                shorter.words.len()
            ),
            matched,
        ));
    }

    if let (Some(sb), Some(cb)) = (search.brand, candidate.brand) {
        if brands_compatible(sb, cb) {
            return Some(builder.build(
                true,
                MatchRule::Containment,
                format!(
                    "Brand-family-compatible containment: {} ~ {}, '{}' within '{}'",
                    describe_brand(sb),
                    describe_brand(cb),
                    shorter.normalized,
                    longer.normalized
                ),
                matched,
            ));
        }
    }

    if let Some(word) = shorter
        .words
        .iter()
        .find(|w| w.chars().count() >= MIN_DISTINCTIVE_WORD_LENGTH)
    {
        return Some(builder.build(
            true,
            MatchRule::Containment,
            format!(
                "Containment on distinctive word '{}': '{}' within '{}'",
                word, shorter.normalized, longer.normalized
            ),
            matched,
        ));
    }

    None
}
