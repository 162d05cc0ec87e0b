// src/matching/normalize.rs - Hotel name normalization
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::brand::{match_brand_prefix, strip_brand_prefix};

/// Filler words never counted as identifying: articles, prepositions, generic lodging
/// nouns, compass and district qualifiers, brand tier labels.
pub const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "at", "by", "on", "in", "near", "to", "for", "with",
    "hotel", "hotels", "inn", "inns", "resort", "resorts", "suites", "suite", "spa", "lodge",
    "lodging", "motel", "motor", "hostel", "rooms", "apartments", "villas", "collection",
    "east", "west", "north", "south", "downtown", "uptown", "midtown", "airport", "beach",
    "center", "centre", "city", "area", "convention", "conference", "express", "plus",
    "premier",
];

/// Words that already tell a search backend the query is about lodging.
pub const LODGING_WORDS: &[&str] = &[
    "hotel", "hotels", "inn", "resort", "resorts", "suites", "lodge", "motel", "hostel", "spa",
];

const MAX_NORMALIZE_PASSES: usize = 8;

static LEADING_THE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:the\s+)+").expect("leading article pattern"));

// Collection branding never distinguishes one property from another.
static COLLECTION_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[\s,\-–—]*\b(?:an?\s+)?(?:autograph collection|tribute portfolio|luxury collection|curio collection|tapestry collection|unbound collection|ascend (?:hotel )?collection|trademark collection|registry collection|destination by hyatt|jdv by hyatt)(?:\s+(?:hotels?|resorts?))?\b",
    )
    .expect("collection suffix pattern")
});

static BY_CHAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\s+by\s+(?:marriott|hilton|hyatt|ihg|wyndham|choice hotels|radisson|accor|best western|la quinta|westin|sheraton)\b",
    )
    .expect("by-chain pattern")
});

// Proximity qualifiers ("near the airport", "at the convention center") describe location, not identity.
static LOCATION_QUALIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+(?:near|at|in)\s+.*$").expect("location qualifier pattern"));

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// A word long enough and specific enough to carry identity.
pub fn is_significant(word: &str) -> bool {
    word.chars().count() > 2 && !is_stopword(word)
}

pub fn significant_words(normalized: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for word in normalized.split_whitespace().filter(|w| is_significant(w)) {
        if !words.iter().any(|w| w == word) {
            words.push(word.to_string());
        }
    }
    words
}

pub fn has_lodging_word(normalized: &str) -> bool {
    normalized
        .split_whitespace()
        .any(|w| LODGING_WORDS.contains(&w))
}

fn normalize_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str(" and "),
            '.' | '\'' | '’' | '`' => {}
            ',' | '-' | '–' | '—' | '/' | '(' | ')' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Canonical decomposition with combining marks dropped: "Méridien" becomes "Meridien".
pub fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

fn collapse_symbols_and_whitespace(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase, article-free, punctuation- and accent-folded text with nothing removed.
/// Brand extraction and the city guard compare on this form.
pub fn fold_text(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let without_article = LEADING_THE.replace(&lowered, "");
    let punctuated = normalize_punctuation(&without_article);
    collapse_symbols_and_whitespace(&strip_diacritics(&punctuated))
}

fn normalize_once(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let without_article = LEADING_THE.replace(&lowered, "");
    let without_collection = COLLECTION_SUFFIX.replace_all(&without_article, "");
    let without_chain = BY_CHAIN.replace_all(&without_collection, "");
    let punctuated = normalize_punctuation(&without_chain);
    let folded = collapse_symbols_and_whitespace(&strip_diacritics(&punctuated));
    let unqualified = LOCATION_QUALIFIER.replace(&folded, "");
    unqualified.trim().to_string()
}

fn settle(raw: &str) -> String {
    let mut current = normalize_once(raw);
    for _ in 0..MAX_NORMALIZE_PASSES {
        let next = normalize_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Normalizes a raw hotel name into a comparable string.
///
/// With `keep_brand_prefix == false` one recognized chain prefix is removed as well, unless
/// that would leave a single word or only generic words behind ("Fairfield Inn Weatherford"
/// keeps its brand). Normalizing twice is the same as normalizing once.
pub fn normalize(raw: &str, keep_brand_prefix: bool) -> String {
    let base = settle(raw);
    if keep_brand_prefix {
        return base;
    }
    match strip_brand_prefix(&base) {
        Some(remainder) => {
            let remainder = settle(&remainder);
            // A second brand surfacing after the strip keeps the whole name.
            if remainder.is_empty() || match_brand_prefix(&remainder).is_some() {
                base
            } else {
                remainder
            }
        }
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_article_and_collections() {
        assert_eq!(normalize("The Sanctuary Beach Resort", false), "sanctuary beach resort");
        assert_eq!(normalize("Hotel Nia, Autograph Collection", false), "hotel nia");
        assert_eq!(
            normalize("Hotel Emma, a Tribute Portfolio Hotel", false),
            "hotel emma"
        );
    }

    #[test]
    fn test_by_chain_suffix_is_removed_in_place() {
        assert_eq!(
            normalize("Hampton Inn & Suites by Hilton Austin Downtown", true),
            "hampton inn and suites austin downtown"
        );
        assert_eq!(
            normalize("Hampton Inn & Suites by Hilton Austin Downtown", false),
            "austin downtown"
        );
    }

    #[test]
    fn test_punctuation_and_diacritics() {
        assert_eq!(normalize("Le Méridien", true), "le meridien");
        assert_eq!(normalize("St. Regis Aspen", true), "st regis aspen");
        assert_eq!(normalize("Harrah's Resort/Casino - Tahoe", false), "harrahs resort casino tahoe");
        assert_eq!(normalize("Hôtel  du   Vin", false), "hotel du vin");
    }

    #[test]
    fn test_location_qualifier_dropped() {
        assert_eq!(
            normalize("Comfort Suites near Universal Orlando Resort", true),
            "comfort suites"
        );
        assert_eq!(normalize("Fairfield Inn Weatherford", false), "fairfield inn weatherford");
        assert_eq!(normalize("At Home Inn", false), "at home inn");
    }

    #[test]
    fn test_brand_prefix_kept_when_remainder_is_generic() {
        assert_eq!(normalize("Marriott Downtown", false), "marriott downtown");
        assert_eq!(normalize("Andaz West Hollywood", false), "west hollywood");
        assert_eq!(normalize("Andaz West Hollywood", true), "andaz west hollywood");
        assert_eq!(normalize("The Westin Sacramento", true), "westin sacramento");
        assert_eq!(normalize("The Westin Sacramento", false), "westin sacramento");
        assert_eq!(normalize("The Westin Sacramento Riverfront", false), "sacramento riverfront");
    }

    #[test]
    fn test_only_one_brand_prefix_is_stripped() {
        assert_eq!(
            normalize("Hilton Head Island Beach & Tennis Resort", false),
            "hilton head island beach and tennis resort"
        );
        assert_eq!(normalize("Embassy Suites Hilton Head", false), "hilton head");
        assert_eq!(
            normalize("Omni Hilton Head Oceanfront Resort", false),
            "hilton head oceanfront resort"
        );
        assert_eq!(
            normalize("Marriott Hyatt Regency Foo Bar", false),
            "marriott hyatt regency foo bar"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "The Sanctuary Beach Resort",
            "Hotel Nia, Autograph Collection",
            "The The Grand Hotel",
            "Marriott Hyatt Regency Foo Bar",
            "Holiday Inn Express & Suites Chicago-Downtown",
            "Courtyard by Marriott Boston Logan Airport",
            "Le Méridien Dallas, The Stoneleigh",
            "the hotel at the beach in malibu",
            "  ",
            "Hotel Zoë — San Francisco (Fisherman's Wharf)",
            "Embassy Suites Hilton Head",
            "Westin The Grand Lodge",
            "Fairfield Inn Weatherford",
        ];
        for sample in samples {
            for keep in [true, false] {
                let once = normalize(sample, keep);
                assert_eq!(normalize(&once, keep), once, "not idempotent for {:?}", sample);
            }
        }
    }

    #[test]
    fn test_significant_words() {
        assert_eq!(significant_words("sanctuary beach resort"), vec!["sanctuary"]);
        assert_eq!(significant_words("park inn"), vec!["park"]);
        assert!(significant_words("hotel inn and suites").is_empty());
        assert_eq!(significant_words("foo foo bar"), vec!["foo", "bar"]);
    }
}
