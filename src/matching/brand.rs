// src/matching/brand.rs - Hotel brand prefixes and parent-chain families
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use super::normalize::{fold_text, is_significant};

/// A chain prefix as it appears in folded text, the brand token it yields and its parent family.
#[derive(Debug, Clone, Copy)]
pub struct BrandPattern {
    pub prefix: &'static str,
    pub token: &'static str,
    pub family: &'static str,
}

const fn brand(prefix: &'static str, token: &'static str, family: &'static str) -> BrandPattern {
    BrandPattern { prefix, token, family }
}

// Prefixes are in folded form: lowercase, "&" spelled "and", no punctuation or accents.
const BRAND_PATTERNS: &[BrandPattern] = &[
    // Marriott
    brand("jw marriott", "jw marriott", "marriott"),
    brand("marriott", "marriott", "marriott"),
    brand("ritz carlton", "ritz carlton", "marriott"),
    brand("st regis", "st regis", "marriott"),
    brand("w hotel", "w hotels", "marriott"),
    brand("westin", "westin", "marriott"),
    brand("sheraton", "sheraton", "marriott"),
    brand("le meridien", "le meridien", "marriott"),
    brand("renaissance", "renaissance", "marriott"),
    brand("courtyard", "courtyard", "marriott"),
    brand("residence inn", "residence inn", "marriott"),
    brand("springhill suites", "springhill suites", "marriott"),
    brand("fairfield inn and suites", "fairfield", "marriott"),
    brand("fairfield inn", "fairfield", "marriott"),
    brand("towneplace suites", "towneplace suites", "marriott"),
    brand("four points", "four points", "marriott"),
    brand("aloft", "aloft", "marriott"),
    brand("element", "element", "marriott"),
    brand("moxy", "moxy", "marriott"),
    brand("ac hotel", "ac hotels", "marriott"),
    brand("delta hotels", "delta hotels", "marriott"),
    brand("gaylord", "gaylord", "marriott"),
    // Hilton
    brand("hilton garden inn", "hilton garden inn", "hilton"),
    brand("hampton inn and suites", "hampton", "hilton"),
    brand("hampton inn", "hampton", "hilton"),
    brand("homewood suites", "homewood suites", "hilton"),
    brand("home2 suites", "home2 suites", "hilton"),
    brand("embassy suites", "embassy suites", "hilton"),
    brand("doubletree", "doubletree", "hilton"),
    brand("double tree", "doubletree", "hilton"),
    brand("waldorf astoria", "waldorf astoria", "hilton"),
    brand("conrad", "conrad", "hilton"),
    brand("canopy", "canopy", "hilton"),
    brand("tru", "tru", "hilton"),
    brand("signia", "signia", "hilton"),
    brand("hilton", "hilton", "hilton"),
    // Hyatt
    brand("grand hyatt", "grand hyatt", "hyatt"),
    brand("park hyatt", "park hyatt", "hyatt"),
    brand("hyatt regency", "hyatt regency", "hyatt"),
    brand("hyatt place", "hyatt place", "hyatt"),
    brand("hyatt house", "hyatt house", "hyatt"),
    brand("hyatt centric", "hyatt centric", "hyatt"),
    brand("andaz", "andaz", "hyatt"),
    brand("alila", "alila", "hyatt"),
    brand("hyatt", "hyatt", "hyatt"),
    // IHG
    brand("holiday inn express and suites", "holiday inn express", "ihg"),
    brand("holiday inn express", "holiday inn express", "ihg"),
    brand("holiday inn and suites", "holiday inn", "ihg"),
    brand("holiday inn", "holiday inn", "ihg"),
    brand("crowne plaza", "crowne plaza", "ihg"),
    brand("intercontinental", "intercontinental", "ihg"),
    brand("kimpton", "kimpton", "ihg"),
    brand("hotel indigo", "hotel indigo", "ihg"),
    brand("staybridge suites", "staybridge suites", "ihg"),
    brand("candlewood suites", "candlewood suites", "ihg"),
    brand("avid hotel", "avid hotels", "ihg"),
    // Wyndham
    brand("wyndham garden", "wyndham garden", "wyndham"),
    brand("wyndham grand", "wyndham grand", "wyndham"),
    brand("wyndham", "wyndham", "wyndham"),
    brand("la quinta inn and suites", "la quinta", "wyndham"),
    brand("la quinta", "la quinta", "wyndham"),
    brand("days inn", "days inn", "wyndham"),
    brand("super 8", "super 8", "wyndham"),
    brand("ramada", "ramada", "wyndham"),
    brand("microtel", "microtel", "wyndham"),
    brand("wingate", "wingate", "wyndham"),
    brand("baymont", "baymont", "wyndham"),
    brand("howard johnson", "howard johnson", "wyndham"),
    brand("travelodge", "travelodge", "wyndham"),
    // Choice
    brand("comfort inn and suites", "comfort", "choice"),
    brand("comfort inn", "comfort", "choice"),
    brand("comfort suites", "comfort", "choice"),
    brand("quality inn", "quality inn", "choice"),
    brand("sleep inn", "sleep inn", "choice"),
    brand("clarion", "clarion", "choice"),
    brand("cambria", "cambria", "choice"),
    brand("mainstay suites", "mainstay suites", "choice"),
    brand("econo lodge", "econo lodge", "choice"),
    brand("rodeway inn", "rodeway inn", "choice"),
    // Best Western
    brand("best western premier", "best western", "best_western"),
    brand("best western plus", "best western", "best_western"),
    brand("best western", "best western", "best_western"),
    // Radisson
    brand("radisson blu", "radisson blu", "radisson"),
    brand("radisson red", "radisson red", "radisson"),
    brand("radisson", "radisson", "radisson"),
    brand("country inn and suites", "country inn", "radisson"),
    brand("park plaza", "park plaza", "radisson"),
    // Accor
    brand("fairmont", "fairmont", "accor"),
    brand("sofitel", "sofitel", "accor"),
    brand("novotel", "novotel", "accor"),
    brand("pullman", "pullman", "accor"),
    brand("swissotel", "swissotel", "accor"),
    brand("raffles", "raffles", "accor"),
    brand("mercure", "mercure", "accor"),
    brand("ibis", "ibis", "accor"),
    // Independents with their own families
    brand("four seasons", "four seasons", "four_seasons"),
    brand("omni", "omni", "omni"),
    brand("loews", "loews", "loews"),
];

/// Chain tokens unambiguous enough to trust anywhere in a name, not only as a prefix.
const ANYWHERE_TOKENS: &[(&str, &str)] = &[
    ("ritz carlton", "ritz carlton"),
    ("jw marriott", "jw marriott"),
    ("marriott", "marriott"),
    ("sheraton", "sheraton"),
    ("westin", "westin"),
    ("le meridien", "le meridien"),
    ("doubletree", "doubletree"),
    ("embassy suites", "embassy suites"),
    ("hampton inn", "hampton"),
    ("hilton", "hilton"),
    ("hyatt regency", "hyatt regency"),
    ("hyatt", "hyatt"),
    ("holiday inn", "holiday inn"),
    ("crowne plaza", "crowne plaza"),
    ("intercontinental", "intercontinental"),
    ("kimpton", "kimpton"),
    ("wyndham", "wyndham"),
    ("best western", "best western"),
    ("radisson", "radisson"),
    ("fairmont", "fairmont"),
    ("sofitel", "sofitel"),
    ("four seasons", "four seasons"),
];

// Place names that contain a chain token.
const CHAIN_LOOKALIKES: &[(&str, &str)] = &[("hilton head", "hiltonhead")];

static LOOKALIKE_REGEXES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    CHAIN_LOOKALIKES
        .iter()
        .map(|(place, masked)| {
            let re = Regex::new(&format!(r"\b{}\b", regex::escape(place)))
                .expect("place name pattern is a valid regex");
            (re, *masked)
        })
        .collect()
});

static PATTERNS_BY_LENGTH: Lazy<Vec<BrandPattern>> = Lazy::new(|| {
    let mut patterns = BRAND_PATTERNS.to_vec();
    patterns.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
    patterns
});

static ANYWHERE_REGEXES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    ANYWHERE_TOKENS
        .iter()
        .map(|(text, token)| {
            let re = Regex::new(&format!(r"\b{}\b", regex::escape(text)))
                .expect("chain token pattern is a valid regex");
            (re, *token)
        })
        .collect()
});

static FAMILY_BY_TOKEN: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    BRAND_PATTERNS
        .iter()
        .map(|p| (p.token, p.family))
        .collect()
});

fn starts_with_word(text: &str, prefix: &str) -> bool {
    text.starts_with(prefix)
        && text[prefix.len()..]
            .chars()
            .next()
            .map_or(true, |c| c == ' ')
}

/// Rewrites place names containing a chain token so they never read as that chain.
/// No place name overlaps a brand prefix, so prefix offsets survive masking.
fn mask_lookalikes(folded: &str) -> String {
    let mut masked = folded.to_string();
    for (re, replacement) in LOOKALIKE_REGEXES.iter() {
        masked = re.replace_all(&masked, *replacement).into_owned();
    }
    masked
}

/// Longest brand pattern the folded text starts with. "Hilton Head ..." has none.
pub fn match_brand_prefix(folded: &str) -> Option<&'static BrandPattern> {
    let masked = mask_lookalikes(folded);
    PATTERNS_BY_LENGTH
        .iter()
        .find(|p| starts_with_word(&masked, p.prefix))
}

/// Extracts the brand token of a raw listing name, if any.
///
/// Prefix-anchored patterns are tried first, longest first. Failing that, a closed set of
/// unambiguous chain tokens is searched anywhere in the name ("Mystic Marriott Hotel").
pub fn extract_brand_prefix(raw_name: &str) -> Option<&'static str> {
    let folded = fold_text(raw_name);
    if folded.is_empty() {
        return None;
    }
    if let Some(pattern) = match_brand_prefix(&folded) {
        return Some(pattern.token);
    }

    let scan = mask_lookalikes(&folded);
    ANYWHERE_REGEXES
        .iter()
        .find(|(re, _)| re.is_match(&scan))
        .map(|(_, token)| *token)
}

/// Parent family of a brand token. Used for compatibility decisions only.
pub fn brand_family(token: &str) -> Option<&'static str> {
    FAMILY_BY_TOKEN.get(token).copied()
}

/// Two brands are compatible when they are the same token or share a parent family.
pub fn brands_compatible(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (brand_family(a), brand_family(b)) {
        (Some(fa), Some(fb)) => fa == fb,
        _ => false,
    }
}

/// Whether folded text names any sub-brand (or the parent) of `family`.
pub fn mentions_family(folded: &str, family: &str) -> bool {
    let padded = format!(" {} ", mask_lookalikes(folded));
    let family_word = family.replace('_', " ");
    if padded.contains(&format!(" {} ", family_word)) {
        return true;
    }
    BRAND_PATTERNS
        .iter()
        .filter(|p| p.family == family)
        .any(|p| padded.contains(&format!(" {} ", p.prefix)) || padded.contains(&format!(" {} ", p.token)))
}

/// Text after a leading brand prefix, provided it holds at least one significant word.
pub fn brand_remainder(normalized: &str) -> Option<&str> {
    let pattern = match_brand_prefix(normalized)?;
    let remainder = normalized[pattern.prefix.len()..].trim();
    remainder
        .split_whitespace()
        .any(is_significant)
        .then_some(remainder)
}

/// Removes a leading brand prefix from an already normalized name.
///
/// Returns `None` when there is no prefix or when the name should keep its brand:
/// - the remainder is only generic words ("Marriott Downtown");
/// - the remainder is a single word, usually the location ("Fairfield Inn Weatherford");
/// - the remainder opens with another brand, so which one to drop is a guess.
pub fn strip_brand_prefix(normalized: &str) -> Option<String> {
    let remainder = brand_remainder(normalized)?;
    if remainder.split_whitespace().count() < 2 || match_brand_prefix(remainder).is_some() {
        return None;
    }
    Some(remainder.to_string())
}
