// src/matching/query.rs - Search query variants for one property
use std::collections::HashSet;

use super::normalize::{has_lodging_word, normalize, significant_words};

fn join_parts(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builds search query variants, most specific first.
///
/// 1. brand-kept normalized name, "hotel" appended when no lodging word is present, city, state
/// 2. normalized name (brand stripped) with city
/// 3. the original name with city
/// 4. the first two significant normalized words with city
///
/// Variants without a name part are dropped, as are case-insensitive duplicates.
pub fn generate_queries(name: &str, city: &str, state: Option<&str>) -> Vec<String> {
    let state = state.unwrap_or_default();
    let branded = normalize(name, true);
    let stripped = normalize(name, false);
    let short: String = significant_words(&stripped)
        .into_iter()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ");

    let mut variants: Vec<String> = Vec::with_capacity(4);
    if !branded.is_empty() {
        let lodging = if has_lodging_word(&branded) { "" } else { "hotel" };
        variants.push(join_parts(&[&branded, lodging, city, state]));
    }
    if !stripped.is_empty() {
        variants.push(join_parts(&[&stripped, city]));
    }
    if !name.trim().is_empty() {
        variants.push(join_parts(&[name, city]));
    }
    if !short.is_empty() {
        variants.push(join_parts(&[&short, city]));
    }

    let mut seen = HashSet::new();
    variants
        .into_iter()
        .filter(|q| !q.is_empty() && seen.insert(q.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branded_query_comes_first() {
        let queries = generate_queries("The Westin Sacramento", "Sacramento", Some("CA"));
        assert_eq!(queries[0], "westin sacramento hotel Sacramento CA");
        assert_eq!(
            queries,
            vec![
                "westin sacramento hotel Sacramento CA",
                "westin sacramento Sacramento",
                "The Westin Sacramento Sacramento",
            ]
        );
    }

    #[test]
    fn test_stripped_variant_drops_brand_with_distinctive_remainder() {
        let queries = generate_queries("Hyatt Regency West Hollywood", "West Hollywood", Some("CA"));
        assert_eq!(
            queries,
            vec![
                "hyatt regency west hollywood hotel West Hollywood CA",
                "west hollywood West Hollywood",
                "Hyatt Regency West Hollywood West Hollywood",
                "hollywood West Hollywood",
            ]
        );
    }

    #[test]
    fn test_no_hotel_suffix_when_lodging_word_present() {
        let queries = generate_queries("The Sanctuary Beach Resort", "Marina", Some("CA"));
        assert_eq!(queries[0], "sanctuary beach resort Marina CA");
        assert!(queries.contains(&"sanctuary Marina".to_string()));
    }

    #[test]
    fn test_missing_state_and_dedup() {
        let queries = generate_queries("Rittenhouse", "Philadelphia", None);
        assert_eq!(
            queries,
            vec!["rittenhouse hotel Philadelphia", "rittenhouse Philadelphia"]
        );
        let lowered: HashSet<String> = queries.iter().map(|q| q.to_lowercase()).collect();
        assert_eq!(lowered.len(), queries.len());
    }

    #[test]
    fn test_blank_name_yields_no_queries() {
        assert!(generate_queries("   ", "Austin", Some("TX")).is_empty());
    }
}
