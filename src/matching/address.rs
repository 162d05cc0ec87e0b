// src/matching/address.rs - City guard for name-matched candidates
use super::normalize::fold_text;

/// City portion of an expected-city string such as "Austin, TX".
fn expected_city_key(expected_city: &str) -> String {
    let first_segment = expected_city.split(',').next().unwrap_or_default();
    fold_text(first_segment)
}

/// Returns false only when a candidate's address clearly names a different place.
///
/// A missing or blank address passes (the name verdict stands alone), as does a blank
/// expected city. Comparison is case- and accent-insensitive substring containment.
pub fn validate_city(formatted_address: Option<&str>, expected_city: &str) -> bool {
    let address = match formatted_address {
        Some(a) if !a.trim().is_empty() => fold_text(a),
        _ => return true,
    };
    let city = expected_city_key(expected_city);
    if city.is_empty() {
        return true;
    }
    address.contains(&city)
}
