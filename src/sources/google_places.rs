// src/sources/google_places.rs - Google Places API (New) text search
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::config::SourcesConfig;
use super::{failure_for_status, source_error_from_reqwest, FailureKind, SourceAdapter, SourceError};
use crate::models::{MatchCandidate, Platform};

pub const PLACES_BASE_URL: &str = "https://places.googleapis.com/v1";
const SEARCH_FIELD_MASK: &str =
    "places.id,places.displayName,places.formattedAddress,places.googleMapsUri";
const DETAILS_FIELD_MASK: &str = "id,displayName,formattedAddress,googleMapsUri";
const MAX_PLACES_RESULTS: usize = 20;

#[derive(Serialize)]
struct SearchTextRequest<'a> {
    #[serde(rename = "textQuery")]
    text_query: &'a str,
    #[serde(rename = "maxResultCount")]
    max_result_count: usize,
    #[serde(rename = "includedType")]
    included_type: &'a str,
}

#[derive(Deserialize, Default)]
struct SearchTextResponse {
    places: Option<Vec<PlaceResponse>>,
}

#[derive(Deserialize)]
struct PlaceResponse {
    id: Option<String>,
    #[serde(rename = "displayName")]
    display_name: Option<LocalizedText>,
    #[serde(rename = "formattedAddress")]
    formatted_address: Option<String>,
    #[serde(rename = "googleMapsUri")]
    google_maps_uri: Option<String>,
}

#[derive(Deserialize)]
struct LocalizedText {
    text: Option<String>,
}

impl PlaceResponse {
    fn into_candidate(self) -> Option<MatchCandidate> {
        let name = self.display_name.and_then(|t| t.text)?;
        if name.trim().is_empty() {
            return None;
        }
        let url = self.google_maps_uri.or_else(|| {
            self.id
                .as_ref()
                .map(|id| format!("https://www.google.com/maps/place/?q=place_id:{}", id))
        });
        Some(MatchCandidate {
            display_name: name,
            formatted_address: self.formatted_address,
            identifier: self.id,
            url,
        })
    }
}

fn parse_search_body(body: &str) -> Result<Vec<MatchCandidate>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed: SearchTextResponse =
        serde_json::from_str(body).context("Failed to parse Places searchText response")?;
    Ok(parsed
        .places
        .unwrap_or_default()
        .into_iter()
        .filter_map(PlaceResponse::into_candidate)
        .collect())
}

fn parse_details_body(body: &str) -> Result<Option<MatchCandidate>> {
    let parsed: PlaceResponse =
        serde_json::from_str(body).context("Failed to parse Places details response")?;
    Ok(parsed.into_candidate())
}

fn error_for_status(status: StatusCode, body: &str) -> anyhow::Error {
    let snippet: String = body.chars().take(300).collect();
    let message = format!("Places API returned {}: {}", status, snippet);
    match failure_for_status(status) {
        Some(FailureKind::RateLimited) => SourceError::RateLimited(message).into(),
        Some(FailureKind::Timeout) => SourceError::Timeout(message).into(),
        _ => SourceError::Unavailable(message).into(),
    }
}

/// Text search and place details against the Places API (New).
pub struct GooglePlacesAdapter {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    max_results: usize,
}

impl GooglePlacesAdapter {
    pub fn new(api_key: &str, timeout: Duration, max_results: usize) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Places HTTP client")?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url: PLACES_BASE_URL.to_string(),
            max_results: max_results.clamp(1, MAX_PLACES_RESULTS),
        })
    }

    pub fn from_config(config: &SourcesConfig) -> Result<Self> {
        let api_key = config
            .google_places_api_key
            .as_deref()
            .ok_or_else(|| anyhow!("GOOGLE_PLACES_API_KEY is not set"))?;
        let mut adapter = Self::new(api_key, config.http_timeout, config.max_results)?;
        adapter.base_url = config.places_base_url.trim_end_matches('/').to_string();
        Ok(adapter)
    }
}

#[async_trait]
impl SourceAdapter for GooglePlacesAdapter {
    fn platform(&self) -> Platform {
        Platform::GooglePlaces
    }

    async fn search(&self, query: &str) -> Result<Vec<MatchCandidate>> {
        let body = SearchTextRequest {
            text_query: query,
            max_result_count: self.max_results,
            included_type: "lodging",
        };
        let response = self
            .http
            .post(format!("{}/places:searchText", self.base_url))
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", SEARCH_FIELD_MASK)
            .json(&body)
            .send()
            .await
            .map_err(|e| source_error_from_reqwest("Places searchText request failed", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| source_error_from_reqwest("Places searchText body unreadable", e))?;
        if !status.is_success() {
            return Err(error_for_status(status, &text));
        }
        let candidates = parse_search_body(&text)?;
        debug!("Places searchText \"{}\" -> {} places", query, candidates.len());
        Ok(candidates)
    }

    fn supports_lookup(&self) -> bool {
        true
    }

    async fn fetch_by_id(&self, identifier: &str) -> Result<Option<MatchCandidate>> {
        let response = self
            .http
            .get(format!("{}/places/{}", self.base_url, identifier))
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", DETAILS_FIELD_MASK)
            .send()
            .await
            .map_err(|e| source_error_from_reqwest("Places details request failed", e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let text = response
            .text()
            .await
            .map_err(|e| source_error_from_reqwest("Places details body unreadable", e))?;
        if !status.is_success() {
            return Err(error_for_status(status, &text));
        }
        parse_details_body(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::classify_error;

    #[test]
    fn test_search_response_mapping() {
        let body = r#"{
            "places": [
                {
                    "id": "ChIJ123",
                    "displayName": {"text": "Westin Sacramento Riverfront", "languageCode": "en"},
                    "formattedAddress": "500 J St, Sacramento, CA 95814, USA",
                    "googleMapsUri": "https://maps.google.com/?cid=42"
                },
                {"id": "ChIJ456", "displayName": {"text": "  "}},
                {"id": "ChIJ789", "displayName": {"text": "Citizen Hotel"}}
            ]
        }"#;
        let candidates = parse_search_body(body).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].display_name, "Westin Sacramento Riverfront");
        assert_eq!(candidates[0].identifier.as_deref(), Some("ChIJ123"));
        assert_eq!(candidates[0].url.as_deref(), Some("https://maps.google.com/?cid=42"));
        assert!(candidates[1]
            .url
            .as_deref()
            .unwrap()
            .ends_with("place_id:ChIJ789"));
    }

    #[test]
    fn test_empty_search_response() {
        assert!(parse_search_body("{}").unwrap().is_empty());
        assert!(parse_search_body("").unwrap().is_empty());
        assert!(parse_search_body("not json").is_err());
    }

    #[test]
    fn test_details_response_mapping() {
        let body = r#"{"id": "ChIJ123", "displayName": {"text": "Hotel Nia"}, "formattedAddress": "200 Independence Dr, Menlo Park, CA"}"#;
        let candidate = parse_details_body(body).unwrap().unwrap();
        assert_eq!(candidate.display_name, "Hotel Nia");
        assert!(candidate.is_addressable());
    }

    #[test]
    fn test_quota_statuses_are_rate_limits() {
        let err = error_for_status(StatusCode::TOO_MANY_REQUESTS, "RESOURCE_EXHAUSTED");
        assert_eq!(classify_error(&err), FailureKind::RateLimited);
        let err = error_for_status(StatusCode::FORBIDDEN, "API key invalid");
        assert_eq!(classify_error(&err), FailureKind::Unavailable);
        let err = error_for_status(StatusCode::SERVICE_UNAVAILABLE, "backend unavailable");
        assert_eq!(classify_error(&err), FailureKind::Unavailable);
    }

    #[test]
    fn test_missing_key_is_a_config_error() {
        assert!(GooglePlacesAdapter::from_config(&SourcesConfig::default()).is_err());
    }

    #[test]
    fn test_base_url_comes_from_config() {
        let config = SourcesConfig {
            google_places_api_key: Some("key".to_string()),
            places_base_url: "http://localhost:8080/v1/".to_string(),
            ..SourcesConfig::default()
        };
        let adapter = GooglePlacesAdapter::from_config(&config).unwrap();
        assert_eq!(adapter.base_url, "http://localhost:8080/v1");
        assert!(adapter.supports_lookup());
    }
}
