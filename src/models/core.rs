// src/models/core.rs
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Review platforms a property can be resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "google")]
    GooglePlaces,
    #[serde(rename = "booking")]
    Booking,
    #[serde(rename = "tripadvisor")]
    TripAdvisor,
    #[serde(rename = "expedia")]
    Expedia,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::GooglePlaces,
        Platform::Booking,
        Platform::TripAdvisor,
        Platform::Expedia,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::GooglePlaces => "google",
            Platform::Booking => "booking",
            Platform::TripAdvisor => "tripadvisor",
            Platform::Expedia => "expedia",
        }
    }

    /// Prefix used for per-platform environment variables.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Platform::GooglePlaces => "GOOGLE_PLACES",
            Platform::Booking => "BOOKING",
            Platform::TripAdvisor => "TRIPADVISOR",
            Platform::Expedia => "EXPEDIA",
        }
    }

    /// Parses a comma separated platform list such as `"google,booking"`.
    pub fn parse_list(raw: &str) -> Result<Vec<Platform>> {
        let mut platforms = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let platform = part.parse::<Platform>()?;
            if !platforms.contains(&platform) {
                platforms.push(platform);
            }
        }
        Ok(platforms)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "google" | "google_places" | "places" => Ok(Platform::GooglePlaces),
            "booking" | "booking.com" => Ok(Platform::Booking),
            "tripadvisor" | "trip_advisor" => Ok(Platform::TripAdvisor),
            "expedia" => Ok(Platform::Expedia),
            other => Err(anyhow!("Unknown platform '{}'", other)),
        }
    }
}

/// An internal property record. Owned by the dashboard; only read here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub name: String,
    pub city: String,
    pub state: Option<String>,
    /// Identifiers from earlier resolutions, used for the lookup fast path.
    #[serde(default)]
    pub known_identifiers: HashMap<Platform, String>,
}

impl Property {
    pub fn new(id: &str, name: &str, city: &str, state: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            city: city.to_string(),
            state: state
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            known_identifiers: HashMap::new(),
        }
    }

    pub fn with_known_identifier(mut self, platform: Platform, identifier: &str) -> Self {
        self.known_identifiers
            .insert(platform, identifier.to_string());
        self
    }

    pub fn known_identifier(&self, platform: Platform) -> Option<&str> {
        self.known_identifiers
            .get(&platform)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }
}
