// src/utils/env.rs
use log::{debug, info, warn};
use std::env;

/// Loads variables from `.env` (or the file named by `ENV_FILE`) without overriding
/// anything already present in the process environment.
pub fn load_env() {
    let result = match env::var("ENV_FILE") {
        Ok(path) if !path.trim().is_empty() => dotenv::from_filename(path.trim()),
        _ => dotenv::dotenv(),
    };
    match result {
        Ok(path) => info!("Loaded environment variables from {}", path.display()),
        Err(e) => warn!(
            "No env file loaded ({}). Proceeding with system environment variables.",
            e
        ),
    }
    debug!(
        "POSTGRES_HOST={}, GOOGLE_PLACES_API_KEY set={}, SCRAPER_API_TOKEN set={}",
        env::var("POSTGRES_HOST").unwrap_or_else(|_| "<unset>".to_string()),
        env::var("GOOGLE_PLACES_API_KEY").is_ok(),
        env::var("SCRAPER_API_TOKEN").is_ok()
    );
}

/// Parses an environment variable, falling back to `default` when unset or malformed.
pub fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// A non-blank string variable.
pub fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
