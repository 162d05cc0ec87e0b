// src/sources/scraper_job.rs - Hosted scraper jobs (start, poll, read dataset)
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::config::SourcesConfig;
use super::{failure_for_status, source_error_from_reqwest, FailureKind, SourceAdapter, SourceError};
use crate::models::{MatchCandidate, Platform};
use crate::utils::cancel::CancelToken;
use crate::utils::poll::{poll_with_timeout, PollSchedule, PollStatus};

/// Where each platform's scraper puts the fields a candidate needs. Paths are dotted.
struct FieldMap {
    name: &'static [&'static str],
    address: &'static [&'static str],
    identifier: &'static [&'static str],
    url: &'static [&'static str],
}

const BOOKING_FIELDS: FieldMap = FieldMap {
    name: &["name", "title", "hotelName"],
    address: &["address.full", "address", "location.address"],
    identifier: &["hotelId", "id"],
    url: &["url", "link"],
};

const TRIPADVISOR_FIELDS: FieldMap = FieldMap {
    name: &["name", "title"],
    address: &["address", "addressObj.full", "locationString"],
    identifier: &["locationId", "id"],
    url: &["webUrl", "url"],
};

const EXPEDIA_FIELDS: FieldMap = FieldMap {
    name: &["name", "title", "hotelName"],
    address: &["address.full", "address", "neighborhood"],
    identifier: &["hotelId", "propertyId", "id"],
    url: &["url", "link"],
};

fn field_map(platform: Platform) -> &'static FieldMap {
    match platform {
        Platform::TripAdvisor => &TRIPADVISOR_FIELDS,
        Platform::Expedia => &EXPEDIA_FIELDS,
        _ => &BOOKING_FIELDS,
    }
}

fn lookup_path<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(item, |current, key| current.get(key))
}

/// First non-blank string (or number, for ids) found at any of `paths`.
fn first_string(item: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|path| match lookup_path(item, path)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Maps one dataset item to a candidate. Items without a name are skipped.
fn item_to_candidate(platform: Platform, item: &Value) -> Option<MatchCandidate> {
    let fields = field_map(platform);
    Some(MatchCandidate {
        display_name: first_string(item, fields.name)?,
        formatted_address: first_string(item, fields.address),
        identifier: first_string(item, fields.identifier),
        url: first_string(item, fields.url),
    })
}

/// Actor input for a free-text search on `platform`.
fn job_input(platform: Platform, query: &str, max_items: usize) -> Value {
    match platform {
        Platform::TripAdvisor => json!({
            "query": query,
            "maxItemsPerQuery": max_items,
            "includeHotels": true,
            "includeRestaurants": false,
            "includeAttractions": false,
        }),
        Platform::Expedia => json!({
            "location": query,
            "maxItems": max_items,
        }),
        _ => json!({
            "search": query,
            "maxItems": max_items,
        }),
    }
}

#[derive(Deserialize)]
struct RunEnvelope {
    data: RunData,
}

#[derive(Deserialize)]
struct RunData {
    id: String,
    status: String,
    #[serde(rename = "defaultDatasetId")]
    default_dataset_id: Option<String>,
}

/// Translates a run status into a polling outcome carrying the dataset id.
fn run_poll_status(run: &RunData) -> Result<PollStatus<String>> {
    match run.status.as_str() {
        "READY" | "RUNNING" => Ok(PollStatus::Pending),
        "SUCCEEDED" => run
            .default_dataset_id
            .clone()
            .map(PollStatus::Ready)
            .ok_or_else(|| anyhow!("scraper run {} succeeded without a dataset", run.id)),
        "TIMED-OUT" | "TIMING-OUT" => Err(SourceError::Timeout(format!(
            "scraper run {} timed out upstream",
            run.id
        ))
        .into()),
        other => Ok(PollStatus::Failed(format!("run {} ended {}", run.id, other))),
    }
}

fn abort_url(base_url: &str, run_id: &str) -> String {
    format!("{}/actor-runs/{}/abort", base_url, run_id)
}

/// Aborts a started run when dropped armed: on errors, on cancellation, and when the
/// caller's timeout drops the search future mid-poll.
struct RunAbortGuard {
    http: reqwest::Client,
    url: String,
    token: String,
    armed: bool,
}

impl RunAbortGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RunAbortGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No runtime to abort scraper run at {}", self.url);
                return;
            }
        };
        let request = self
            .http
            .post(self.url.as_str())
            .query(&[("token", self.token.as_str())]);
        let url = self.url.clone();
        handle.spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Aborted scraper run at {}", url)
                }
                Ok(response) => debug!("Abort of {} returned {}", url, response.status()),
                Err(e) => warn!("Could not abort scraper run at {}: {}", url, e),
            }
        });
    }
}

/// Booking, TripAdvisor and Expedia through a hosted scraper that runs one job per query.
pub struct ScraperJobAdapter {
    platform: Platform,
    http: reqwest::Client,
    base_url: String,
    token: String,
    actor_id: String,
    max_items: usize,
    poll: PollSchedule,
    cancel: CancelToken,
}

impl ScraperJobAdapter {
    pub fn from_config(platform: Platform, config: &SourcesConfig) -> Result<Self> {
        if platform == Platform::GooglePlaces {
            return Err(anyhow!("Google Places is not served by the scraper adapter"));
        }
        let token = config
            .scraper_api_token
            .clone()
            .ok_or_else(|| anyhow!("SCRAPER_API_TOKEN is not set"))?;
        let actor_id = config
            .actor_id(platform)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("No scraper actor configured for {}", platform))?;
        let base_url = Url::parse(&config.scraper_base_url)
            .with_context(|| format!("Invalid SCRAPER_BASE_URL '{}'", config.scraper_base_url))?;
        if base_url.cannot_be_a_base() || !base_url.scheme().starts_with("http") {
            return Err(anyhow!("SCRAPER_BASE_URL must be an http(s) URL, got '{}'", base_url));
        }
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("Failed to build scraper HTTP client")?;

        Ok(Self {
            platform,
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            token,
            actor_id,
            max_items: config.max_results,
            poll: config.poll,
            cancel: CancelToken::new(),
        })
    }

    /// Stops in-flight polling when `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    async fn send_json(&self, request: reqwest::RequestBuilder, what: &str) -> Result<Value> {
        let response = request
            .query(&[("token", self.token.as_str())])
            .send()
            .await
            .map_err(|e| source_error_from_reqwest(what, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| source_error_from_reqwest(what, e))?;
        if let Some(kind) = failure_for_status(status) {
            let message = format!(
                "{} returned {}: {}",
                what,
                status,
                text.chars().take(300).collect::<String>()
            );
            return Err(match kind {
                FailureKind::RateLimited => SourceError::RateLimited(message),
                FailureKind::Timeout => SourceError::Timeout(message),
                FailureKind::Unavailable => SourceError::Unavailable(message),
            }
            .into());
        }
        serde_json::from_str(&text).with_context(|| format!("{}: malformed JSON", what))
    }

    async fn start_run(&self, query: &str) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", self.base_url, self.actor_id);
        let input = job_input(self.platform, query, self.max_items);
        let value = self
            .send_json(self.http.post(url).json(&input), "scraper run start")
            .await?;
        let envelope: RunEnvelope =
            serde_json::from_value(value).context("Unexpected scraper run payload")?;
        Ok(envelope.data)
    }

    async fn fetch_run(&self, run_id: &str) -> Result<RunData> {
        let url = format!("{}/actor-runs/{}", self.base_url, run_id);
        let value = self.send_json(self.http.get(url), "scraper run status").await?;
        let envelope: RunEnvelope =
            serde_json::from_value(value).context("Unexpected scraper run status payload")?;
        Ok(envelope.data)
    }

    fn abort_guard(&self, run_id: &str) -> RunAbortGuard {
        RunAbortGuard {
            http: self.http.clone(),
            url: abort_url(&self.base_url, run_id),
            token: self.token.clone(),
            armed: true,
        }
    }

    async fn dataset_items(&self, dataset_id: &str) -> Result<Vec<Value>> {
        let url = format!("{}/datasets/{}/items", self.base_url, dataset_id);
        let limit = self.max_items.to_string();
        let request = self
            .http
            .get(url)
            .query(&[("clean", "true"), ("format", "json"), ("limit", limit.as_str())]);
        match self.send_json(request, "scraper dataset read").await? {
            Value::Array(items) => Ok(items),
            other => Err(anyhow!("scraper dataset is not a list: {}", other)),
        }
    }
}

#[async_trait]
impl SourceAdapter for ScraperJobAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn search(&self, query: &str) -> Result<Vec<MatchCandidate>> {
        let run = self.start_run(query).await?;
        debug!("{} scraper run {} started for \"{}\"", self.platform, run.id, query);

        let mut guard = self.abort_guard(&run.id);
        let label = format!("{} run {}", self.platform, run.id);
        let dataset_id = match run_poll_status(&run)? {
            PollStatus::Ready(id) => id,
            PollStatus::Failed(reason) => {
                guard.disarm();
                return Err(SourceError::Unavailable(reason).into());
            }
            PollStatus::Pending => {
                let this = self;
                poll_with_timeout(&label, self.poll, &self.cancel, |_| {
                    let run_id = run.id.clone();
                    async move {
                        let current = this.fetch_run(&run_id).await?;
                        run_poll_status(&current)
                    }
                })
                .await?
            }
        };
        // Finished upstream; nothing left to abort.
        guard.disarm();

        let items = self.dataset_items(&dataset_id).await?;
        let candidates: Vec<MatchCandidate> = items
            .iter()
            .filter_map(|item| item_to_candidate(self.platform, item))
            .collect();
        if candidates.len() < items.len() {
            warn!(
                "{}: {} of {} dataset items had no usable name",
                label,
                items.len() - candidates.len(),
                items.len()
            );
        }
        Ok(candidates)
    }
}
