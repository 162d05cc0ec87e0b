// src/resolution/db.rs - PostgreSQL persistence for properties and resolution records
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use std::collections::HashMap;
use tokio_postgres::Row;

use super::store::ResolutionStore;
use crate::models::{Platform, Property, ResolutionRecord, ResolutionStatus, ScoredCandidate};
use crate::utils::db_connect::PgPool;

const CREATE_LISTING_RESOLUTION: &str = "
CREATE TABLE IF NOT EXISTS public.listing_resolution (
    property_id TEXT NOT NULL,
    platform TEXT NOT NULL,
    status TEXT NOT NULL,
    identifier TEXT,
    url TEXT,
    display_name TEXT,
    confidence DOUBLE PRECISION,
    match_reason TEXT,
    candidates JSONB NOT NULL DEFAULT '[]'::jsonb,
    last_error TEXT,
    attempts INTEGER NOT NULL DEFAULT 0,
    queries_tried JSONB NOT NULL DEFAULT '[]'::jsonb,
    duration_ms BIGINT NOT NULL DEFAULT 0,
    resolved_at TIMESTAMP NOT NULL,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (property_id, platform)
)";

const UPSERT_LISTING_RESOLUTION: &str = "
INSERT INTO public.listing_resolution
    (property_id, platform, status, identifier, url, display_name, confidence, match_reason,
     candidates, last_error, attempts, queries_tried, duration_ms, resolved_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, CURRENT_TIMESTAMP)
ON CONFLICT (property_id, platform) DO UPDATE SET
    status = EXCLUDED.status,
    identifier = EXCLUDED.identifier,
    url = EXCLUDED.url,
    display_name = EXCLUDED.display_name,
    confidence = EXCLUDED.confidence,
    match_reason = EXCLUDED.match_reason,
    candidates = EXCLUDED.candidates,
    last_error = EXCLUDED.last_error,
    attempts = EXCLUDED.attempts,
    queries_tried = EXCLUDED.queries_tried,
    duration_ms = EXCLUDED.duration_ms,
    resolved_at = EXCLUDED.resolved_at,
    updated_at = CURRENT_TIMESTAMP";

/// Resolution records in `public.listing_resolution`.
#[derive(Clone)]
pub struct PgResolutionStore {
    pool: PgPool,
}

impl PgResolutionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the records table when it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for ensure_schema")?;
        conn.batch_execute(CREATE_LISTING_RESOLUTION)
            .await
            .context("Failed to create public.listing_resolution")?;
        info!("Table public.listing_resolution is ready");
        Ok(())
    }
}

fn record_from_row(row: &Row) -> Result<ResolutionRecord> {
    let platform: String = row.get("platform");
    let status: String = row.get("status");
    let candidates: serde_json::Value = row.get("candidates");
    let queries: serde_json::Value = row.get("queries_tried");
    let attempts: i32 = row.get("attempts");
    let duration_ms: i64 = row.get("duration_ms");
    let resolved_at: NaiveDateTime = row.get("resolved_at");

    Ok(ResolutionRecord {
        property_id: row.get("property_id"),
        platform: platform.parse::<Platform>()?,
        status: status.parse::<ResolutionStatus>()?,
        identifier: row.get("identifier"),
        url: row.get("url"),
        display_name: row.get("display_name"),
        confidence: row.get("confidence"),
        match_reason: row.get("match_reason"),
        candidates: serde_json::from_value::<Vec<ScoredCandidate>>(candidates)
            .context("Malformed candidates JSON in listing_resolution")?,
        last_error: row.get("last_error"),
        attempts: attempts.max(0) as u32,
        queries_tried: serde_json::from_value::<Vec<String>>(queries)
            .context("Malformed queries_tried JSON in listing_resolution")?,
        duration_ms: duration_ms.max(0) as u64,
        resolved_at,
    })
}

#[async_trait]
impl ResolutionStore for PgResolutionStore {
    async fn upsert(&self, record: &ResolutionRecord) -> Result<()> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for listing_resolution upsert")?;

        let candidates_json = serde_json::to_value(&record.candidates)
            .context("Failed to serialize candidates for listing_resolution")?;
        let queries_json = serde_json::to_value(&record.queries_tried)
            .context("Failed to serialize queries for listing_resolution")?;
        let attempts = record.attempts as i32;
        let duration_ms = record.duration_ms as i64;

        conn.execute(
            UPSERT_LISTING_RESOLUTION,
            &[
                &record.property_id,
                &record.platform.as_str(),
                &record.status.as_str(),
                &record.identifier,
                &record.url,
                &record.display_name,
                &record.confidence,
                &record.match_reason,
                &candidates_json,
                &record.last_error,
                &attempts,
                &queries_json,
                &duration_ms,
                &record.resolved_at,
            ],
        )
        .await
        .context(format!(
            "Failed to upsert listing_resolution ({}, {})",
            record.property_id, record.platform
        ))?;

        debug!(
            "Upserted listing_resolution ({}, {}) as {}",
            record.property_id,
            record.platform,
            record.status.as_str()
        );
        Ok(())
    }

    async fn get(&self, property_id: &str, platform: Platform) -> Result<Option<ResolutionRecord>> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for listing_resolution lookup")?;
        let row = conn
            .query_opt(
                "SELECT property_id, platform, status, identifier, url, display_name, confidence,
                        match_reason, candidates, last_error, attempts, queries_tried, duration_ms,
                        resolved_at
                 FROM public.listing_resolution
                 WHERE property_id = $1 AND platform = $2",
                &[&property_id, &platform.as_str()],
            )
            .await
            .context("Failed to query listing_resolution")?;
        row.as_ref().map(record_from_row).transpose()
    }
}

/// Loads properties to resolve, optionally restricted to `ids`, with the identifiers of
/// earlier resolutions attached so they can be re-verified by lookup.
pub async fn fetch_properties(pool: &PgPool, ids: Option<&[String]>, limit: Option<i64>) -> Result<Vec<Property>> {
    let conn = pool
        .get()
        .await
        .context("Failed to get DB connection for fetch_properties")?;

    let rows = match ids {
        Some(ids) => conn
            .query(
                "SELECT id, name, city, state FROM public.property
                 WHERE id = ANY($1) ORDER BY id LIMIT $2",
                &[&ids, &limit.unwrap_or(i64::MAX)],
            )
            .await
            .context("Failed to query properties by id")?,
        None => conn
            .query(
                "SELECT id, name, city, state FROM public.property ORDER BY id LIMIT $1",
                &[&limit.unwrap_or(i64::MAX)],
            )
            .await
            .context("Failed to query properties")?,
    };

    let mut properties: Vec<Property> = rows
        .iter()
        .map(|row| {
            let id: String = row.get("id");
            let name: String = row.get("name");
            let city: Option<String> = row.get("city");
            let state: Option<String> = row.get("state");
            Property::new(&id, &name, city.as_deref().unwrap_or_default(), state.as_deref())
        })
        .collect();

    let property_ids: Vec<String> = properties.iter().map(|p| p.id.clone()).collect();
    let known_rows = conn
        .query(
            "SELECT property_id, platform, identifier FROM public.listing_resolution
             WHERE status = 'resolved' AND identifier IS NOT NULL AND property_id = ANY($1)",
            &[&property_ids],
        )
        .await;

    match known_rows {
        Ok(rows) => {
            let mut known: HashMap<String, Vec<(Platform, String)>> = HashMap::new();
            for row in rows {
                let platform: String = row.get("platform");
                let Ok(platform) = platform.parse::<Platform>() else {
                    continue;
                };
                known
                    .entry(row.get("property_id"))
                    .or_default()
                    .push((platform, row.get("identifier")));
            }
            for property in properties.iter_mut() {
                if let Some(entries) = known.remove(&property.id) {
                    for (platform, identifier) in entries {
                        property.known_identifiers.insert(platform, identifier);
                    }
                }
            }
        }
        Err(e) => warn!(
            "Could not load known identifiers (first run?): {}. Continuing without them.",
            e
        ),
    }

    info!("Loaded {} properties for resolution", properties.len());
    Ok(properties)
}
