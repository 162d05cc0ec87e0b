// src/resolution/store.rs - Persistence seam for resolution records
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::{Platform, ResolutionRecord};

/// Keyed by (property id, platform); writing the same record twice is a no-op.
#[async_trait]
pub trait ResolutionStore: Send + Sync {
    async fn upsert(&self, record: &ResolutionRecord) -> Result<()>;

    async fn get(&self, property_id: &str, platform: Platform) -> Result<Option<ResolutionRecord>>;
}

#[derive(Default)]
pub struct InMemoryResolutionStore {
    records: RwLock<HashMap<(String, Platform), ResolutionRecord>>,
}

impl InMemoryResolutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Every stored record, ordered by property id then platform.
    pub async fn all(&self) -> Vec<ResolutionRecord> {
        let mut records: Vec<ResolutionRecord> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| {
            a.property_id
                .cmp(&b.property_id)
                .then(a.platform.cmp(&b.platform))
        });
        records
    }
}

#[async_trait]
impl ResolutionStore for InMemoryResolutionStore {
    async fn upsert(&self, record: &ResolutionRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert((record.property_id.clone(), record.platform), record.clone());
        Ok(())
    }

    async fn get(&self, property_id: &str, platform: Platform) -> Result<Option<ResolutionRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(&(property_id.to_string(), platform))
            .cloned())
    }
}
