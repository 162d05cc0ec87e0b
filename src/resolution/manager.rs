// src/resolution/manager.rs - Multi-platform and batch resolution runs
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use futures::future::join_all;
use indicatif::MultiProgress;
use log::{error, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::orchestrator::Resolver;
use super::store::ResolutionStore;
use crate::models::{Platform, Property, ResolutionRecord, ResolutionStatus};
use crate::sources::SourceAdapter;
use crate::utils::cancel::CancelToken;
use crate::utils::progress_bars::logging::{
    log_batch_completion, log_batch_progress, log_batch_start,
};
use crate::utils::progress_bars::progress_callback::{ProgressCallback, ProgressTracker};
use crate::utils::progress_bars::progress_config::ProgressConfig;
use crate::update_detailed_progress;

const PROGRESS_LOG_EVERY: usize = 25;
const RESOLVING_PHASE: &str = "Resolving properties";

/// Records produced for one property, plus how many could not be stored.
#[derive(Debug, Default)]
pub struct PropertyOutcome {
    pub records: Vec<ResolutionRecord>,
    pub store_errors: usize,
    pub cancelled: bool,
}

/// Resolves one property on every adapter's platform, one platform at a time, pausing
/// `inter_platform_delay` between platforms. Each record is written to `store` as soon as
/// it exists; store failures are counted, not fatal.
pub async fn resolve_across_platforms(
    resolver: &Resolver,
    property: &Property,
    adapters: &[Arc<dyn SourceAdapter>],
    store: Option<&dyn ResolutionStore>,
    cancel: &CancelToken,
) -> PropertyOutcome {
    let mut outcome = PropertyOutcome::default();
    let delay = resolver.config().inter_platform_delay;

    for (index, adapter) in adapters.iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if cancel.is_cancelled() {
            outcome.cancelled = true;
            break;
        }

        let Some(record) = resolver
            .resolve_with_cancel(property, adapter.as_ref(), cancel)
            .await
        else {
            outcome.cancelled = true;
            break;
        };

        if let Some(store) = store {
            if let Err(e) = store.upsert(&record).await {
                error!(
                    "Failed to store resolution for ({}, {}): {:#}",
                    record.property_id, record.platform, e
                );
                outcome.store_errors += 1;
            }
        }
        outcome.records.push(record);
    }
    outcome
}

/// Totals of a batch run.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub run_id: String,
    pub started_at: NaiveDateTime,
    pub duration: Duration,
    pub properties_total: usize,
    pub properties_completed: usize,
    pub records_written: usize,
    pub store_errors: usize,
    pub failed_tasks: usize,
    pub cancelled: bool,
    pub status_counts: HashMap<ResolutionStatus, usize>,
}

impl BatchSummary {
    fn new(run_id: String, properties_total: usize) -> Self {
        Self {
            run_id,
            started_at: Utc::now().naive_utc(),
            duration: Duration::ZERO,
            properties_total,
            properties_completed: 0,
            records_written: 0,
            store_errors: 0,
            failed_tasks: 0,
            cancelled: false,
            status_counts: HashMap::new(),
        }
    }

    pub fn count(&self, status: ResolutionStatus) -> usize {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }

    /// Status counts in a fixed order, zeros included.
    pub fn ordered_counts(&self) -> Vec<(ResolutionStatus, usize)> {
        ResolutionStatus::ALL
            .iter()
            .map(|s| (*s, self.count(*s)))
            .collect()
    }

    fn absorb(&mut self, outcome: &PropertyOutcome) {
        for record in &outcome.records {
            *self.status_counts.entry(record.status).or_insert(0) += 1;
        }
        self.records_written += outcome.records.len() - outcome.store_errors.min(outcome.records.len());
        self.store_errors += outcome.store_errors;
        if outcome.cancelled {
            self.cancelled = true;
        } else {
            self.properties_completed += 1;
        }
    }
}

/// Shared inputs of a batch run.
pub struct BatchContext {
    pub resolver: Arc<Resolver>,
    pub adapters: Vec<Arc<dyn SourceAdapter>>,
    pub store: Arc<dyn ResolutionStore>,
    pub cancel: CancelToken,
    pub progress_config: ProgressConfig,
    pub multi_progress: Option<MultiProgress>,
    pub progress_callback: Option<ProgressCallback>,
}

fn spawn_property_task(
    ctx: &BatchContext,
    property: Property,
    semaphore: Arc<Semaphore>,
    completed: Arc<AtomicUsize>,
    resolved: Arc<AtomicUsize>,
    total: usize,
    progress_bar: Option<indicatif::ProgressBar>,
) -> JoinHandle<Result<PropertyOutcome>> {
    let resolver = Arc::clone(&ctx.resolver);
    let adapters = ctx.adapters.clone();
    let store = Arc::clone(&ctx.store);
    let cancel = ctx.cancel.clone();
    let callback = ctx.progress_callback.clone();

    tokio::spawn(async move {
        let _permit = semaphore
            .acquire_owned()
            .await
            .context("Failed to acquire semaphore permit")?;

        if cancel.is_cancelled() {
            return Ok(PropertyOutcome {
                cancelled: true,
                ..PropertyOutcome::default()
            });
        }

        let outcome =
            resolve_across_platforms(&resolver, &property, &adapters, Some(store.as_ref()), &cancel)
                .await;

        let newly_resolved = outcome
            .records
            .iter()
            .filter(|r| r.status == ResolutionStatus::Resolved)
            .count();
        let resolved_so_far = resolved.fetch_add(newly_resolved, Ordering::SeqCst) + newly_resolved;
        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(pb) = &progress_bar {
            pb.inc(1);
            pb.set_message(format!("{} listings resolved", resolved_so_far));
        }
        update_detailed_progress!(callback, RESOLVING_PHASE, done, total, property.id);
        if done % PROGRESS_LOG_EVERY == 0 || done == total {
            log_batch_progress(done, total, resolved_so_far);
        }
        Ok(outcome)
    })
}

/// Resolves every property on every adapter's platform with at most
/// `max_concurrent_units` properties in flight, storing each record as it completes.
///
/// A cancelled run stops starting new units; units already cancelled write nothing.
pub async fn run_resolution_batch(ctx: BatchContext, properties: Vec<Property>) -> Result<BatchSummary> {
    let run_id = Uuid::new_v4().to_string();
    let start = Instant::now();
    let total = properties.len();
    let platforms: Vec<Platform> = ctx.adapters.iter().map(|a| a.platform()).collect();
    let workers = ctx.resolver.config().max_concurrent_units.max(1);
    let mut summary = BatchSummary::new(run_id.clone(), total);

    log_batch_start(&run_id, total, &platforms, workers);
    let mut tracker = ProgressTracker::new(ctx.progress_callback.clone());
    tracker.set_phase(RESOLVING_PHASE);

    let progress_bar = ctx
        .multi_progress
        .as_ref()
        .map(|mp| ctx.progress_config.batch_bar(mp, total));

    let semaphore = Arc::new(Semaphore::new(workers));
    let completed = Arc::new(AtomicUsize::new(0));
    let resolved = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<JoinHandle<Result<PropertyOutcome>>> = properties
        .into_iter()
        .map(|property| {
            spawn_property_task(
                &ctx,
                property,
                Arc::clone(&semaphore),
                Arc::clone(&completed),
                Arc::clone(&resolved),
                total,
                progress_bar.clone(),
            )
        })
        .collect();

    for joined in join_all(tasks).await {
        match joined {
            Ok(Ok(outcome)) => summary.absorb(&outcome),
            Ok(Err(e)) => {
                warn!("Resolution task failed: {:#}", e);
                summary.failed_tasks += 1;
            }
            Err(e) => {
                error!("Resolution task panicked or was aborted: {}", e);
                summary.failed_tasks += 1;
            }
        }
    }

    summary.duration = start.elapsed();
    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!(
            "Done: {} resolved, {} need review",
            summary.count(ResolutionStatus::Resolved),
            summary.count(ResolutionStatus::NeedsReview)
        ));
    }
    tracker.finish_phase(&format!("{} records", summary.records_written));
    log_batch_completion(
        &run_id,
        summary.duration,
        &summary.ordered_counts(),
        summary.store_errors,
        summary.cancelled,
    );
    Ok(summary)
}
