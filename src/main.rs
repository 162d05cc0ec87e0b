use anyhow::{Context, Result};
use log::{info, warn};
use resolver_lib::models::{Platform, ResolutionStatus};
use resolver_lib::resolution::{
    fetch_properties, run_resolution_batch, BatchContext, PgResolutionStore, Resolver,
};
use resolver_lib::sources::{build_adapters, SourcesConfig};
use resolver_lib::utils::cancel::CancelToken;
use resolver_lib::utils::db_connect::{connect, get_pool_status};
use resolver_lib::utils::env::{env_or, env_string, load_env};
use resolver_lib::utils::progress_bars::progress_callback::create_simple_callback;
use resolver_lib::utils::progress_bars::progress_config::ProgressConfig;
use resolver_lib::utils::resolver_config::ResolverConfig;
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    info!("Starting cross-platform property resolution run");
    load_env();
    let start = Instant::now();

    let resolver_config = ResolverConfig::from_env();
    resolver_config.log_config();
    let sources_config = SourcesConfig::from_env();
    sources_config.log_config();
    let progress_config = ProgressConfig::from_env();
    info!(
        "Progress tracking: enabled={}, detailed={}",
        progress_config.enabled, progress_config.detailed
    );

    let platforms = match env_string("RESOLVER_PLATFORMS") {
        Some(raw) => Platform::parse_list(&raw).context("Invalid RESOLVER_PLATFORMS")?,
        None => Platform::ALL.to_vec(),
    };
    if platforms.is_empty() {
        warn!("RESOLVER_PLATFORMS selects no platform; nothing to do");
        return Ok(());
    }
    let cancel = CancelToken::new();
    let adapters = build_adapters(&platforms, &sources_config, &cancel)?;

    let pool = connect().await.context("Failed to connect to database")?;
    info!("Successfully connected to the database");

    let store = PgResolutionStore::new(pool.clone());
    store
        .ensure_schema()
        .await
        .context("Failed to prepare resolution table")?;

    let ids: Option<Vec<String>> = env_string("PROPERTY_IDS").map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    });
    let limit: i64 = env_or("PROPERTY_LIMIT", 0);
    let properties = fetch_properties(&pool, ids.as_deref(), (limit > 0).then_some(limit))
        .await
        .context("Failed to load properties")?;
    if properties.is_empty() {
        info!("No properties to resolve");
        return Ok(());
    }

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Received Ctrl+C, finishing in-flight calls and stopping...");
                signal_cancel.cancel();
            }
            Err(e) => warn!("Could not install Ctrl+C handler: {}", e),
        }
    });

    let progress_callback = progress_config
        .should_show_detailed()
        .then(|| create_simple_callback("resolution"));
    let ctx = BatchContext {
        resolver: Arc::new(Resolver::new(resolver_config)),
        adapters: adapters.clone(),
        store: Arc::new(store),
        cancel,
        multi_progress: progress_config.create_multi_progress(),
        progress_config: progress_config.clone(),
        progress_callback,
    };

    let summary = run_resolution_batch(ctx, properties)
        .await
        .context("Resolution run failed")?;

    if progress_config.should_show_cache_stats() {
        for adapter in &adapters {
            if let Some((hits, misses)) = adapter.cache_stats() {
                info!("Search cache {}: {} hits, {} misses", adapter.platform(), hits, misses);
            }
        }
    }
    if progress_config.should_show_db_connection_stats() {
        let (total, idle, in_use) = get_pool_status(&pool);
        info!("DB pool: {} total, {} idle, {} in use", total, idle, in_use);
    }
    info!(
        "Run {} finished in {:.2?}: {} of {} properties, {} records written, {} resolved, {} need review",
        summary.run_id,
        start.elapsed(),
        summary.properties_completed,
        summary.properties_total,
        summary.records_written,
        summary.count(ResolutionStatus::Resolved),
        summary.count(ResolutionStatus::NeedsReview)
    );
    if summary.store_errors > 0 || summary.failed_tasks > 0 {
        warn!(
            "{} records could not be stored, {} tasks failed",
            summary.store_errors, summary.failed_tasks
        );
    }
    Ok(())
}
