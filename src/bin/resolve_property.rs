// src/bin/resolve_property.rs
//
// Resolves a single property given on the command line and prints the
// resulting records as JSON.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{info, warn};
use resolver_lib::models::{Platform, Property};
use resolver_lib::resolution::{resolve_across_platforms, InMemoryResolutionStore, Resolver};
use resolver_lib::sources::{build_adapters, SourcesConfig};
use resolver_lib::utils::cancel::CancelToken;
use resolver_lib::utils::env::load_env;
use resolver_lib::utils::resolver_config::ResolverConfig;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct ResolveArgs {
    /// Property name as stored in the catalog
    #[arg(long)]
    name: String,

    #[arg(long)]
    city: String,

    /// State or region code
    #[arg(long)]
    state: Option<String>,

    #[arg(long, default_value = "cli")]
    id: String,

    /// Comma-separated platforms (google, booking, tripadvisor, expedia)
    #[arg(long, default_value = "google,booking,tripadvisor,expedia")]
    platforms: String,

    /// Identifier already known on a platform, as platform=identifier
    #[arg(long = "known")]
    known: Vec<String>,

    /// Skip the pause between platforms
    #[arg(long)]
    no_delay: bool,
}

fn parse_known(entry: &str) -> Result<(Platform, String)> {
    let (platform, identifier) = entry
        .split_once('=')
        .ok_or_else(|| anyhow!("--known expects platform=identifier, got '{}'", entry))?;
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(anyhow!("--known '{}' has an empty identifier", entry));
    }
    Ok((platform.trim().parse::<Platform>()?, identifier.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let args = ResolveArgs::parse();

    let platforms = Platform::parse_list(&args.platforms).context("Invalid --platforms")?;
    if platforms.is_empty() {
        return Err(anyhow!("--platforms selects no platform"));
    }

    let mut property = Property::new(&args.id, &args.name, &args.city, args.state.as_deref());
    for entry in &args.known {
        let (platform, identifier) = parse_known(entry)?;
        property = property.with_known_identifier(platform, &identifier);
    }

    let mut config = ResolverConfig::from_env();
    if args.no_delay {
        config.inter_platform_delay = std::time::Duration::ZERO;
    }
    config.log_config();
    let resolver = Resolver::new(config);
    let cancel = CancelToken::new();
    let adapters = build_adapters(&platforms, &SourcesConfig::from_env(), &cancel)?;
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, stopping after the current call");
            signal_cancel.cancel();
        }
    });

    info!("Resolving '{}' ({}) on {} platforms", property.name, property.city, platforms.len());
    let store = InMemoryResolutionStore::new();
    let outcome =
        resolve_across_platforms(&resolver, &property, &adapters, Some(&store), &cancel).await;
    if outcome.cancelled {
        warn!("Cancelled; printing the {} records finished so far", outcome.records.len());
    }

    let records = store.all().await;
    println!(
        "{}",
        serde_json::to_string_pretty(&records).context("Failed to serialize records")?
    );
    Ok(())
}
