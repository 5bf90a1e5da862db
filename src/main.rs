use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use hubmatch::api::AppState;
use hubmatch::config::{GeocodingConfig, SourceConfig, SourceKind};
use hubmatch::registry::spawn_periodic_reload;
use hubmatch::{
    CachedGeocoder, CsvHubSource, GeocodeCache, Geocoder, HereGeocoder, HubMatchConfig,
    HubRegistry, HubSource, JsonHubSource, MatchService, NotificationService, logging, web,
};

/// Match submitted addresses to the nearest delivery hub
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Load configuration and hubs, print a summary and exit
    #[arg(long)]
    check: bool,
}

fn build_source(config: &SourceConfig) -> Box<dyn HubSource> {
    match config.kind {
        SourceKind::Csv => Box::new(CsvHubSource::new(&config.path)),
        SourceKind::Json => Box::new(JsonHubSource::new(&config.path)),
    }
}

fn build_geocoder(config: &GeocodingConfig) -> Result<Arc<dyn Geocoder>> {
    let here = HereGeocoder::new(config)?;
    if !config.cache_enabled {
        return Ok(Arc::new(here));
    }

    let capacity = NonZeroUsize::new(config.cache_capacity)
        .context("geocoding.cache_capacity must be greater than 0")?;
    let cache = GeocodeCache::new(capacity, Duration::from_secs(config.cache_ttl_seconds));
    Ok(Arc::new(CachedGeocoder::new(here, cache)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = HubMatchConfig::load_from_path(args.config.clone())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    logging::init(&config.logging);

    let registry = Arc::new(
        HubRegistry::new(build_source(&config.source)).require_records(config.source.required),
    );
    let snapshot = registry
        .load()
        .await
        .context("Failed to load hub locations")?;

    if args.check {
        let counts = snapshot.counts();
        println!(
            "Configuration OK: {} hubs ({} active, {} inactive), {} rejected rows",
            counts.total,
            counts.active,
            counts.inactive,
            snapshot.rejected_rows()
        );
        return Ok(());
    }

    let geocoder = build_geocoder(&config.geocoding)?;
    let notifier = Arc::new(NotificationService::new(&config.notification)?);
    let matcher = Arc::new(MatchService::new(
        Arc::clone(&registry),
        geocoder,
        &config.matching,
    ));

    let _reload_task = (config.source.reload_interval_seconds > 0).then(|| {
        spawn_periodic_reload(
            Arc::clone(&registry),
            Duration::from_secs(config.source.reload_interval_seconds),
        )
    });

    info!("Starting hubmatch {}", hubmatch::VERSION);
    let app = web::app(AppState::new(matcher, notifier), &config.server);
    web::serve(app, &config.server).await
}
