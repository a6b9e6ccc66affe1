//! Wattboard API Server
//!
//! Run with: cargo run --bin wattboard
//!
//! # Configuration
//!
//! Reads `config.toml` from the usual locations (see `wattboard-cli config`),
//! or the path in `WATTBOARD_CONFIG`. Environment overrides:
//! - `WATTBOARD_UPSTREAM_URL`: Energy API base URL
//! - `WATTBOARD_API_HOST` / `WATTBOARD_API_PORT`: Bind address
//! - `WATTBOARD_CACHE_PATH`: Report cache database
//! - `WATTBOARD_LOG_LEVEL` / `WATTBOARD_LOG_FORMAT`: Logging
//! - `RUST_LOG`: Full filter directive, takes precedence over the log level

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wattboard::api::{serve, AppState};
use wattboard::{
    Config, DashboardService, DashboardSettings, DateContext, EnergyApiClient, LoggingConfig,
    ReportCache,
};

const RETENTION_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    init_tracing(&config.logging);

    tracing::info!("Starting Wattboard API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Upstream energy API: {}", config.upstream.url);

    let cache = Arc::new(ReportCache::open(Path::new(&config.cache.path))?);
    tracing::info!("Report cache: {:?}", config.cache.path);

    let today = Utc::now().date_naive();
    let context = DateContext::load(Arc::clone(&cache), today)?;
    tracing::info!("Dashboard date: {}", context.current());

    let client = EnergyApiClient::new(config.upstream.client_config())?;
    let dashboard = Arc::new(DashboardService::new(
        Arc::new(client),
        cache,
        context,
        DashboardSettings::from_config(&config),
    ));

    // Drop cached views past retention now and hourly after
    dashboard.purge_expired()?;
    let retention_handle = start_retention_task(Arc::clone(&dashboard));

    if dashboard.upstream_ready().await {
        tracing::info!("Energy API connection verified");
    } else {
        tracing::warn!("Energy API not reachable, views will be degraded until it is");
    }

    let state = AppState::new(dashboard, config.api.clone());
    serve(state, &config.api).await?;
    retention_handle.abort();

    tracing::info!("Wattboard API server stopped");
    Ok(())
}

fn start_retention_task(dashboard: Arc<DashboardService>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RETENTION_INTERVAL);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = dashboard.purge_expired() {
                tracing::warn!(error = %e, "Cache retention pass failed");
            }
        }
    })
}

/// Load configuration from `WATTBOARD_CONFIG` or the default locations
fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    match std::env::var("WATTBOARD_CONFIG") {
        Ok(path) => Ok(Config::load_with_env(&PathBuf::from(path))?),
        Err(_) => Ok(Config::load_default()),
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.default_filter()));

    if logging.is_json() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
