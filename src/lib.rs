//! # Wattboard
//!
//! Building energy dashboard backend. Wattboard reads per-building daily
//! electricity readings from an upstream energy REST API and turns them into
//! the views an operations dashboard shows: monthly summaries, daily and
//! yearly reports, calendar heatmaps, period comparisons, and alert tiles.
//!
//! ## Modules
//!
//! - [`analytics`]: Pure aggregation, comparison, and classification
//! - [`client`]: Upstream energy API client and the [`EnergySource`] trait
//! - [`ingest`]: Meter CSV parsing and validation
//! - [`cache`]: SQLite report cache with retention
//! - [`context`]: The dashboard's selected date
//! - [`fetch_guard`]: Latest-request-wins guard for concurrent fetches
//! - [`dashboard`]: Views composed from the above
//! - [`api`]: REST API server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wattboard::{
//!     Config, DashboardService, DashboardSettings, DateContext, EnergyApiClient, ReportCache,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let client = EnergyApiClient::new(config.upstream.client_config())?;
//!     let cache = Arc::new(ReportCache::in_memory()?);
//!     let today = chrono::Utc::now().date_naive();
//!
//!     let dashboard = DashboardService::new(
//!         Arc::new(client),
//!         cache,
//!         DateContext::new(today),
//!         DashboardSettings::from_config(&config),
//!     );
//!
//!     let summary = dashboard.monthly_summary("All Buildings", 2024, 3, false).await?;
//!     println!("Total usage: {} kWh", summary.total_usage);
//!
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod fetch_guard;
pub mod ingest;

// Re-export top-level types for convenience
pub use analytics::{
    average_series, classify, pct_change, CalendarMonth, ConsumptionLevel, DailyReading,
    DailyReport, Dataset, MonthlySummary, PeriodComparison, YearlyReport, ALL_BUILDINGS,
};

pub use client::{EnergyApiClient, EnergyApiConfig, EnergyApiError, EnergySource};

pub use cache::{CacheError, CacheKey, ReportCache, Retention};

pub use context::DateContext;

pub use fetch_guard::{LatestOnly, Ticket};

pub use dashboard::{DashboardError, DashboardService, DashboardSettings, GraphRequest, GraphView};

pub use ingest::{ImportError, MeterCsv};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig};
