//! Wattboard REST API
//!
//! HTTP API layer serving pre-computed dashboard views, built with Axum.
//!
//! # Endpoints
//!
//! ## Buildings
//! - `GET /api/v1/buildings` - Buildings with data
//! - `GET /api/v1/buildings/available` - Years and months per building
//!
//! ## Reports
//! - `GET /api/v1/summary` - Monthly summary (building or `All Buildings`)
//! - `GET /api/v1/report/daily` - Daily report across buildings
//! - `GET /api/v1/report/yearly` - Yearly report
//! - `GET /api/v1/calendar` - Calendar heatmap
//! - `GET /api/v1/comparison` - Day vs previous day, week, and month
//! - `GET /api/v1/map` - Buildings on a day against their monthly means
//!
//! ## Alerts
//! - `GET /api/v1/alerts` - Recent-alert summary or filtered list
//! - `POST /api/v1/alerts/analyze` - Run anomaly detection
//! - `POST /api/v1/alerts/status` - Update alert status
//!
//! ## Graph
//! - `POST /api/v1/graph` - Compare monthly series
//! - `POST /api/v1/predict` - Forecast consumption
//!
//! ## Date
//! - `GET /api/v1/date` - Dashboard date
//! - `PUT /api/v1/date` - Select dashboard date
//!
//! ## Actions
//! - `POST /api/v1/upload` - Upload meter CSV files
//! - `POST /api/v1/notify` - Send an email notification
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ApiConfig;

/// Uploads carry two month-long CSV exports at most
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let timeout = Duration::from_secs(state.config.request_timeout_secs.max(1));

    let api_routes = Router::new()
        // Building routes
        .route("/buildings", get(routes::buildings::list_buildings))
        .route("/buildings/available", get(routes::buildings::available_data))
        // Report routes
        .route("/summary", get(routes::reports::monthly_summary))
        .route("/report/daily", get(routes::reports::daily_report))
        .route("/report/yearly", get(routes::reports::yearly_report))
        .route("/calendar", get(routes::reports::calendar))
        .route("/comparison", get(routes::reports::comparison))
        .route("/map", get(routes::reports::building_map))
        // Alert routes
        .route("/alerts", get(routes::alerts::list_alerts))
        .route("/alerts/analyze", post(routes::alerts::analyze))
        .route("/alerts/status", post(routes::alerts::update_status))
        // Graph routes
        .route("/graph", post(routes::graph::graph))
        .route("/predict", post(routes::graph::predict))
        // Date routes
        .route(
            "/date",
            get(routes::date::get_date).put(routes::date::set_date),
        )
        // Action routes
        .route("/notify", post(routes::actions::notify))
        .route("/upload", post(routes::actions::upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// CORS for the configured front-end origins; any origin only when none are set
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origin configured, cross-origin requests will be refused");
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Wattboard API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Wattboard API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
