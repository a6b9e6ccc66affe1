//! Alert Routes
//!
//! - GET /api/v1/alerts - Recent-alert summary, or a filtered list
//! - POST /api/v1/alerts/analyze - Run upstream anomaly detection
//! - POST /api/v1/alerts/status - Acknowledge, clear, or set downtime

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::analytics::{AnalyzeRequest, AnalyzeResponse, StatusUpdate};
use crate::api::dto::AlertsQuery;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// GET /api/v1/alerts
///
/// With no filters, returns the alert tile for `as_of` (default: the
/// dashboard date). With any filter, returns matching alerts and stats.
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AlertsQuery>,
) -> ApiResult<Response> {
    if !q.is_filtered() {
        let as_of = q.as_of.unwrap_or_else(|| state.dashboard.current_date());
        let summary = state.dashboard.alert_summary(as_of).await?;
        return Ok(Json(summary).into_response());
    }

    let query = q.to_query().map_err(ApiError::Validation)?;
    let list = state.dashboard.alerts(&query).await?;
    Ok(Json(list).into_response())
}

/// POST /api/v1/alerts/analyze
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalyzeResponse>> {
    Ok(Json(state.dashboard.analyze(&req).await?))
}

/// POST /api/v1/alerts/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<StatusCode> {
    state.dashboard.update_alert(&update).await?;
    Ok(StatusCode::NO_CONTENT)
}
