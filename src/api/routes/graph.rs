//! Graph Routes
//!
//! - POST /api/v1/graph - Compare monthly series, with an optional average
//! - POST /api/v1/predict - Forecast from the graphed series

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::analytics::Dataset;
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::client::Prediction;
use crate::dashboard::{GraphRequest, GraphView};

/// POST /api/v1/graph
pub async fn graph(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GraphRequest>,
) -> ApiResult<Json<GraphView>> {
    Ok(Json(state.dashboard.graph(&req).await?))
}

/// POST /api/v1/predict
///
/// Body: the datasets to forecast from, as returned by `/graph`.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(datasets): Json<Vec<Dataset>>,
) -> ApiResult<Json<Prediction>> {
    Ok(Json(state.dashboard.predict(&datasets).await?))
}
