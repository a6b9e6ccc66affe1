//! Building Routes
//!
//! - GET /api/v1/buildings - Buildings with data
//! - GET /api/v1/buildings/available - Years and months per building

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::analytics::AvailableData;
use crate::api::dto::BuildingListResponse;
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// GET /api/v1/buildings
pub async fn list_buildings(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<BuildingListResponse>> {
    let buildings = state.dashboard.buildings().await?;
    Ok(Json(BuildingListResponse {
        total: buildings.len(),
        buildings,
    }))
}

/// GET /api/v1/buildings/available
pub async fn available_data(State(state): State<Arc<AppState>>) -> ApiResult<Json<AvailableData>> {
    Ok(Json(state.dashboard.available_data().await?))
}
