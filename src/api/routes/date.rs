//! Date Routes
//!
//! - GET /api/v1/date - The dashboard date
//! - PUT /api/v1/date - Select a new dashboard date

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::DateBody;
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// GET /api/v1/date
pub async fn get_date(State(state): State<Arc<AppState>>) -> Json<DateBody> {
    Json(DateBody {
        date: state.dashboard.current_date(),
    })
}

/// PUT /api/v1/date
pub async fn set_date(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DateBody>,
) -> ApiResult<Json<DateBody>> {
    state.dashboard.set_date(body.date)?;
    Ok(Json(body))
}
