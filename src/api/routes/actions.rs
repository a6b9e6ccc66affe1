//! Action Routes
//!
//! - POST /api/v1/upload - Submit up to two meter CSV files (multipart)
//! - POST /api/v1/notify - Send a daily or alert email

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{UploadSummary, UploadedFile};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::client::{Notification, UploadFile};

/// POST /api/v1/upload
///
/// Each multipart field carrying a file is one meter export.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadSummary>> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        let file_name = field
            .file_name()
            .or_else(|| field.name())
            .unwrap_or("upload.csv")
            .to_string();
        let contents = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("Failed to read {}: {}", file_name, e)))?;
        files.push(UploadFile {
            file_name,
            contents: contents.to_vec(),
        });
    }

    let names: Vec<String> = files.iter().map(|f| f.file_name.clone()).collect();
    let (response, parsed) = state.dashboard.upload(files).await?;

    let files = names
        .into_iter()
        .zip(parsed)
        .map(|(file_name, meter)| UploadedFile {
            file_name,
            days: meter.readings.len(),
            total: meter.total(),
            building: meter.building,
            month: meter.month_name,
        })
        .collect();

    tracing::info!(message = %response.message, "Meter files uploaded");
    Ok(Json(UploadSummary {
        message: response.message,
        files,
    }))
}

/// POST /api/v1/notify
pub async fn notify(
    State(state): State<Arc<AppState>>,
    Json(notification): Json<Notification>,
) -> ApiResult<StatusCode> {
    state.dashboard.notify(notification).await?;
    Ok(StatusCode::ACCEPTED)
}
