//! Report Routes
//!
//! Pre-computed views for the summary, report, and calendar widgets.
//! Missing dates default to the dashboard date.
//!
//! - GET /api/v1/summary - Monthly summary
//! - GET /api/v1/report/daily - Daily report across buildings
//! - GET /api/v1/report/yearly - Yearly report
//! - GET /api/v1/calendar - Calendar heatmap
//! - GET /api/v1/comparison - Day vs previous day/week/month
//! - GET /api/v1/map - Buildings on a day against their monthly means

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Datelike;
use std::sync::Arc;

use crate::analytics::{
    BuildingMap, CalendarMonth, DailyReport, MonthlySummary, PeriodComparison, YearlyReport,
};
use crate::api::dto::{CalendarQuery, ComparisonQuery, MapQuery, ReportQuery, SummaryQuery};
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// GET /api/v1/summary
pub async fn monthly_summary(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SummaryQuery>,
) -> ApiResult<Json<MonthlySummary>> {
    let today = state.dashboard.current_date();
    let summary = state
        .dashboard
        .monthly_summary(
            &q.building,
            q.year.unwrap_or_else(|| today.year()),
            q.month.unwrap_or_else(|| today.month()),
            q.refresh,
        )
        .await?;
    Ok(Json(summary))
}

/// GET /api/v1/report/daily
pub async fn daily_report(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ReportQuery>,
) -> ApiResult<Json<DailyReport>> {
    let date = q.date.unwrap_or_else(|| state.dashboard.current_date());
    Ok(Json(state.dashboard.daily_report(date, q.refresh).await?))
}

/// GET /api/v1/report/yearly
pub async fn yearly_report(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ReportQuery>,
) -> ApiResult<Json<YearlyReport>> {
    let date = q.date.unwrap_or_else(|| state.dashboard.current_date());
    Ok(Json(
        state
            .dashboard
            .yearly_report(&q.building, date, q.refresh)
            .await?,
    ))
}

/// GET /api/v1/calendar
pub async fn calendar(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CalendarQuery>,
) -> ApiResult<Json<CalendarMonth>> {
    let today = state.dashboard.current_date();
    let view = state
        .dashboard
        .calendar(
            &q.building,
            q.year.unwrap_or_else(|| today.year()),
            q.month.unwrap_or_else(|| today.month()),
        )
        .await?;
    Ok(Json(view))
}

/// GET /api/v1/comparison
pub async fn comparison(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ComparisonQuery>,
) -> ApiResult<Json<PeriodComparison>> {
    let date = q.date.unwrap_or_else(|| state.dashboard.current_date());
    Ok(Json(state.dashboard.comparison(&q.building, date).await?))
}

/// GET /api/v1/map
pub async fn building_map(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MapQuery>,
) -> ApiResult<Json<BuildingMap>> {
    let date = q.date.unwrap_or_else(|| state.dashboard.current_date());
    Ok(Json(state.dashboard.building_map(date).await?))
}
