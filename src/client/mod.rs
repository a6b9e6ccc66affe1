//! Energy API client
//!
//! Access to the upstream energy REST API that owns readings, statistics,
//! anomaly detection, prediction, and email delivery:
//! - `EnergySource`: the trait the dashboard depends on
//! - `EnergyApiClient`: the HTTP implementation

mod http;
mod types;

pub use http::{EnergyApiClient, EnergyApiConfig};
pub use types::{
    Notification, PredictDataset, PredictRequest, Prediction, PredictionPoint, UploadFile,
    UploadResponse, UploadedMonths,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::analytics::{
    AlertList, AlertQuery, AnalyzeRequest, AnalyzeResponse, AvailableData, DailyReading,
    PeriodStats, StatusUpdate,
};

/// A source of building energy data
#[async_trait]
pub trait EnergySource: Send + Sync {
    /// Buildings with the years and months they have data for
    async fn available_data(&self) -> Result<AvailableData, EnergyApiError>;

    /// Daily readings of one building for a month
    async fn month_readings(
        &self,
        building: &str,
        year: i32,
        month: u32,
    ) -> Result<Vec<DailyReading>, EnergyApiError>;

    /// Consumption of one building on a single day
    async fn day_consumption(&self, building: &str, date: NaiveDate) -> Result<f64, EnergyApiError>;

    /// Statistics of one building for a month
    async fn month_stats(
        &self,
        building: &str,
        year: i32,
        month: u32,
    ) -> Result<PeriodStats, EnergyApiError>;

    /// Statistics of one building for a whole year, with monthly totals
    async fn year_stats(&self, building: &str, year: i32) -> Result<PeriodStats, EnergyApiError>;

    /// Submit meter CSV files for ingestion
    async fn upload(&self, files: Vec<UploadFile>) -> Result<UploadResponse, EnergyApiError>;

    /// Run anomaly detection and store the results upstream
    async fn analyze_anomalies(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<AnalyzeResponse, EnergyApiError>;

    /// List stored anomalies
    async fn list_anomalies(&self, query: &AlertQuery) -> Result<AlertList, EnergyApiError>;

    /// Acknowledge, clear, or schedule downtime for an alert
    async fn update_anomaly_status(&self, update: &StatusUpdate) -> Result<(), EnergyApiError>;

    /// Forecast future consumption from historical series
    async fn predict(&self, request: &PredictRequest) -> Result<Prediction, EnergyApiError>;

    /// Send an email notification
    async fn notify(&self, notification: &Notification) -> Result<(), EnergyApiError>;
}

/// Errors that can occur when talking to the energy API
#[derive(Error, Debug)]
pub enum EnergyApiError {
    #[error("Energy API unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl EnergyApiError {
    /// Whether the failure is transient and worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EnergyApiError::Unavailable | EnergyApiError::Timeout | EnergyApiError::RateLimited
        )
    }
}
