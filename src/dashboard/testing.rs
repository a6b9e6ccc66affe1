//! In-memory energy source for tests

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::analytics::{
    AlertList, AlertQuery, AlertStats, AnalyzeRequest, AnalyzeResponse, AnomalyAlert,
    AvailableData, DailyReading, PeriodStats, StatusUpdate,
};
use crate::client::{
    EnergyApiError, EnergySource, Notification, PredictRequest, Prediction, PredictionPoint,
    UploadFile, UploadResponse, UploadedMonths,
};

/// Canned upstream data
#[derive(Default)]
pub struct FakeSource {
    pub readings: HashMap<(String, i32, u32), Vec<DailyReading>>,
    pub year_stats: HashMap<(String, i32), PeriodStats>,
    pub month_stats: HashMap<(String, i32, u32), PeriodStats>,
    pub alerts: Vec<AnomalyAlert>,
    /// Buildings whose data requests fail
    pub failing: HashSet<String>,
    pub calls: AtomicUsize,
    pub notifications: Mutex<Vec<Notification>>,
    pub uploads: AtomicUsize,
    /// The first `month_readings` call waits this long and returns these readings
    pub slow_first: Option<(Duration, Vec<f64>)>,
    slow_taken: AtomicBool,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a month of readings starting on day 1
    pub fn with_month(mut self, building: &str, year: i32, month: u32, values: &[f64]) -> Self {
        self.readings
            .insert((building.to_string(), year, month), month_of(year, month, values));
        self
    }

    pub fn with_year_stats(mut self, building: &str, year: i32, stats: PeriodStats) -> Self {
        self.year_stats.insert((building.to_string(), year), stats);
        self
    }

    pub fn with_month_stats(mut self, building: &str, year: i32, month: u32, stats: PeriodStats) -> Self {
        self.month_stats.insert((building.to_string(), year, month), stats);
        self
    }

    /// Make the first month fetch slow and return `values` instead of the canned month
    pub fn slow_first_fetch(mut self, delay: Duration, values: &[f64]) -> Self {
        self.slow_first = Some((delay, values.to_vec()));
        self
    }

    pub fn with_alert(mut self, alert: AnomalyAlert) -> Self {
        self.alerts.push(alert);
        self
    }

    pub fn failing(mut self, building: &str) -> Self {
        self.failing.insert(building.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, building: &str) -> Result<(), EnergyApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(building) {
            Err(EnergyApiError::Unavailable)
        } else {
            Ok(())
        }
    }
}

/// Readings for consecutive days starting on day 1
fn month_of(year: i32, month: u32, values: &[f64]) -> Vec<DailyReading> {
    values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| {
            NaiveDate::from_ymd_opt(year, month, i as u32 + 1).map(|d| DailyReading::new(d, *v))
        })
        .collect()
}

#[async_trait]
impl EnergySource for FakeSource {
    async fn available_data(&self) -> Result<AvailableData, EnergyApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut data: AvailableData = BTreeMap::new();
        for (building, year, month) in self.readings.keys() {
            data.entry(building.clone())
                .or_default()
                .entry(year.to_string())
                .or_default()
                .push(*month);
        }
        for building in &self.failing {
            data.entry(building.clone()).or_default();
        }
        Ok(data)
    }

    async fn month_readings(
        &self,
        building: &str,
        year: i32,
        month: u32,
    ) -> Result<Vec<DailyReading>, EnergyApiError> {
        self.check(building)?;
        if let Some((delay, values)) = &self.slow_first {
            if !self.slow_taken.swap(true, Ordering::SeqCst) {
                tokio::time::sleep(*delay).await;
                return Ok(month_of(year, month, values));
            }
        }
        self.readings
            .get(&(building.to_string(), year, month))
            .cloned()
            .ok_or_else(|| EnergyApiError::NotFound(format!("{} {}-{}", building, year, month)))
    }

    async fn day_consumption(&self, building: &str, date: NaiveDate) -> Result<f64, EnergyApiError> {
        self.check(building)?;
        Ok(self
            .readings
            .get(&(building.to_string(), date.year(), date.month()))
            .and_then(|rs| rs.iter().find(|r| r.date == date))
            .map(|r| r.consumption)
            .unwrap_or(0.0))
    }

    async fn month_stats(
        &self,
        building: &str,
        year: i32,
        month: u32,
    ) -> Result<PeriodStats, EnergyApiError> {
        self.check(building)?;
        Ok(self
            .month_stats
            .get(&(building.to_string(), year, month))
            .cloned()
            .unwrap_or_default())
    }

    async fn year_stats(&self, building: &str, year: i32) -> Result<PeriodStats, EnergyApiError> {
        self.check(building)?;
        Ok(self
            .year_stats
            .get(&(building.to_string(), year))
            .cloned()
            .unwrap_or_default())
    }

    async fn upload(&self, files: Vec<UploadFile>) -> Result<UploadResponse, EnergyApiError> {
        self.uploads.fetch_add(files.len(), Ordering::SeqCst);
        Ok(UploadResponse {
            message: "Files uploaded successfully".to_string(),
            data: UploadedMonths::default(),
        })
    }

    async fn analyze_anomalies(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<AnalyzeResponse, EnergyApiError> {
        self.check(&request.building)?;
        Ok(AnalyzeResponse::default())
    }

    async fn list_anomalies(&self, query: &AlertQuery) -> Result<AlertList, EnergyApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let alerts: Vec<AnomalyAlert> =
            self.alerts.iter().filter(|a| query.matches(a)).cloned().collect();
        Ok(AlertList {
            stats: AlertStats::from_alerts(&alerts),
            alerts,
        })
    }

    async fn update_anomaly_status(&self, update: &StatusUpdate) -> Result<(), EnergyApiError> {
        if self.alerts.iter().any(|a| a.id == Some(update.id)) {
            Ok(())
        } else {
            Err(EnergyApiError::NotFound("Alert not found".to_string()))
        }
    }

    async fn predict(&self, request: &PredictRequest) -> Result<Prediction, EnergyApiError> {
        Ok(Prediction {
            predictions: request
                .datasets
                .iter()
                .map(|d| PredictionPoint {
                    ds: format!("{}-{:02}", d.year, d.month),
                    value: d.data.iter().map(|r| r.consumption).sum(),
                })
                .collect(),
            evaluation: serde_json::Value::Null,
        })
    }

    async fn notify(&self, notification: &Notification) -> Result<(), EnergyApiError> {
        if let Ok(mut sent) = self.notifications.lock() {
            sent.push(notification.clone());
        }
        Ok(())
    }
}
