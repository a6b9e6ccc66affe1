//! Dashboard Service
//!
//! Composes the energy source, report cache, date context, and fetch guard
//! into the views the API and CLI serve. All arithmetic lives in
//! [`crate::analytics`]; this layer only fetches, caches, and degrades.
//!
//! Failures fetching one building's data inside an aggregate view degrade
//! to zeroed figures for that building. Failures listing buildings or
//! alerts propagate.

#[cfg(test)]
pub(crate) mod testing;

use chrono::{Datelike, NaiveDate, Utc};
use futures_util::future::join_all;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

use crate::analytics::{
    calendar::shift_month, day_indexed_average, dataset_stats, AlertList, AlertQuery,
    AlertStats, AlertSummary, AnalyzeRequest, AnalyzeResponse, AvailableData, BuildingDay,
    BuildingMap, BuildingMonth, BuildingYear, CalendarMonth, DailyReading, DailyReport, Dataset,
    DetectionMethod, MonthlySummary, PeriodComparison, SeriesStats, StatusUpdate, YearlyReport,
    ALL_BUILDINGS,
};
use crate::cache::{CacheError, CacheKey, ReportCache, Retention};
use crate::client::{
    EnergyApiError, EnergySource, Notification, PredictDataset, PredictRequest, Prediction,
    UploadFile, UploadResponse,
};
use crate::config::Config;
use crate::context::DateContext;
use crate::fetch_guard::LatestOnly;
use crate::ingest::{ImportError, MeterCsv};

/// Most files accepted by one upload
pub const MAX_UPLOAD_FILES: usize = 2;

/// Errors surfaced by dashboard operations
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Upstream error: {0}")]
    Upstream(#[from] EnergyApiError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Invalid request: {0}")]
    Invalid(String),
}

/// Tunables taken from configuration
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub cost_per_kwh: f64,
    pub co2_lb_per_kwh: f64,
    pub alert_window_days: i64,
    pub alert_recent_limit: usize,
    pub alert_method: DetectionMethod,
    pub retention: Retention,
    pub default_recipients: Vec<String>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl DashboardSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cost_per_kwh: config.pricing.cost_per_kwh,
            co2_lb_per_kwh: config.pricing.co2_lb_per_kwh,
            alert_window_days: config.alerts.window_days,
            alert_recent_limit: config.alerts.recent_limit,
            alert_method: config.alerts.method,
            retention: config.cache.retention(),
            default_recipients: config.notifications.recipients.clone(),
        }
    }
}

// ============================================
// Graph views
// ============================================

/// One series requested for the comparison graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesRef {
    pub building: String,
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphRequest {
    pub series: Vec<SeriesRef>,
    #[serde(default)]
    pub with_average: bool,
}

/// Datasets for the comparison graph plus their statistics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphView {
    pub datasets: Vec<Dataset>,
    pub average: Option<Dataset>,
    /// Statistics per dataset label
    pub stats: BTreeMap<String, SeriesStats>,
}

// ============================================
// Service
// ============================================

/// The dashboard backend
pub struct DashboardService {
    source: Arc<dyn EnergySource>,
    cache: Arc<ReportCache>,
    context: DateContext,
    guard: LatestOnly,
    settings: DashboardSettings,
}

impl DashboardService {
    pub fn new(
        source: Arc<dyn EnergySource>,
        cache: Arc<ReportCache>,
        context: DateContext,
        settings: DashboardSettings,
    ) -> Self {
        Self {
            source,
            cache,
            context,
            guard: LatestOnly::new(),
            settings,
        }
    }

    pub fn context(&self) -> &DateContext {
        &self.context
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    /// The dashboard's selected date
    pub fn current_date(&self) -> NaiveDate {
        self.context.current()
    }

    pub fn set_date(&self, date: NaiveDate) -> Result<(), DashboardError> {
        Ok(self.context.set(date)?)
    }

    /// Drop cached views past their retention
    pub fn purge_expired(&self) -> Result<usize, DashboardError> {
        let today = Utc::now().date_naive();
        Ok(self.cache.apply_retention(today, self.settings.retention)?)
    }

    /// Whether the report cache can be queried
    pub fn cache_ready(&self) -> bool {
        self.cache.len().is_ok()
    }

    /// Whether the upstream answers at all
    pub async fn upstream_ready(&self) -> bool {
        self.source.available_data().await.is_ok()
    }

    pub async fn available_data(&self) -> Result<AvailableData, DashboardError> {
        Ok(self.source.available_data().await?)
    }

    /// Sorted building names, excluding the fleet pseudo-building
    pub async fn buildings(&self) -> Result<Vec<String>, DashboardError> {
        let data = self.source.available_data().await?;
        Ok(data
            .into_keys()
            .filter(|b| b != ALL_BUILDINGS)
            .collect())
    }

    // ----- monthly summary -----

    /// Month summary for a building or, with `All Buildings`, the fleet
    pub async fn monthly_summary(
        &self,
        building: &str,
        year: i32,
        month: u32,
        refresh: bool,
    ) -> Result<MonthlySummary, DashboardError> {
        validate_period(year, month)?;
        let key = CacheKey::summary(year, month, building);
        let fleet = building == ALL_BUILDINGS;
        let buildings = if fleet { self.buildings().await? } else { Vec::new() };

        if refresh {
            self.cache.remove(&key.key)?;
        } else if let Some(cached) = self.cached::<MonthlySummary>(&key) {
            if !fleet || cached.covers(&buildings) {
                return Ok(cached);
            }
            tracing::debug!(key = %key.key, "Cached fleet summary is missing buildings");
        }

        let ticket = self.guard.issue(&key.key);
        let summary = if fleet {
            let months = join_all(buildings.iter().map(|b| async move {
                (b.clone(), self.building_month(b, year, month).await)
            }))
            .await;
            MonthlySummary::for_fleet(year, month, months.into_iter().collect())
        } else {
            let data = self.building_month(building, year, month).await;
            MonthlySummary::for_building(building, year, month, data)
        };

        ticket.commit_with(|| self.store(&key, &summary));
        Ok(summary)
    }

    async fn building_month(&self, building: &str, year: i32, month: u32) -> BuildingMonth {
        let (current, previous) = tokio::join!(
            self.source.month_readings(building, year, month),
            self.previous_month_readings(building, year, month),
        );

        let current = match current {
            Ok(readings) => readings,
            Err(e) => {
                tracing::warn!(building = %building, year, month, error = %e, "Month data unavailable");
                return BuildingMonth::default();
            }
        };
        let previous = previous.unwrap_or_else(|e| {
            tracing::debug!(building = %building, error = %e, "Previous month unavailable");
            Vec::new()
        });

        BuildingMonth::compute(&current, &previous, self.settings.cost_per_kwh)
    }

    /// Readings for the month before `year`/`month`; empty before the first year
    async fn previous_month_readings(
        &self,
        building: &str,
        year: i32,
        month: u32,
    ) -> Result<Vec<DailyReading>, EnergyApiError> {
        match shift_month(year, month, -1) {
            Some((prev_year, prev_month)) => {
                self.source.month_readings(building, prev_year, prev_month).await
            }
            None => Ok(Vec::new()),
        }
    }

    // ----- daily / yearly reports -----

    /// Today's consumption across all buildings against their daily means
    pub async fn daily_report(
        &self,
        date: NaiveDate,
        refresh: bool,
    ) -> Result<DailyReport, DashboardError> {
        let key = CacheKey::report_widget(date);
        let buildings = self.buildings().await?;

        if refresh {
            self.cache.remove(&key.key)?;
        } else if let Some(cached) = self.cached::<DailyReport>(&key) {
            if covers(cached.buildings.keys(), &buildings) {
                return Ok(cached);
            }
        }

        let ticket = self.guard.issue(&key.key);
        let days = join_all(buildings.iter().map(|b| async move {
            (b.clone(), self.building_day(b, date).await)
        }))
        .await;
        let report = DailyReport::new(date, days.into_iter().collect(), self.settings.co2_lb_per_kwh);

        ticket.commit_with(|| self.store(&key, &report));
        Ok(report)
    }

    async fn building_day(&self, building: &str, date: NaiveDate) -> BuildingDay {
        let (today, stats) = tokio::join!(
            self.source.day_consumption(building, date),
            self.source.year_stats(building, date.year()),
        );
        match (today, stats) {
            (Ok(today_consumption), Ok(stats)) => BuildingDay {
                today_consumption,
                daily_average: stats.mean,
            },
            (today, stats) => {
                let error = today.err().or(stats.err()).map(|e| e.to_string());
                tracing::warn!(building = %building, date = %date, error = ?error, "Daily data unavailable");
                BuildingDay::default()
            }
        }
    }

    /// Yearly report for a building or the fleet, anchored on `date`
    pub async fn yearly_report(
        &self,
        building: &str,
        date: NaiveDate,
        refresh: bool,
    ) -> Result<YearlyReport, DashboardError> {
        let key = CacheKey::report(date, building);
        let fleet = building == ALL_BUILDINGS;
        let buildings = if fleet { self.buildings().await? } else { Vec::new() };

        if refresh {
            self.cache.remove(&key.key)?;
        } else if let Some(cached) = self.cached::<YearlyReport>(&key) {
            if !fleet || covers(cached.buildings.keys(), &buildings) {
                return Ok(cached);
            }
        }

        let ticket = self.guard.issue(&key.key);
        let report = if fleet {
            let years = join_all(buildings.iter().map(|b| async move {
                (b.clone(), self.building_year(b, date).await)
            }))
            .await;
            YearlyReport::for_fleet(date, years.into_iter().collect())
        } else {
            YearlyReport::for_building(building, date, self.building_year(building, date).await)
        };

        ticket.commit_with(|| self.store(&key, &report));
        Ok(report)
    }

    async fn building_year(&self, building: &str, date: NaiveDate) -> BuildingYear {
        let (today, month, stats) = tokio::join!(
            self.source.day_consumption(building, date),
            self.source.month_readings(building, date.year(), date.month()),
            self.source.year_stats(building, date.year()),
        );
        match stats {
            Ok(stats) => BuildingYear::compute(
                today.unwrap_or_default(),
                &month.unwrap_or_default(),
                &stats,
            ),
            Err(e) => {
                tracing::warn!(building = %building, year = date.year(), error = %e, "Yearly stats unavailable");
                BuildingYear::default()
            }
        }
    }

    // ----- calendar / graph / comparison -----

    /// Calendar heatmap for a building, or summed across the fleet
    pub async fn calendar(
        &self,
        building: &str,
        year: i32,
        month: u32,
    ) -> Result<CalendarMonth, DashboardError> {
        validate_period(year, month)?;
        let readings = if building == ALL_BUILDINGS {
            let buildings = self.buildings().await?;
            let all = join_all(
                buildings
                    .iter()
                    .map(|b| self.readings_or_empty(b, year, month)),
            )
            .await;
            sum_by_date(all.iter().flatten())
        } else {
            self.readings_or_empty(building, year, month).await
        };

        Ok(CalendarMonth::build(
            building,
            year,
            month,
            &readings,
            self.settings.cost_per_kwh,
        ))
    }

    async fn readings_or_empty(&self, building: &str, year: i32, month: u32) -> Vec<DailyReading> {
        self.source
            .month_readings(building, year, month)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(building = %building, year, month, error = %e, "Month data unavailable");
                Vec::new()
            })
    }

    /// Datasets for the comparison graph, optionally with their average line
    pub async fn graph(&self, request: &GraphRequest) -> Result<GraphView, DashboardError> {
        if request.series.is_empty() {
            return Err(DashboardError::Invalid("no series requested".to_string()));
        }
        for series in &request.series {
            validate_period(series.year, series.month)?;
        }

        let fetched = join_all(request.series.iter().map(|s| async move {
            self.source
                .month_readings(&s.building, s.year, s.month)
                .await
                .map(|readings| Dataset::new(s.building.clone(), s.year, s.month, readings))
        }))
        .await;
        let mut datasets = fetched.into_iter().collect::<Result<Vec<_>, _>>()?;
        dedupe_labels(&mut datasets);

        let average = if request.with_average {
            day_indexed_average(&datasets)
        } else {
            None
        };

        let stats = datasets
            .iter()
            .chain(average.iter())
            .map(|d| (d.label.clone(), dataset_stats(d)))
            .collect();

        Ok(GraphView {
            datasets,
            average,
            stats,
        })
    }

    /// Every building's consumption on `date` against its monthly statistics
    pub async fn building_map(&self, date: NaiveDate) -> Result<BuildingMap, DashboardError> {
        let buildings = self.buildings().await?;
        let days = join_all(buildings.iter().map(|b| async move {
            let (today, stats) = tokio::join!(
                self.source.day_consumption(b, date),
                self.source.month_stats(b, date.year(), date.month()),
            );
            let day = match (today, stats) {
                (Ok(today), Ok(stats)) => Some((today, stats)),
                (today, stats) => {
                    let error = today.err().or(stats.err()).map(|e| e.to_string());
                    tracing::warn!(building = %b, date = %date, error = ?error, "Map data unavailable");
                    None
                }
            };
            (b.clone(), day)
        }))
        .await;
        Ok(BuildingMap::build(date, days.into_iter().collect()))
    }

    /// Compare `date` with the previous day, week, and month
    pub async fn comparison(
        &self,
        building: &str,
        date: NaiveDate,
    ) -> Result<PeriodComparison, DashboardError> {
        let (current, previous) = tokio::join!(
            self.source.month_readings(building, date.year(), date.month()),
            self.previous_month_readings(building, date.year(), date.month()),
        );

        let mut readings = previous.unwrap_or_default();
        readings.extend(current?);
        Ok(PeriodComparison::for_day(&readings, date))
    }

    // ----- alerts -----

    /// The alert tile for the window ending on `as_of`
    pub async fn alert_summary(&self, as_of: NaiveDate) -> Result<AlertSummary, DashboardError> {
        let query = AlertQuery::recent(as_of, self.settings.alert_window_days, self.settings.alert_method);
        let list = self.source.list_anomalies(&query).await?;
        Ok(AlertSummary::from_alerts(
            list.alerts,
            as_of,
            self.settings.alert_window_days,
            self.settings.alert_recent_limit,
        ))
    }

    /// Stored alerts matching `query`, with statistics over what matched
    pub async fn alerts(&self, query: &AlertQuery) -> Result<AlertList, DashboardError> {
        let mut list = self.source.list_anomalies(query).await?;
        list.alerts.retain(|a| query.matches(a));
        list.stats = AlertStats::from_alerts(&list.alerts);
        Ok(list)
    }

    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, DashboardError> {
        if request.building.trim().is_empty() {
            return Err(DashboardError::Invalid("building is required".to_string()));
        }
        if request.month > 12 {
            return Err(DashboardError::Invalid(format!("invalid month: {}", request.month)));
        }
        if request.threshold.is_nan() || request.threshold <= 0.0 {
            return Err(DashboardError::Invalid("threshold must be positive".to_string()));
        }
        let response = self.source.analyze_anomalies(request).await?;
        tracing::info!(
            building = %request.building,
            method = request.method.as_param(),
            found = response.count,
            "Anomaly analysis finished"
        );
        Ok(response)
    }

    pub async fn update_alert(&self, update: &StatusUpdate) -> Result<(), DashboardError> {
        Ok(self.source.update_anomaly_status(update).await?)
    }

    // ----- upload / predict / notify -----

    /// Validate meter files locally without sending them
    pub fn validate_upload(&self, files: &[UploadFile]) -> Result<Vec<MeterCsv>, DashboardError> {
        if files.is_empty() {
            return Err(DashboardError::Invalid("no files uploaded".to_string()));
        }
        if files.len() > MAX_UPLOAD_FILES {
            return Err(DashboardError::Invalid(format!(
                "at most {} files per upload",
                MAX_UPLOAD_FILES
            )));
        }
        files
            .iter()
            .map(|f| MeterCsv::parse(f.contents.as_slice()).map_err(DashboardError::from))
            .collect()
    }

    /// Validate and submit meter files, then drop summaries they invalidate.
    ///
    /// Returns the upstream response with the parsed files, in upload order.
    pub async fn upload(
        &self,
        files: Vec<UploadFile>,
    ) -> Result<(UploadResponse, Vec<MeterCsv>), DashboardError> {
        let parsed = self.validate_upload(&files)?;
        let response = self.source.upload(files).await?;

        for meter in &parsed {
            let Some(first) = meter.readings.first() else {
                continue;
            };
            let (year, month) = (first.date.year(), first.date.month());
            if let Some(building) = &meter.building {
                self.cache.remove(&CacheKey::summary(year, month, building).key)?;
            }
            self.cache.remove(&CacheKey::summary(year, month, ALL_BUILDINGS).key)?;
        }
        Ok((response, parsed))
    }

    pub async fn predict(&self, datasets: &[Dataset]) -> Result<Prediction, DashboardError> {
        if datasets.is_empty() {
            return Err(DashboardError::Invalid(
                "no data available for prediction".to_string(),
            ));
        }
        let request = PredictRequest {
            datasets: datasets.iter().map(PredictDataset::from).collect(),
        };
        Ok(self.source.predict(&request).await?)
    }

    /// Send a notification, using the configured recipients if it has none
    pub async fn notify(&self, mut notification: Notification) -> Result<(), DashboardError> {
        if notification.recipients().is_empty() {
            let defaults = self.settings.default_recipients.clone();
            match &mut notification {
                Notification::Daily { recipients, .. } | Notification::Alert { recipients, .. } => {
                    *recipients = defaults;
                }
            }
        }
        if notification.recipients().is_empty() {
            return Err(DashboardError::Invalid("no recipients".to_string()));
        }
        self.source.notify(&notification).await?;
        Ok(())
    }

    // ----- cache helpers -----

    fn cached<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.cache.get(&key.key).unwrap_or_else(|e| {
            tracing::warn!(key = %key.key, error = %e, "Cache read failed");
            None
        })
    }

    fn store<T: Serialize>(&self, key: &CacheKey, value: &T) {
        if let Err(e) = self.cache.put(key, value) {
            tracing::warn!(key = %key.key, error = %e, "Cache write failed");
        }
    }
}

/// Reject months outside 1..=12 and years no calendar date can carry
fn validate_period(year: i32, month: u32) -> Result<(), DashboardError> {
    if !(1..=12).contains(&month) {
        return Err(DashboardError::Invalid(format!("invalid month: {}", month)));
    }
    if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
        return Err(DashboardError::Invalid(format!("year out of range: {}", year)));
    }
    Ok(())
}

/// Suffix repeated dataset labels with their occurrence number
fn dedupe_labels(datasets: &mut [Dataset]) {
    let mut seen: HashSet<String> = HashSet::new();
    for dataset in datasets.iter_mut() {
        let mut label = dataset.label.clone();
        let mut occurrence = 1;
        while !seen.insert(label.clone()) {
            occurrence += 1;
            label = format!("{} ({})", dataset.label, occurrence);
        }
        dataset.label = label;
    }
}

/// Whether `present` contains every one of `buildings`
fn covers<'a>(present: impl Iterator<Item = &'a String>, buildings: &[String]) -> bool {
    let present: Vec<&String> = present.collect();
    buildings.iter().all(|b| present.contains(&b))
}

/// Sum readings that share a date
fn sum_by_date<'a>(readings: impl Iterator<Item = &'a DailyReading>) -> Vec<DailyReading> {
    let mut totals: HashMap<NaiveDate, f64> = HashMap::new();
    for reading in readings {
        *totals.entry(reading.date).or_insert(0.0) += reading.consumption;
    }
    let mut combined: Vec<DailyReading> = totals
        .into_iter()
        .map(|(date, consumption)| DailyReading::new(date, consumption))
        .collect();
    combined.sort_by_key(|r| r.date);
    combined
}
