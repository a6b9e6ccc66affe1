//! Core data types for building energy data
//!
//! These mirror the records exchanged with the upstream energy API:
//! - `DailyReading`: one day of consumption for one building
//! - `PeriodStats`: summary statistics for a building over a month or year
//! - `AvailableData`: which building/year/month combinations exist
//! - `AnomalyAlert`: a reading flagged by the upstream detector

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Pseudo-building that selects the fleet-wide aggregate
pub const ALL_BUILDINGS: &str = "All Buildings";

/// Building -> year -> available months
pub type AvailableData = BTreeMap<String, BTreeMap<String, Vec<u32>>>;

/// A single day of electricity consumption for one building
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DailyReading {
    /// Calendar day of the reading
    #[serde(deserialize_with = "flexible_date")]
    pub date: NaiveDate,
    /// Energy used that day in kWh
    #[serde(default)]
    pub consumption: f64,
}

impl DailyReading {
    pub fn new(date: NaiveDate, consumption: f64) -> Self {
        Self { date, consumption }
    }

    /// Day of month (1-based)
    pub fn day(&self) -> u32 {
        self.date.day()
    }
}

/// Consumption for a single requested day
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DayConsumption {
    #[serde(default)]
    pub consumption: f64,
}

/// Monthly total inside a yearly statistics response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyReading {
    /// Month label as reported upstream (name or number)
    #[serde(deserialize_with = "string_or_number")]
    pub month: String,
    #[serde(default)]
    pub consumption: f64,
}

/// Summary statistics for a building over a period
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PeriodStats {
    #[serde(default)]
    pub mean: f64,
    #[serde(default)]
    pub highest: f64,
    #[serde(default)]
    pub lowest: f64,
    #[serde(default)]
    pub median: f64,
    /// Per-entry monthly data (yearly statistics only)
    #[serde(default, rename = "monthlyData", alias = "monthly_data")]
    pub monthly_data: Vec<MonthlyReading>,
}

/// Severity assigned by the upstream anomaly detector
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Parse a severity label, ignoring case
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warning" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    /// Lowercase label used in query parameters
    pub fn as_param(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "Warning"),
            Severity::Error => write!(f, "Error"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

/// Upstream anomaly detection algorithm
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DetectionMethod {
    #[default]
    #[serde(rename = "z_score")]
    ZScore,
    #[serde(rename = "LOF")]
    Lof,
    #[serde(rename = "iqr")]
    Iqr,
    #[serde(rename = "rolling_mean")]
    RollingMean,
}

impl DetectionMethod {
    pub fn as_param(&self) -> &'static str {
        match self {
            DetectionMethod::ZScore => "z_score",
            DetectionMethod::Lof => "LOF",
            DetectionMethod::Iqr => "iqr",
            DetectionMethod::RollingMean => "rolling_mean",
        }
    }
}

impl std::str::FromStr for DetectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "z_score" | "zscore" | "z-score" => Ok(DetectionMethod::ZScore),
            "lof" => Ok(DetectionMethod::Lof),
            "iqr" => Ok(DetectionMethod::Iqr),
            "rolling_mean" | "rolling-mean" => Ok(DetectionMethod::RollingMean),
            other => Err(format!("unknown detection method: {}", other)),
        }
    }
}

/// A stored anomaly alert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnomalyAlert {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(deserialize_with = "flexible_date")]
    pub date: NaiveDate,
    pub building: String,
    #[serde(default)]
    pub consumption: f64,
    #[serde(default)]
    pub z_score: f64,
    /// Raw severity label; compare with [`AnomalyAlert::severity_level`]
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub detection_method: String,
    #[serde(default)]
    pub is_acknowledged: bool,
    #[serde(default)]
    pub is_sdt: bool,
    #[serde(default)]
    pub is_cleared: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl AnomalyAlert {
    pub fn severity_level(&self) -> Option<Severity> {
        Severity::parse(&self.severity)
    }
}

/// Parse a date from `YYYY-MM-DD`, RFC 3339, or a naive ISO datetime
pub fn parse_flexible_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%a, %d %b %Y %H:%M:%S GMT"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

fn flexible_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flexible_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw)))
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected month label, got {}",
            other
        ))),
    }
}

/// Number of days in the given month
///
/// Falls back to 31 when the month lies outside the representable range;
/// callers build dates with `from_ymd_opt`, which drops the excess days.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        year.checked_add(1).map(|y| (y, 1))
    } else {
        Some((year, month + 1))
    };
    next.and_then(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1))
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(31)
}

/// `date` moved by `days`, saturating at the representable range
pub fn offset_days(date: NaiveDate, days: i64) -> NaiveDate {
    let step = Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(step).unwrap_or(NaiveDate::MAX)
    } else {
        date.checked_sub_days(step).unwrap_or(NaiveDate::MIN)
    }
}

/// Short English month name ("Jan" .. "Dec")
pub fn short_month_name(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    NAMES.get(month.wrapping_sub(1) as usize).copied().unwrap_or("???")
}

/// Full English month name ("January" .. "December")
pub fn month_name(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    NAMES.get(month.wrapping_sub(1) as usize).copied().unwrap_or("Unknown")
}
