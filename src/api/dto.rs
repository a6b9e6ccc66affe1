//! Data Transfer Objects
//!
//! Request and response types for the API endpoints that are not already
//! dashboard view types. Serialized to/from JSON or query strings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analytics::{AlertQuery, DetectionMethod, Severity, ALL_BUILDINGS};

fn default_building() -> String {
    ALL_BUILDINGS.to_string()
}

// ============================================
// BUILDING DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct BuildingListResponse {
    pub buildings: Vec<String>,
    pub total: usize,
}

// ============================================
// REPORT DTOs
// ============================================

/// GET /summary query string
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default = "default_building")]
    pub building: String,
    /// Defaults to the dashboard date's year
    pub year: Option<i32>,
    /// Defaults to the dashboard date's month
    pub month: Option<u32>,
    #[serde(default)]
    pub refresh: bool,
}

/// GET /report/daily and /report/yearly query string
#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(default = "default_building")]
    pub building: String,
    /// Defaults to the dashboard date
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub refresh: bool,
}

/// GET /calendar query string
#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    #[serde(default = "default_building")]
    pub building: String,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// GET /map query string
#[derive(Debug, Deserialize)]
pub struct MapQuery {
    /// Defaults to the dashboard date
    pub date: Option<NaiveDate>,
}

/// GET /comparison query string
#[derive(Debug, Deserialize)]
pub struct ComparisonQuery {
    pub building: String,
    pub date: Option<NaiveDate>,
}

// ============================================
// ALERT DTOs
// ============================================

/// GET /alerts query string
///
/// Without filters this returns the summary tile for the dashboard date.
/// `severity` takes a comma-separated list.
#[derive(Debug, Default, Deserialize)]
pub struct AlertsQuery {
    pub building: Option<String>,
    pub severity: Option<String>,
    pub method: Option<String>,
    pub acknowledged: Option<bool>,
    pub cleared: Option<bool>,
    pub sdt: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Summarize the recent window ending on this date
    pub as_of: Option<NaiveDate>,
}

impl AlertsQuery {
    /// Whether any list filter was given
    pub fn is_filtered(&self) -> bool {
        self.building.is_some()
            || self.severity.is_some()
            || self.method.is_some()
            || self.acknowledged.is_some()
            || self.cleared.is_some()
            || self.sdt.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
    }

    /// Convert into an alert store query
    pub fn to_query(&self) -> Result<AlertQuery, String> {
        let severities = match &self.severity {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Severity::parse(s).ok_or_else(|| format!("unknown severity: {}", s)))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        let method = self
            .method
            .as_deref()
            .map(str::parse::<DetectionMethod>)
            .transpose()?;

        Ok(AlertQuery {
            building: self.building.clone(),
            severities,
            method,
            acknowledged: self.acknowledged,
            cleared: self.cleared,
            sdt: self.sdt,
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}

// ============================================
// DATE DTOs
// ============================================

#[derive(Debug, Serialize, Deserialize)]
pub struct DateBody {
    pub date: NaiveDate,
}

// ============================================
// UPLOAD DTOs
// ============================================

/// Result of validating an uploaded meter file
#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub file_name: String,
    pub building: Option<String>,
    pub month: String,
    pub days: usize,
    pub total: f64,
}

#[derive(Debug, Serialize)]
pub struct UploadSummary {
    pub message: String,
    pub files: Vec<UploadedFile>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "degraded"
    pub status: String,
    /// Upstream energy API status
    pub upstream: String,
    /// Report cache status
    pub cache: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Service version
    pub version: String,
    /// Dashboard date
    pub date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alerts_query_parses_severities() {
        let q = AlertsQuery {
            severity: Some("warning, Critical".to_string()),
            method: Some("LOF".to_string()),
            ..Default::default()
        };
        let query = q.to_query().unwrap();
        assert_eq!(query.severities, vec![Severity::Warning, Severity::Critical]);
        assert_eq!(query.method, Some(DetectionMethod::Lof));
        assert!(q.is_filtered());
    }

    #[test]
    fn test_alerts_query_rejects_unknown() {
        let q = AlertsQuery {
            severity: Some("meh".to_string()),
            ..Default::default()
        };
        assert!(q.to_query().is_err());
        assert!(!AlertsQuery::default().is_filtered());
    }
}
