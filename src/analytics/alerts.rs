//! Anomaly alert helpers
//!
//! Query building for the upstream alert store, plus the summaries shown on
//! the dashboard alert tile.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::types::{offset_days, AnomalyAlert, DetectionMethod, Severity};

/// Default z-score threshold used by the upstream detector
pub const DEFAULT_THRESHOLD: f64 = 3.0;

/// Filters for listing stored alerts
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AlertQuery {
    pub building: Option<String>,
    /// Severities to keep; empty keeps all
    #[serde(default)]
    pub severities: Vec<Severity>,
    pub method: Option<DetectionMethod>,
    pub acknowledged: Option<bool>,
    pub cleared: Option<bool>,
    pub sdt: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl AlertQuery {
    /// Alerts in the `window_days` days up to and including `as_of`
    pub fn recent(as_of: NaiveDate, window_days: i64, method: DetectionMethod) -> Self {
        Self {
            severities: vec![Severity::Warning, Severity::Critical],
            method: Some(method),
            start_date: Some(offset_days(as_of, window_days.saturating_neg())),
            end_date: Some(as_of),
            ..Default::default()
        }
    }

    /// Query-string pairs understood by the upstream alert store.
    ///
    /// The store matches severity exactly, so it is only sent when a single
    /// severity is requested; multi-severity filters are applied by
    /// [`AlertQuery::matches`] after fetching.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(building) = &self.building {
            params.push(("building", building.clone()));
        }
        if let [only] = self.severities.as_slice() {
            params.push(("severity", only.to_string()));
        }
        if let Some(method) = self.method {
            params.push(("method", method.as_param().to_string()));
        }
        if let Some(v) = self.acknowledged {
            params.push(("acknowledged", v.to_string()));
        }
        if let Some(v) = self.cleared {
            params.push(("cleared", v.to_string()));
        }
        if let Some(v) = self.sdt {
            params.push(("sdt", v.to_string()));
        }
        if let Some(d) = self.start_date {
            params.push(("start_date", d.format("%Y-%m-%d").to_string()));
        }
        if let Some(d) = self.end_date {
            params.push(("end_date", d.format("%Y-%m-%d").to_string()));
        }
        params
    }

    /// Check an alert against every filter in the query
    pub fn matches(&self, alert: &AnomalyAlert) -> bool {
        if let Some(building) = &self.building {
            if &alert.building != building {
                return false;
            }
        }
        if !self.severities.is_empty()
            && !alert
                .severity_level()
                .map_or(false, |s| self.severities.contains(&s))
        {
            return false;
        }
        if let Some(method) = self.method {
            if !alert.detection_method.eq_ignore_ascii_case(method.as_param()) {
                return false;
            }
        }
        if self.acknowledged.map_or(false, |v| v != alert.is_acknowledged)
            || self.cleared.map_or(false, |v| v != alert.is_cleared)
            || self.sdt.map_or(false, |v| v != alert.is_sdt)
        {
            return false;
        }
        if self.start_date.map_or(false, |d| alert.date < d)
            || self.end_date.map_or(false, |d| alert.date > d)
        {
            return false;
        }
        true
    }
}

/// Request body for running the upstream detector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzeRequest {
    pub building: String,
    pub year: i32,
    /// 0 analyzes the whole year
    #[serde(default)]
    pub month: u32,
    #[serde(default)]
    pub method: DetectionMethod,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// Result of a detector run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub anomalies: Vec<AnomalyAlert>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub new_count: usize,
    #[serde(default)]
    pub critical: usize,
    #[serde(default)]
    pub error: usize,
    #[serde(default)]
    pub warning: usize,
}

/// Stored alerts plus their statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AlertList {
    #[serde(default)]
    pub alerts: Vec<AnomalyAlert>,
    #[serde(default)]
    pub stats: AlertStats,
}

/// Which status flag an update targets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Acknowledge,
    Clear,
    Sdt,
}

/// Request body for changing an alert's status flag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusUpdate {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: StatusKind,
    #[serde(default = "default_status_value")]
    pub value: bool,
}

fn default_status_value() -> bool {
    true
}

/// Counts over a set of alerts
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertStats {
    pub total: usize,
    pub critical: usize,
    pub error: usize,
    pub warning: usize,
    pub acknowledged: usize,
    pub sdt: usize,
}

impl AlertStats {
    pub fn from_alerts(alerts: &[AnomalyAlert]) -> Self {
        let mut stats = Self {
            total: alerts.len(),
            ..Default::default()
        };
        for alert in alerts {
            match alert.severity_level() {
                Some(Severity::Critical) => stats.critical += 1,
                Some(Severity::Error) => stats.error += 1,
                Some(Severity::Warning) => stats.warning += 1,
                None => {}
            }
            if alert.is_acknowledged {
                stats.acknowledged += 1;
            }
            if alert.is_sdt {
                stats.sdt += 1;
            }
        }
        stats
    }
}

/// The dashboard alert tile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertSummary {
    pub as_of: NaiveDate,
    pub window_days: i64,
    pub total: usize,
    pub critical: usize,
    pub warning: usize,
    /// Newest alerts first
    pub recent: Vec<AnomalyAlert>,
}

impl AlertSummary {
    /// Summarize alerts dated within `[as_of - window_days, as_of]`
    pub fn from_alerts(
        alerts: Vec<AnomalyAlert>,
        as_of: NaiveDate,
        window_days: i64,
        recent_limit: usize,
    ) -> Self {
        let start = offset_days(as_of, window_days.saturating_neg());
        let mut in_window: Vec<AnomalyAlert> = alerts
            .into_iter()
            .filter(|a| a.date >= start && a.date <= as_of)
            .collect();
        in_window.sort_by(|a, b| b.date.cmp(&a.date));

        let critical = in_window
            .iter()
            .filter(|a| a.severity_level() == Some(Severity::Critical))
            .count();
        let warning = in_window
            .iter()
            .filter(|a| a.severity_level() == Some(Severity::Warning))
            .count();
        let total = in_window.len();
        in_window.truncate(recent_limit);

        Self {
            as_of,
            window_days,
            total,
            critical,
            warning,
            recent: in_window,
        }
    }
}

/// Severity for a z-score under the detector's threshold rule
pub fn classify_severity(z_score: f64, threshold: f64) -> Severity {
    if z_score > threshold * 2.0 {
        Severity::Critical
    } else if z_score > threshold * 1.5 {
        Severity::Error
    } else {
        Severity::Warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(id: i64, date: &str, severity: &str) -> AnomalyAlert {
        AnomalyAlert {
            id: Some(id),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            building: "Library".to_string(),
            consumption: 500.0,
            z_score: 3.5,
            severity: severity.to_string(),
            detection_method: "z_score".to_string(),
            is_acknowledged: false,
            is_sdt: false,
            is_cleared: false,
            created_at: None,
        }
    }

    #[test]
    fn test_recent_query_params() {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let query = AlertQuery::recent(as_of, 7, DetectionMethod::ZScore);
        let params = query.to_params();

        assert!(params.contains(&("method", "z_score".to_string())));
        assert!(params.contains(&("start_date", "2024-03-03".to_string())));
        assert!(params.contains(&("end_date", "2024-03-10".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "severity"));
    }

    #[test]
    fn test_single_severity_is_sent() {
        let query = AlertQuery {
            severities: vec![Severity::Critical],
            acknowledged: Some(false),
            ..Default::default()
        };
        let params = query.to_params();
        assert!(params.contains(&("severity", "Critical".to_string())));
        assert!(params.contains(&("acknowledged", "false".to_string())));
    }

    #[test]
    fn test_query_matches() {
        let query = AlertQuery {
            severities: vec![Severity::Warning, Severity::Critical],
            ..Default::default()
        };
        assert!(query.matches(&alert(1, "2024-03-01", "critical")));
        assert!(!query.matches(&alert(2, "2024-03-01", "Error")));

        let dated = AlertQuery {
            start_date: NaiveDate::from_ymd_opt(2024, 3, 2),
            ..Default::default()
        };
        assert!(!dated.matches(&alert(3, "2024-03-01", "Warning")));
    }

    #[test]
    fn test_summary_window_and_order() {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let alerts = vec![
            alert(1, "2024-03-04", "Warning"),
            alert(2, "2024-03-09", "CRITICAL"),
            alert(3, "2024-02-01", "Critical"),
            alert(4, "2024-03-10", "warning"),
            alert(5, "2024-03-08", "Error"),
            alert(6, "2024-03-11", "Critical"),
        ];

        let summary = AlertSummary::from_alerts(alerts, as_of, 7, 3);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.warning, 2);
        let ids: Vec<i64> = summary.recent.iter().filter_map(|a| a.id).collect();
        assert_eq!(ids, vec![4, 2, 5]);
    }

    #[test]
    fn test_summary_empty() {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let summary = AlertSummary::from_alerts(Vec::new(), as_of, 7, 3);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.critical, 0);
        assert!(summary.recent.is_empty());
    }

    #[test]
    fn test_window_at_earliest_date() {
        let query = AlertQuery::recent(NaiveDate::MIN, 7, DetectionMethod::ZScore);
        assert_eq!(query.start_date, Some(NaiveDate::MIN));

        let oldest = AnomalyAlert {
            date: NaiveDate::MIN,
            ..alert(1, "2024-03-01", "Critical")
        };
        let summary = AlertSummary::from_alerts(vec![oldest], NaiveDate::MIN, i64::MAX, 3);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.critical, 1);
    }

    #[test]
    fn test_alert_stats() {
        let mut acked = alert(1, "2024-03-01", "Critical");
        acked.is_acknowledged = true;
        let mut sdt = alert(2, "2024-03-01", "Error");
        sdt.is_sdt = true;
        let stats = AlertStats::from_alerts(&[acked, sdt, alert(3, "2024-03-01", "warning")]);

        assert_eq!(
            stats,
            AlertStats {
                total: 3,
                critical: 1,
                error: 1,
                warning: 1,
                acknowledged: 1,
                sdt: 1,
            }
        );
    }

    #[test]
    fn test_classify_severity() {
        assert_eq!(classify_severity(7.0, 3.0), Severity::Critical);
        assert_eq!(classify_severity(6.0, 3.0), Severity::Error);
        assert_eq!(classify_severity(4.6, 3.0), Severity::Error);
        assert_eq!(classify_severity(4.5, 3.0), Severity::Warning);
    }

    #[test]
    fn test_status_update_wire_format() {
        let update: StatusUpdate = serde_json::from_str(r#"{"id": 7, "type": "sdt"}"#).unwrap();
        assert_eq!(update.kind, StatusKind::Sdt);
        assert!(update.value);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["type"], "sdt");
    }
}
