//! Request/response bodies specific to the energy API

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analytics::{AnomalyAlert, DailyReading, Dataset};

// ============================================
// Upload
// ============================================

/// A CSV file to submit for ingestion
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UploadedMonths {
    pub month1: Option<String>,
    pub month2: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: UploadedMonths,
}

// ============================================
// Prediction
// ============================================

/// One historical series handed to the predictor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictDataset {
    pub building: String,
    pub year: i32,
    pub month: u32,
    pub data: Vec<DailyReading>,
}

impl From<&Dataset> for PredictDataset {
    fn from(dataset: &Dataset) -> Self {
        Self {
            building: dataset.building.clone(),
            year: dataset.year,
            month: dataset.month,
            data: dataset.readings.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PredictRequest {
    pub datasets: Vec<PredictDataset>,
}

/// A forecast point
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionPoint {
    /// Forecast date as produced by the predictor
    pub ds: String,
    #[serde(rename = "Final_Prediction")]
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    #[serde(default)]
    pub predictions: Vec<PredictionPoint>,
    /// Model evaluation metrics, passed through untouched
    #[serde(default)]
    pub evaluation: serde_json::Value,
}

// ============================================
// Notifications
// ============================================

/// An email the energy API should send
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// The daily usage report for `date`
    Daily {
        date: NaiveDate,
        recipients: Vec<String>,
        #[serde(default)]
        report: serde_json::Value,
    },
    /// A single anomaly alert
    Alert {
        alert: AnomalyAlert,
        recipients: Vec<String>,
    },
}

impl Notification {
    /// Upstream path that delivers this notification
    pub fn path(&self) -> &'static str {
        match self {
            Notification::Daily { .. } => "/send-daily-email",
            Notification::Alert { .. } => "/send-alert-email",
        }
    }

    pub fn recipients(&self) -> &[String] {
        match self {
            Notification::Daily { recipients, .. } | Notification::Alert { recipients, .. } => {
                recipients
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_wire_names() {
        let json = r#"{"predictions": [{"ds": "2024-04-01", "Final_Prediction": 321.5}],
                       "evaluation": {"mae": 12.0}}"#;
        let prediction: Prediction = serde_json::from_str(json).unwrap();
        assert_eq!(prediction.predictions[0].value, 321.5);
        assert_eq!(prediction.evaluation["mae"], 12.0);
    }

    #[test]
    fn test_notification_paths() {
        let daily = Notification::Daily {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            recipients: vec!["ops@example.com".to_string()],
            report: serde_json::Value::Null,
        };
        assert_eq!(daily.path(), "/send-daily-email");
        assert_eq!(daily.recipients().len(), 1);

        let json = serde_json::to_value(&daily).unwrap();
        assert_eq!(json["kind"], "daily");
    }
}
