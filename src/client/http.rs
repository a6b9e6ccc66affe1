//! Energy API REST client
//!
//! HTTP client for the upstream energy API.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use reqwest::{multipart, Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use super::types::{Notification, PredictRequest, Prediction, UploadFile, UploadResponse};
use super::{EnergyApiError, EnergySource};
use crate::analytics::{
    AlertList, AlertQuery, AnalyzeRequest, AnalyzeResponse, AvailableData, DailyReading,
    DayConsumption, PeriodStats, StatusUpdate,
};

/// Energy API REST client
pub struct EnergyApiClient {
    client: Client,
    config: EnergyApiConfig,
}

/// Configuration for the energy API client
#[derive(Debug, Clone)]
pub struct EnergyApiConfig {
    /// Base URL of the energy API (e.g., "http://localhost:5000")
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Maximum attempts for GET requests
    pub max_retries: u32,
    /// Backoff unit; attempt `n` waits `n^2` units
    pub retry_backoff_ms: u64,
}

impl Default for EnergyApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_ms: 10_000,
            max_retries: 3,
            retry_backoff_ms: 1_000,
        }
    }
}

impl EnergyApiClient {
    /// Create a new client with the given configuration
    pub fn new(config: EnergyApiConfig) -> Result<Self, EnergyApiError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &EnergyApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// GET a JSON document, retrying transient failures
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, EnergyApiError> {
        let url = self.url(path);
        let attempts = self.config.max_retries.max(1);
        let mut last_error = EnergyApiError::Unavailable;

        for attempt in 0..attempts {
            if attempt > 0 {
                // Quadratic backoff: 1, 4, 9... units
                let delay = self.config.retry_backoff_ms * (attempt as u64).pow(2);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                tracing::debug!(url = %url, attempt, "Retrying energy API request");
            }

            match self.client.get(&url).query(query).send().await {
                Ok(response) => {
                    if response.status().as_u16() == 429 {
                        let cap = Duration::from_millis(self.config.request_timeout_ms);
                        if let Some(wait) = retry_after(&response, cap) {
                            tokio::time::sleep(wait).await;
                        }
                        last_error = EnergyApiError::RateLimited;
                        continue;
                    }
                    return read_json(response).await;
                }
                Err(e) => {
                    last_error = map_request_error(e);
                    if !last_error.is_transient() {
                        return Err(last_error);
                    }
                }
            }
        }

        tracing::warn!(url = %url, error = %last_error, "Energy API request failed after retries");
        Err(last_error)
    }

    /// POST a JSON body and decode the JSON reply. Not retried.
    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, EnergyApiError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(map_request_error)?;

        read_json(response).await
    }
}

#[async_trait]
impl EnergySource for EnergyApiClient {
    async fn available_data(&self) -> Result<AvailableData, EnergyApiError> {
        self.get_json("/get-available-data", &[]).await
    }

    async fn month_readings(
        &self,
        building: &str,
        year: i32,
        month: u32,
    ) -> Result<Vec<DailyReading>, EnergyApiError> {
        let path = format!("/fetch-data/{}/{}/0/{}", year, month, encode(building));
        self.get_json(&path, &[]).await
    }

    async fn day_consumption(&self, building: &str, date: NaiveDate) -> Result<f64, EnergyApiError> {
        let path = format!(
            "/fetch-data/{}/{}/{}/{}",
            date.year(),
            date.month(),
            date.day(),
            encode(building)
        );
        let day: DayConsumption = self.get_json(&path, &[]).await?;
        Ok(day.consumption)
    }

    async fn month_stats(
        &self,
        building: &str,
        year: i32,
        month: u32,
    ) -> Result<PeriodStats, EnergyApiError> {
        let path = format!("/stats/{}/{}/{}", year, month, encode(building));
        self.get_json(&path, &[]).await
    }

    async fn year_stats(&self, building: &str, year: i32) -> Result<PeriodStats, EnergyApiError> {
        let path = format!("/stats/{}/0/{}", year, encode(building));
        self.get_json(&path, &[]).await
    }

    async fn upload(&self, files: Vec<UploadFile>) -> Result<UploadResponse, EnergyApiError> {
        let mut form = multipart::Form::new();
        for (i, file) in files.into_iter().enumerate() {
            let part = multipart::Part::bytes(file.contents)
                .file_name(file.file_name)
                .mime_str("text/csv")?;
            form = form.part(format!("file{}", i + 1), part);
        }

        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(map_request_error)?;

        read_json(response).await
    }

    async fn analyze_anomalies(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<AnalyzeResponse, EnergyApiError> {
        self.post_json("/api/anomalies/analyze-anomalies", request).await
    }

    async fn list_anomalies(&self, query: &AlertQuery) -> Result<AlertList, EnergyApiError> {
        let mut list: AlertList = self
            .get_json("/api/anomalies/get-anomalies", &query.to_params())
            .await?;
        // Filters the store cannot express are applied here
        list.alerts.retain(|a| query.matches(a));
        Ok(list)
    }

    async fn update_anomaly_status(&self, update: &StatusUpdate) -> Result<(), EnergyApiError> {
        let _: serde_json::Value = self
            .post_json("/api/anomalies/update-anomaly-status", update)
            .await?;
        Ok(())
    }

    async fn predict(&self, request: &PredictRequest) -> Result<Prediction, EnergyApiError> {
        self.post_json("/predict", request).await
    }

    async fn notify(&self, notification: &Notification) -> Result<(), EnergyApiError> {
        let _: serde_json::Value = self.post_json(notification.path(), notification).await?;
        Ok(())
    }
}

fn encode(building: &str) -> String {
    urlencoding::encode(building).into_owned()
}

/// The `Retry-After` wait in seconds, never longer than `cap`
fn retry_after(response: &Response, cap: Duration) -> Option<Duration> {
    let header = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok());
    retry_delay(header, cap)
}

fn retry_delay(header: Option<&str>, cap: Duration) -> Option<Duration> {
    let secs = header?.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(secs).min(cap))
}

fn map_request_error(e: reqwest::Error) -> EnergyApiError {
    if e.is_timeout() {
        EnergyApiError::Timeout
    } else if e.is_connect() {
        EnergyApiError::Unavailable
    } else {
        EnergyApiError::Request(e)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, EnergyApiError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| EnergyApiError::InvalidResponse(e.to_string()));
    }

    let text = response.text().await.unwrap_or_default();
    if status.as_u16() == 404 {
        Err(EnergyApiError::NotFound(text))
    } else {
        Err(EnergyApiError::Api {
            status: status.as_u16(),
            message: text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Multipart, Path, Query},
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: String) -> EnergyApiClient {
        EnergyApiClient::new(EnergyApiConfig {
            base_url,
            request_timeout_ms: 2_000,
            max_retries: 3,
            retry_backoff_ms: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = EnergyApiConfig::default();
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_url_joining() {
        let client = client_for("http://localhost:5000/".to_string());
        assert_eq!(client.url("/stats/2024/0/Gym"), "http://localhost:5000/stats/2024/0/Gym");
        assert_eq!(encode("Main Hall"), "Main%20Hall");
    }

    #[tokio::test]
    async fn test_month_readings_decodes_building() {
        let router = Router::new().route(
            "/fetch-data/:year/:month/:day/:building",
            get(|Path((year, month, day, building)): Path<(i32, u32, u32, String)>| async move {
                assert_eq!((year, month, day), (2024, 3, 0));
                assert_eq!(building, "Main Hall");
                Json(serde_json::json!([
                    {"date": "2024-03-01T00:00:00", "consumption": 10.5},
                    {"date": "2024-03-02T00:00:00", "consumption": 12.0}
                ]))
            }),
        );
        let client = client_for(spawn_stub(router).await);

        let readings = client.month_readings("Main Hall", 2024, 3).await.unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[1].consumption, 12.0);
    }

    #[tokio::test]
    async fn test_day_consumption_and_year_stats() {
        let router = Router::new()
            .route(
                "/fetch-data/:year/:month/:day/:building",
                get(|| async { Json(serde_json::json!({"consumption": 42.0})) }),
            )
            .route(
                "/stats/:year/:month/:building",
                get(|Path((_, month, _)): Path<(i32, u32, String)>| async move {
                    assert_eq!(month, 0);
                    Json(serde_json::json!({
                        "mean": 40.0, "highest": 90.0, "lowest": 5.0, "median": 38.0,
                        "monthlyData": [{"month": "January", "consumption": 1200.0}]
                    }))
                }),
            );
        let client = client_for(spawn_stub(router).await);

        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(client.day_consumption("Gym", date).await.unwrap(), 42.0);

        let stats = client.year_stats("Gym", 2024).await.unwrap();
        assert_eq!(stats.mean, 40.0);
        assert_eq!(stats.monthly_data.len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_maps_to_error() {
        let router = Router::new().route(
            "/stats/:year/:month/:building",
            get(|| async { (StatusCode::NOT_FOUND, "no data") }),
        );
        let client = client_for(spawn_stub(router).await);

        let err = client.month_stats("Gym", 2024, 3).await.unwrap_err();
        assert!(matches!(err, EnergyApiError::NotFound(msg) if msg == "no data"));
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/get-available-data",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
                }
            }),
        );
        let client = client_for(spawn_stub(router).await);

        let err = client.available_data().await.unwrap_err();
        assert!(matches!(err, EnergyApiError::Api { status: 500, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_get_is_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/get-available-data",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        (StatusCode::TOO_MANY_REQUESTS, Json(serde_json::json!({})))
                    } else {
                        (
                            StatusCode::OK,
                            Json(serde_json::json!({"Library": {"2024": [1, 2]}})),
                        )
                    }
                }
            }),
        );
        let client = client_for(spawn_stub(router).await);

        let data = client.available_data().await.unwrap();
        assert_eq!(data["Library"]["2024"], vec![1, 2]);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_retry_delay_is_capped() {
        let cap = Duration::from_secs(10);
        assert_eq!(retry_delay(Some("2"), cap), Some(Duration::from_secs(2)));
        assert_eq!(retry_delay(Some("86400"), cap), Some(cap));
        assert_eq!(retry_delay(Some("Wed, 21 Oct 2015 07:28:00 GMT"), cap), None);
        assert_eq!(retry_delay(None, cap), None);
    }

    #[tokio::test]
    async fn test_long_retry_after_waits_at_most_the_timeout() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/get-available-data",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (
                            StatusCode::TOO_MANY_REQUESTS,
                            [("Retry-After", "86400")],
                            Json(serde_json::json!({})),
                        )
                    } else {
                        (
                            StatusCode::OK,
                            [("Retry-After", "0")],
                            Json(serde_json::json!({"Gym": {"2024": [3]}})),
                        )
                    }
                }
            }),
        );
        let client = EnergyApiClient::new(EnergyApiConfig {
            base_url: spawn_stub(router).await,
            request_timeout_ms: 200,
            max_retries: 2,
            retry_backoff_ms: 1,
        })
        .unwrap();

        let data = tokio::time::timeout(Duration::from_secs(5), client.available_data())
            .await
            .expect("retry wait should be capped")
            .unwrap();
        assert_eq!(data["Gym"]["2024"], vec![3]);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unreachable_upstream() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{}", addr));
        let err = client.available_data().await.unwrap_err();
        assert!(matches!(err, EnergyApiError::Unavailable));
    }

    #[tokio::test]
    async fn test_list_anomalies_sends_filters() {
        let router = Router::new().route(
            "/api/anomalies/get-anomalies",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("method").map(String::as_str), Some("z_score"));
                assert_eq!(params.get("start_date").map(String::as_str), Some("2024-03-03"));
                Json(serde_json::json!({
                    "alerts": [
                        {"id": 1, "date": "2024-03-05", "building": "Gym", "consumption": 900.0,
                         "z_score": 7.1, "severity": "Critical", "detection_method": "z_score"},
                        {"id": 2, "date": "2024-03-06", "building": "Gym", "consumption": 700.0,
                         "z_score": 4.6, "severity": "Error", "detection_method": "z_score"}
                    ],
                    "stats": {"total": 2, "critical": 1, "error": 1, "warning": 0,
                              "acknowledged": 0, "sdt": 0}
                }))
            }),
        );
        let client = client_for(spawn_stub(router).await);

        let as_of = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let query = AlertQuery::recent(as_of, 7, crate::analytics::DetectionMethod::ZScore);
        let list = client.list_anomalies(&query).await.unwrap();

        // Error severity is filtered out locally
        assert_eq!(list.alerts.len(), 1);
        assert_eq!(list.alerts[0].id, Some(1));
        assert_eq!(list.stats.total, 2);
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_files() {
        let router = Router::new().route(
            "/upload",
            post(|mut multipart: Multipart| async move {
                let mut names = Vec::new();
                while let Some(field) = multipart.next_field().await.unwrap() {
                    names.push(field.name().unwrap_or_default().to_string());
                }
                assert_eq!(names, vec!["file1", "file2"]);
                Json(serde_json::json!({
                    "message": "Files uploaded successfully",
                    "data": {"month1": "March", "month2": "April"}
                }))
            }),
        );
        let client = client_for(spawn_stub(router).await);

        let files = vec![
            UploadFile {
                file_name: "march.csv".to_string(),
                contents: b"Group,Resource,3/1/2024\n".to_vec(),
            },
            UploadFile {
                file_name: "april.csv".to_string(),
                contents: b"Group,Resource,4/1/2024\n".to_vec(),
            },
        ];
        let response = client.upload(files).await.unwrap();
        assert_eq!(response.data.month1.as_deref(), Some("March"));
        assert_eq!(response.data.month2.as_deref(), Some("April"));
    }

    #[tokio::test]
    async fn test_notify_posts_to_alert_path() {
        let router = Router::new().route(
            "/send-alert-email",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["kind"], "alert");
                Json(serde_json::json!({"success": true}))
            }),
        );
        let client = client_for(spawn_stub(router).await);

        let notification = Notification::Alert {
            alert: serde_json::from_value(serde_json::json!({
                "date": "2024-03-05", "building": "Gym", "severity": "Critical"
            }))
            .unwrap(),
            recipients: vec!["ops@example.com".to_string()],
        };
        client.notify(&notification).await.unwrap();
    }
}
