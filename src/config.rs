//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::analytics::DetectionMethod;
use crate::cache::Retention;
use crate::client::EnergyApiConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub pricing: PricingConfig,

    #[serde(default)]
    pub alerts: AlertsConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upstream energy API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_url")]
    pub url: String,

    #[serde(default = "default_upstream_timeout")]
    pub timeout_ms: u64,

    #[serde(default = "default_upstream_retries")]
    pub max_retries: u32,
}

fn default_upstream_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_upstream_timeout() -> u64 {
    10_000
}

fn default_upstream_retries() -> u32 {
    3
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            timeout_ms: default_upstream_timeout(),
            max_retries: default_upstream_retries(),
        }
    }
}

impl UpstreamConfig {
    pub fn client_config(&self) -> EnergyApiConfig {
        EnergyApiConfig {
            base_url: self.url.clone(),
            request_timeout_ms: self.timeout_ms,
            max_retries: self.max_retries,
            ..Default::default()
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Report cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: String,

    #[serde(default = "default_summary_retention")]
    pub summary_retention_months: u32,

    #[serde(default = "default_report_retention")]
    pub report_retention_days: i64,
}

fn default_cache_path() -> String {
    dirs::cache_dir()
        .map(|p| p.join("wattboard").join("reports.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./wattboard_cache.db".to_string())
}

fn default_summary_retention() -> u32 {
    3
}

fn default_report_retention() -> i64 {
    7
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            summary_retention_months: default_summary_retention(),
            report_retention_days: default_report_retention(),
        }
    }
}

impl CacheConfig {
    pub fn retention(&self) -> Retention {
        Retention {
            summary_months: self.summary_retention_months,
            report_days: self.report_retention_days,
        }
    }
}

/// Conversion factors for cost and emissions
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Dollars per kWh
    #[serde(default = "default_cost_per_kwh")]
    pub cost_per_kwh: f64,

    /// Pounds of CO2 per kWh
    #[serde(default = "default_co2_per_kwh")]
    pub co2_lb_per_kwh: f64,
}

fn default_cost_per_kwh() -> f64 {
    0.11
}

fn default_co2_per_kwh() -> f64 {
    0.81
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            cost_per_kwh: default_cost_per_kwh(),
            co2_lb_per_kwh: default_co2_per_kwh(),
        }
    }
}

/// Alert tile configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_alert_window")]
    pub window_days: i64,

    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,

    #[serde(default)]
    pub method: DetectionMethod,
}

fn default_alert_window() -> i64 {
    7
}

fn default_recent_limit() -> usize {
    3
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            window_days: default_alert_window(),
            recent_limit: default_recent_limit(),
            method: DetectionMethod::default(),
        }
    }
}

/// Email notification configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsConfig {
    /// Default recipients when a request names none
    #[serde(default)]
    pub recipients: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub fn default_filter(&self) -> String {
        format!("wattboard={},tower_http=debug", self.level)
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("wattboard").join("config.toml")),
            Some(PathBuf::from("/etc/wattboard/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("WATTBOARD_UPSTREAM_URL") {
            self.upstream.url = url;
        }

        if let Some(host) = lookup("WATTBOARD_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("WATTBOARD_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        if let Some(path) = lookup("WATTBOARD_CACHE_PATH") {
            self.cache.path = path;
        }

        if let Some(level) = lookup("WATTBOARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("WATTBOARD_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Wattboard Configuration
#
# Environment variables override these settings:
# - WATTBOARD_UPSTREAM_URL
# - WATTBOARD_API_HOST
# - WATTBOARD_API_PORT
# - WATTBOARD_CACHE_PATH
# - WATTBOARD_LOG_LEVEL
# - WATTBOARD_LOG_FORMAT

[upstream]
# Energy API base URL
url = "http://localhost:5000"

# Request timeout (ms)
timeout_ms = 10000

# Attempts for read requests
max_retries = 3

[api]
# Dashboard API host
host = "0.0.0.0"

# Dashboard API port
port = 8090

# Allowed CORS origins (empty allows any)
cors_origins = ["http://localhost:3000", "http://127.0.0.1:3000"]

# Request timeout in seconds
request_timeout_secs = 30

[cache]
# SQLite file for cached reports
path = "~/.cache/wattboard/reports.db"

# Keep monthly summaries this many months
summary_retention_months = 3

# Keep daily reports this many days
report_retention_days = 7

[pricing]
# Dollars per kWh
cost_per_kwh = 0.11

# Pounds of CO2 per kWh
co2_lb_per_kwh = 0.81

[alerts]
# Days of alerts shown on the dashboard
window_days = 7

# Alerts listed as recent
recent_limit = 3

# Detection method: z_score, LOF, iqr, rolling_mean
method = "z_score"

[notifications]
# Default email recipients
recipients = []

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.upstream.url, "http://localhost:5000");
        assert_eq!(config.pricing.cost_per_kwh, 0.11);
        assert_eq!(config.pricing.co2_lb_per_kwh, 0.81);
        assert_eq!(config.alerts.window_days, 7);
        assert_eq!(config.alerts.recent_limit, 3);
        assert_eq!(config.cache.retention(), Retention::default());
        assert_eq!(config.logging.default_filter(), "wattboard=info,tower_http=debug");
    }

    #[test]
    fn test_generated_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.api.port, 8090);
        assert_eq!(config.alerts.method, DetectionMethod::ZScore);
        assert_eq!(config.upstream.max_retries, 3);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[pricing]\ncost_per_kwh = 0.2\n\n[alerts]\nmethod = \"LOF\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.pricing.cost_per_kwh, 0.2);
        assert_eq!(config.pricing.co2_lb_per_kwh, 0.81);
        assert_eq!(config.alerts.method, DetectionMethod::Lof);
        assert_eq!(config.api.port, 8090);
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[api\nport = ").unwrap();
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            Config::load(Path::new("/nonexistent/wattboard.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("WATTBOARD_UPSTREAM_URL", "http://energy:5000"),
            ("WATTBOARD_API_PORT", "9000"),
            ("WATTBOARD_CACHE_PATH", "/tmp/cache.db"),
            ("WATTBOARD_LOG_FORMAT", "json"),
        ]);

        let mut config = Config::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.upstream.url, "http://energy:5000");
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.cache.path, "/tmp/cache.db");
        assert!(config.logging.is_json());
        assert_eq!(config.api.host, "0.0.0.0");
    }

    #[test]
    fn test_client_config() {
        let upstream = UpstreamConfig {
            url: "http://energy:5000".to_string(),
            timeout_ms: 500,
            max_retries: 1,
        };
        let client = upstream.client_config();
        assert_eq!(client.base_url, "http://energy:5000");
        assert_eq!(client.request_timeout_ms, 500);
    }
}
