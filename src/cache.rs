//! Report Cache
//!
//! Persists computed dashboard views in a small SQLite database so repeat
//! requests for the same period skip the upstream round trips.
//!
//! Entries are JSON documents keyed by a string. Each entry may carry the
//! period it describes; retention purges by that period, not by write time.

use chrono::{Datelike, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

use crate::analytics::calendar::shift_month;
use crate::analytics::types::offset_days;

/// Prefix of monthly summary entries
pub const SUMMARY_PREFIX: &str = "electricity_summary_";
/// Prefix of daily and yearly report entries
pub const REPORT_PREFIX: &str = "electricity_report_";
/// Prefix of daily report widget entries
pub const REPORT_WIDGET_PREFIX: &str = "electricity_report_widget_";
/// Key of the persisted dashboard date
pub const APP_DATE_KEY: &str = "appDate";

/// Errors that can occur in the report cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache lock poisoned")]
    Poisoned,
}

/// A cache key plus the period its entry describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub key: String,
    pub period: Option<NaiveDate>,
}

impl CacheKey {
    /// Key without a period; never purged by retention
    pub fn plain(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            period: None,
        }
    }

    /// `electricity_summary_{YYYY}-{M}_{building}`
    pub fn summary(year: i32, month: u32, building: &str) -> Self {
        Self {
            key: format!("{}{}-{}_{}", SUMMARY_PREFIX, year, month, key_safe(building)),
            period: NaiveDate::from_ymd_opt(year, month, 1),
        }
    }

    /// `electricity_report_{YYYY-MM-DD}_{building}`
    pub fn report(date: NaiveDate, building: &str) -> Self {
        Self {
            key: format!("{}{}_{}", REPORT_PREFIX, date.format("%Y-%m-%d"), key_safe(building)),
            period: Some(date),
        }
    }

    /// `electricity_report_widget_{YYYY-MM-DD}`
    pub fn report_widget(date: NaiveDate) -> Self {
        Self {
            key: format!("{}{}", REPORT_WIDGET_PREFIX, date.format("%Y-%m-%d")),
            period: Some(date),
        }
    }

    pub fn app_date() -> Self {
        Self::plain(APP_DATE_KEY)
    }
}

/// Percent-encode a building name so distinct names never share a key
fn key_safe(building: &str) -> String {
    urlencoding::encode(building).into_owned()
}

/// How long cached views are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    /// Monthly summaries older than this many months are purged
    pub summary_months: u32,
    /// Report entries older than this many days are purged
    pub report_days: i64,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            summary_months: 3,
            report_days: 7,
        }
    }
}

/// SQLite-backed JSON cache
pub struct ReportCache {
    conn: Mutex<Connection>,
}

impl ReportCache {
    /// Open (or create) the cache database at `path`
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory cache, lost on drop
    pub fn in_memory() -> Result<Self, CacheError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, CacheError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                period     TEXT,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_cache_entries_period ON cache_entries(period);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }

    /// Fetch and decode an entry.
    ///
    /// An entry that no longer decodes is removed and reported as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let raw: Option<String> = self
            .conn()?
            .query_row(
                "SELECT value FROM cache_entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = raw else {
            tracing::debug!(key = %key, "Cache miss");
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!(key = %key, "Cache hit");
                Ok(Some(value))
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding corrupt cache entry");
                self.remove(key)?;
                Ok(None)
            }
        }
    }

    /// Store an entry, replacing any previous value
    pub fn put<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<(), CacheError> {
        let json = serde_json::to_string(value)?;
        let period = key.period.map(|d| d.format("%Y-%m-%d").to_string());
        self.conn()?.execute(
            "INSERT INTO cache_entries (key, value, period, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                period = excluded.period,
                updated_at = excluded.updated_at",
            params![key.key, json, period, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    /// Remove an entry; returns whether it existed
    pub fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let removed = self
            .conn()?
            .execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    /// Remove entries whose key starts with `prefix` and whose period is
    /// before `cutoff`. Returns how many were removed.
    pub fn purge_prefix_older_than(&self, prefix: &str, cutoff: NaiveDate) -> Result<usize, CacheError> {
        // substr comparison avoids LIKE treating '_' as a wildcard
        let removed = self.conn()?.execute(
            "DELETE FROM cache_entries
             WHERE substr(key, 1, length(?1)) = ?1
               AND period IS NOT NULL
               AND period < ?2",
            params![prefix, cutoff.format("%Y-%m-%d").to_string()],
        )?;
        Ok(removed)
    }

    /// Apply the retention policy relative to `today`
    pub fn apply_retention(&self, today: NaiveDate, retention: Retention) -> Result<usize, CacheError> {
        let months_back = i32::try_from(retention.summary_months).unwrap_or(i32::MAX);
        let summary_cutoff = shift_month(today.year(), today.month(), -months_back)
            .and_then(|(year, month)| NaiveDate::from_ymd_opt(year, month, 1))
            .unwrap_or(NaiveDate::MIN);
        let report_cutoff = offset_days(today, retention.report_days.saturating_neg());

        let removed = self.purge_prefix_older_than(SUMMARY_PREFIX, summary_cutoff)?
            + self.purge_prefix_older_than(REPORT_PREFIX, report_cutoff)?;

        if removed > 0 {
            tracing::info!(removed, "Purged expired cache entries");
        }
        Ok(removed)
    }

    /// Number of stored entries
    pub fn len(&self) -> Result<usize, CacheError> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}
