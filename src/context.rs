//! Dashboard date context
//!
//! The date every dashboard view is computed for. Changes are broadcast to
//! subscribers through a `watch` channel and persisted in the report cache
//! so a restart resumes on the same day.

use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::watch;

use crate::analytics::types::offset_days;
use crate::cache::{CacheError, CacheKey, ReportCache, APP_DATE_KEY};

/// Shared selected-date state
pub struct DateContext {
    tx: watch::Sender<NaiveDate>,
    cache: Option<Arc<ReportCache>>,
}

impl DateContext {
    /// Context that is not persisted
    pub fn new(initial: NaiveDate) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx, cache: None }
    }

    /// Restore the persisted date, falling back to `today`
    pub fn load(cache: Arc<ReportCache>, today: NaiveDate) -> Result<Self, CacheError> {
        let initial = cache.get::<NaiveDate>(APP_DATE_KEY)?.unwrap_or(today);
        tracing::debug!(date = %initial, "Loaded dashboard date");
        let (tx, _rx) = watch::channel(initial);
        Ok(Self {
            tx,
            cache: Some(cache),
        })
    }

    pub fn current(&self) -> NaiveDate {
        *self.tx.borrow()
    }

    /// Select a new date and notify subscribers
    pub fn set(&self, date: NaiveDate) -> Result<(), CacheError> {
        if let Some(cache) = &self.cache {
            cache.put(&CacheKey::app_date(), &date)?;
        }
        let previous = self.tx.send_replace(date);
        if previous != date {
            tracing::info!(from = %previous, to = %date, "Dashboard date changed");
        }
        Ok(())
    }

    /// Move the selected date by `days` (negative moves back)
    pub fn shift_days(&self, days: i64) -> Result<NaiveDate, CacheError> {
        let date = offset_days(self.current(), days);
        self.set(date)?;
        Ok(date)
    }

    pub fn subscribe(&self) -> watch::Receiver<NaiveDate> {
        self.tx.subscribe()
    }
}
