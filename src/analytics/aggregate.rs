//! Series aggregation
//!
//! Averages several monthly series into one line for the comparison graph.
//! Two flavors exist: a positional averager over bare value series that
//! carries the last known value forward for short series, and a
//! day-of-month averager over dated datasets.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::stats::SeriesStats;
use super::types::{days_in_month, DailyReading};

/// Label given to the computed average line
pub const AVERAGE_LABEL: &str = "Average Aggregate";

/// Average series position by position.
///
/// The result is as long as the longest input. A series shorter than that
/// contributes its last value to every later position. Empty series have no
/// last value and never contribute. For equal-length inputs this is the plain
/// per-index mean.
pub fn average_series(series: &[Vec<f64>]) -> Vec<f64> {
    let contributing: Vec<&Vec<f64>> = series.iter().filter(|s| !s.is_empty()).collect();
    let len = contributing.iter().map(|s| s.len()).max().unwrap_or(0);
    if contributing.is_empty() {
        return Vec::new();
    }

    let n = contributing.len() as f64;
    (0..len)
        .map(|i| {
            let sum: f64 = contributing
                .iter()
                .map(|s| s[i.min(s.len() - 1)])
                .sum();
            sum / n
        })
        .collect()
}

/// One building's daily readings for a month
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub label: String,
    pub building: String,
    pub year: i32,
    pub month: u32,
    pub readings: Vec<DailyReading>,
}

impl Dataset {
    pub fn new(building: impl Into<String>, year: i32, month: u32, readings: Vec<DailyReading>) -> Self {
        let building = building.into();
        Self {
            label: format!("{} {}-{:02}", building, year, month),
            building,
            year,
            month,
            readings,
        }
    }

    pub fn values(&self) -> Vec<f64> {
        self.readings.iter().map(|r| r.consumption).collect()
    }
}

/// Average datasets by day of month.
///
/// Each dataset contributes only days that exist in its own month, and each
/// day is divided by the number of datasets that had it. The result is dated
/// in the first dataset's month; days that month lacks are dropped.
pub fn day_indexed_average(datasets: &[Dataset]) -> Option<Dataset> {
    let first = datasets.first()?;

    let mut buckets: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for dataset in datasets {
        let max_day = days_in_month(dataset.year, dataset.month);
        for reading in &dataset.readings {
            let day = reading.day();
            if day > max_day || !reading.consumption.is_finite() {
                continue;
            }
            let entry = buckets.entry(day).or_insert((0.0, 0));
            entry.0 += reading.consumption;
            entry.1 += 1;
        }
    }

    let readings = buckets
        .into_iter()
        .filter_map(|(day, (sum, count))| {
            NaiveDate::from_ymd_opt(first.year, first.month, day)
                .map(|date| DailyReading::new(date, sum / count as f64))
        })
        .collect();

    Some(Dataset {
        label: AVERAGE_LABEL.to_string(),
        building: AVERAGE_LABEL.to_string(),
        year: first.year,
        month: first.month,
        readings,
    })
}

/// Summary statistics for one dataset
pub fn dataset_stats(dataset: &Dataset) -> SeriesStats {
    SeriesStats::from_slice(&dataset.values())
}
