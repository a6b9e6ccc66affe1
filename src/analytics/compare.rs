//! Period comparison
//!
//! Compares one day's consumption against the previous day, the trailing
//! week, and the month it belongs to.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::stats::pct_change;
use super::types::DailyReading;

/// Days in the trailing window used for the weekly reference
pub const WEEK_DAYS: u64 = 7;

/// A day compared with its reference averages
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PeriodComparison {
    pub date: Option<NaiveDate>,
    pub current: f64,
    pub previous_day: f64,
    pub weekly_average: f64,
    pub monthly_average: f64,
    pub vs_previous_day: f64,
    pub vs_weekly: f64,
    pub vs_monthly: f64,
}

impl PeriodComparison {
    /// Build the comparison for `date` from a daily series.
    ///
    /// The series may span several months. Missing references are zero,
    /// and so are their deltas.
    pub fn for_day(readings: &[DailyReading], date: NaiveDate) -> Self {
        let by_date: HashMap<NaiveDate, f64> =
            readings.iter().map(|r| (r.date, r.consumption)).collect();

        let current = by_date.get(&date).copied().unwrap_or(0.0);
        let previous_day = date
            .pred_opt()
            .and_then(|d| by_date.get(&d).copied())
            .unwrap_or(0.0);

        let week: Vec<f64> = (1..=WEEK_DAYS)
            .filter_map(|offset| date.checked_sub_days(Days::new(offset)))
            .filter_map(|day| by_date.get(&day).copied())
            .collect();
        let weekly_average = mean(&week);

        let month: Vec<f64> = readings
            .iter()
            .filter(|r| r.date.year() == date.year() && r.date.month() == date.month())
            .map(|r| r.consumption)
            .collect();
        let monthly_average = mean(&month);

        Self {
            date: Some(date),
            current,
            previous_day,
            weekly_average,
            monthly_average,
            vs_previous_day: pct_change(current, previous_day),
            vs_weekly: pct_change(current, weekly_average),
            vs_monthly: pct_change(current, monthly_average),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(year: i32, month: u32, values: &[f64]) -> Vec<DailyReading> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| DailyReading::new(NaiveDate::from_ymd_opt(year, month, i as u32 + 1).unwrap(), *v))
            .collect()
    }

    #[test]
    fn test_comparison_mid_month() {
        // Days 1..=10 at 100, day 11 at 150
        let mut values = vec![100.0; 10];
        values.push(150.0);
        let readings = series(2024, 5, &values);
        let date = NaiveDate::from_ymd_opt(2024, 5, 11).unwrap();

        let cmp = PeriodComparison::for_day(&readings, date);
        assert_eq!(cmp.current, 150.0);
        assert_eq!(cmp.previous_day, 100.0);
        assert_eq!(cmp.weekly_average, 100.0);
        assert!((cmp.vs_previous_day - 50.0).abs() < 1e-9);
        assert!((cmp.vs_weekly - 50.0).abs() < 1e-9);
        let expected_month = 1150.0 / 11.0;
        assert!((cmp.monthly_average - expected_month).abs() < 1e-9);
    }

    #[test]
    fn test_comparison_first_day_has_no_previous() {
        let readings = series(2024, 5, &[80.0, 90.0]);
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let cmp = PeriodComparison::for_day(&readings, date);
        assert_eq!(cmp.previous_day, 0.0);
        assert_eq!(cmp.vs_previous_day, 0.0);
        assert_eq!(cmp.weekly_average, 0.0);
        assert_eq!(cmp.vs_weekly, 0.0);
    }

    #[test]
    fn test_comparison_week_spans_month_boundary() {
        let mut readings = series(2024, 4, &[10.0; 30]);
        readings.extend(series(2024, 5, &[20.0, 20.0]));
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();

        let cmp = PeriodComparison::for_day(&readings, date);
        // 1 day of May at 20 plus 6 days of April at 10
        assert!((cmp.weekly_average - 80.0 / 7.0).abs() < 1e-9);
        assert_eq!(cmp.monthly_average, 20.0);
    }

    #[test]
    fn test_comparison_on_earliest_date() {
        let readings = vec![DailyReading::new(NaiveDate::MIN, 40.0)];
        let cmp = PeriodComparison::for_day(&readings, NaiveDate::MIN);
        assert_eq!(cmp.current, 40.0);
        assert_eq!(cmp.previous_day, 0.0);
        assert_eq!(cmp.weekly_average, 0.0);
    }

    #[test]
    fn test_comparison_empty_series() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let cmp = PeriodComparison::for_day(&[], date);
        assert_eq!(cmp.current, 0.0);
        assert_eq!(cmp.vs_monthly, 0.0);
    }
}
