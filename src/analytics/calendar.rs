//! Calendar heatmap
//!
//! One cell per day of a month, each carrying consumption, cost, and a
//! level relative to the month's average.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::classify::{classify, ConsumptionLevel};
use super::stats::cost;
use super::types::{days_in_month, month_name, DailyReading};

/// A single calendar cell
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub consumption: Option<f64>,
    pub cost: Option<f64>,
    pub level: ConsumptionLevel,
}

/// A month of calendar cells for one building
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarMonth {
    pub building: String,
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    /// Average of the readings present in this month
    pub average: f64,
    pub days: Vec<CalendarDay>,
}

impl CalendarMonth {
    /// Lay out `readings` over every day of `year`/`month`.
    ///
    /// Readings dated outside the month are ignored. Days without a reading
    /// are neutral and carry no value.
    pub fn build(
        building: impl Into<String>,
        year: i32,
        month: u32,
        readings: &[DailyReading],
        rate: f64,
    ) -> Self {
        let by_date: HashMap<NaiveDate, f64> = readings
            .iter()
            .filter(|r| r.date.year() == year && r.date.month() == month)
            .map(|r| (r.date, r.consumption))
            .collect();

        let average = if by_date.is_empty() {
            0.0
        } else {
            by_date.values().sum::<f64>() / by_date.len() as f64
        };

        let days = (1..=days_in_month(year, month))
            .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
            .map(|date| match by_date.get(&date) {
                Some(&consumption) => CalendarDay {
                    date,
                    consumption: Some(consumption),
                    cost: Some(cost(consumption, rate)),
                    level: classify(consumption, average),
                },
                None => CalendarDay {
                    date,
                    consumption: None,
                    cost: None,
                    level: ConsumptionLevel::Neutral,
                },
            })
            .collect();

        Self {
            building: building.into(),
            year,
            month,
            month_name: month_name(month).to_string(),
            average,
            days,
        }
    }
}

/// Move `delta` months from `year`/`month`, rolling the year as needed.
///
/// `None` if the result does not fit in an `i32` year.
pub fn shift_month(year: i32, month: u32, delta: i32) -> Option<(i32, u32)> {
    let month_index = i32::try_from(month).ok()?.checked_sub(1)?;
    let zero_based = year
        .checked_mul(12)?
        .checked_add(month_index)?
        .checked_add(delta)?;
    Some((zero_based.div_euclid(12), zero_based.rem_euclid(12) as u32 + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_layout() {
        let readings = vec![
            DailyReading::new(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), 100.0),
            DailyReading::new(NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(), 50.0),
            DailyReading::new(NaiveDate::from_ymd_opt(2024, 2, 3).unwrap(), 150.0),
            // Outside the month
            DailyReading::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 9999.0),
        ];

        let cal = CalendarMonth::build("Library", 2024, 2, &readings, 0.11);
        assert_eq!(cal.days.len(), 29);
        assert_eq!(cal.average, 100.0);
        assert_eq!(cal.month_name, "February");

        assert_eq!(cal.days[0].level, ConsumptionLevel::Medium);
        assert_eq!(cal.days[1].level, ConsumptionLevel::VeryLow);
        assert_eq!(cal.days[2].level, ConsumptionLevel::High);
        assert!((cal.days[0].cost.unwrap() - 11.0).abs() < 1e-9);

        assert_eq!(cal.days[10].consumption, None);
        assert_eq!(cal.days[10].level, ConsumptionLevel::Neutral);
    }

    #[test]
    fn test_calendar_without_data() {
        let cal = CalendarMonth::build("Gym", 2023, 11, &[], 0.11);
        assert_eq!(cal.days.len(), 30);
        assert_eq!(cal.average, 0.0);
        assert!(cal.days.iter().all(|d| d.level == ConsumptionLevel::Neutral));
    }

    #[test]
    fn test_shift_month() {
        assert_eq!(shift_month(2024, 1, -1), Some((2023, 12)));
        assert_eq!(shift_month(2024, 12, 1), Some((2025, 1)));
        assert_eq!(shift_month(2024, 6, 0), Some((2024, 6)));
        assert_eq!(shift_month(2024, 3, -15), Some((2022, 12)));
    }

    #[test]
    fn test_shift_month_out_of_range() {
        assert_eq!(shift_month(i32::MAX, 1, -1), None);
        assert_eq!(shift_month(i32::MIN, 1, 0), None);
    }

    #[test]
    fn test_calendar_for_unrepresentable_year_is_empty() {
        let cal = CalendarMonth::build("Gym", i32::MAX, 12, &[], 0.11);
        assert!(cal.days.is_empty());
        assert_eq!(cal.average, 0.0);
    }
}
