//! Report builders
//!
//! Turns raw per-building readings and statistics into the three report
//! views of the dashboard:
//!
//! - `MonthlySummary`: month totals, peak/lowest day, cost, and change
//!   versus the previous month, for one building or the whole fleet
//! - `DailyReport`: today's consumption against the yearly daily mean
//! - `YearlyReport`: highest and lowest month plus approximated averages
//!
//! Every builder is pure; fetching lives in the dashboard service.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::stats::{co2_pounds, compare_to_average, cost, pct_change, AverageComparison};
use super::types::{short_month_name, DailyReading, PeriodStats, ALL_BUILDINGS};

/// Buildings below this many kWh (total and absolute change) never count as
/// the top-change building
pub const TOP_CHANGE_MIN_KWH: f64 = 100.0;

/// Approximate days per month used for the monthly average
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Approximate days per year used for the yearly average
pub const DAYS_PER_YEAR: f64 = 365.0;

// ============================================
// Monthly summary
// ============================================

/// Consumption on a given day of month (day 0 means none)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct DayUsage {
    pub day: u32,
    pub usage: f64,
}

/// A labelled day, rendered as `"Mar 5"` or `"N/A"`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayMark {
    pub date: String,
    pub usage: f64,
}

impl DayMark {
    fn from_usage(month: u32, usage: DayUsage) -> Self {
        if usage.day > 0 {
            Self {
                date: format!("{} {}", short_month_name(month), usage.day),
                usage: usage.usage,
            }
        } else {
            Self::none()
        }
    }

    fn none() -> Self {
        Self {
            date: "N/A".to_string(),
            usage: 0.0,
        }
    }
}

/// One building's month compared with the month before
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BuildingMonth {
    pub total: f64,
    pub percent_change: f64,
    pub peak_day: DayUsage,
    /// Lowest strictly positive day
    pub lowest_day: DayUsage,
    pub cost: f64,
    pub cost_change: f64,
    pub daily_average: f64,
    /// Number of readings in the month
    pub days: usize,
    pub absolute_change: f64,
    pub daily: Vec<DailyReading>,
}

impl BuildingMonth {
    pub fn compute(current: &[DailyReading], previous: &[DailyReading], rate: f64) -> Self {
        let total: f64 = current.iter().map(|r| r.consumption).sum();
        let previous_total: f64 = previous.iter().map(|r| r.consumption).sum();

        let mut peak_day = DayUsage::default();
        let mut lowest: Option<DayUsage> = None;
        for reading in current {
            if reading.consumption > peak_day.usage {
                peak_day = DayUsage {
                    day: reading.day(),
                    usage: reading.consumption,
                };
            }
            if reading.consumption > 0.0 && lowest.map_or(true, |l| reading.consumption < l.usage) {
                lowest = Some(DayUsage {
                    day: reading.day(),
                    usage: reading.consumption,
                });
            }
        }

        let month_cost = cost(total, rate);
        let previous_cost = cost(previous_total, rate);

        Self {
            total,
            percent_change: pct_change(total, previous_total),
            peak_day,
            lowest_day: lowest.unwrap_or_default(),
            cost: month_cost,
            cost_change: pct_change(month_cost, previous_cost),
            daily_average: if current.is_empty() {
                0.0
            } else {
                total / current.len() as f64
            },
            days: current.len(),
            absolute_change: total - previous_total,
            daily: current.to_vec(),
        }
    }
}

/// Building with the largest month-over-month increase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopChange {
    pub building: String,
    pub percent: f64,
    pub absolute: f64,
}

/// Monthly summary tile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlySummary {
    pub building: String,
    pub year: i32,
    pub month: u32,
    pub total_usage: f64,
    pub total_usage_change: f64,
    pub peak_day: DayMark,
    pub lowest_day: DayMark,
    pub cost: f64,
    pub cost_change: f64,
    pub average_daily_usage: f64,
    pub top_change: Option<TopChange>,
    pub buildings: BTreeMap<String, BuildingMonth>,
}

impl MonthlySummary {
    pub fn for_building(building: impl Into<String>, year: i32, month: u32, data: BuildingMonth) -> Self {
        let building = building.into();
        Self {
            building: building.clone(),
            year,
            month,
            total_usage: data.total,
            total_usage_change: data.percent_change,
            peak_day: DayMark::from_usage(month, data.peak_day),
            lowest_day: DayMark::from_usage(month, data.lowest_day),
            cost: data.cost,
            cost_change: data.cost_change,
            average_daily_usage: data.daily_average,
            top_change: Some(TopChange {
                building: building.clone(),
                percent: data.percent_change,
                absolute: data.absolute_change,
            }),
            buildings: BTreeMap::from([(building, data)]),
        }
    }

    /// Combine every building's month into the fleet view.
    ///
    /// Changes are weighted by each building's share of total consumption.
    /// Peak and lowest days come from per-day totals across buildings.
    pub fn for_fleet(year: i32, month: u32, buildings: BTreeMap<String, BuildingMonth>) -> Self {
        let total_usage: f64 = buildings.values().map(|b| b.total).sum();
        let total_cost: f64 = buildings.values().map(|b| b.cost).sum();

        let mut per_day: BTreeMap<u32, f64> = BTreeMap::new();
        for data in buildings.values() {
            for reading in &data.daily {
                *per_day.entry(reading.day()).or_insert(0.0) += reading.consumption;
            }
        }

        let mut peak = DayUsage::default();
        let mut lowest: Option<DayUsage> = None;
        for (&day, &usage) in &per_day {
            if usage > peak.usage {
                peak = DayUsage { day, usage };
            }
            if usage > 0.0 && lowest.map_or(true, |l| usage < l.usage) {
                lowest = Some(DayUsage { day, usage });
            }
        }

        let mut weighted_change = 0.0;
        let mut weighted_cost_change = 0.0;
        let mut total_days = 0usize;
        let mut top_change: Option<TopChange> = None;
        for (name, data) in &buildings {
            if data.total > 0.0 {
                let weight = data.total / total_usage;
                weighted_change += data.percent_change * weight;
                weighted_cost_change += data.cost_change * weight;
            }
            total_days += data.days;

            let significant =
                data.total > TOP_CHANGE_MIN_KWH || data.absolute_change > TOP_CHANGE_MIN_KWH;
            let best = top_change.as_ref().map_or(0.0, |t| t.percent);
            if significant && data.percent_change > best {
                top_change = Some(TopChange {
                    building: name.clone(),
                    percent: data.percent_change,
                    absolute: data.absolute_change,
                });
            }
        }

        let average_daily_usage = if total_days > 0 {
            total_usage / (total_days as f64 / buildings.len() as f64)
        } else {
            0.0
        };

        Self {
            building: ALL_BUILDINGS.to_string(),
            year,
            month,
            total_usage,
            total_usage_change: weighted_change,
            peak_day: DayMark::from_usage(month, peak),
            lowest_day: lowest.map_or_else(DayMark::none, |l| DayMark::from_usage(month, l)),
            cost: total_cost,
            cost_change: weighted_cost_change,
            average_daily_usage,
            top_change,
            buildings,
        }
    }

    /// True when the summary holds data for every one of `buildings`
    pub fn covers(&self, buildings: &[String]) -> bool {
        buildings
            .iter()
            .filter(|b| b.as_str() != ALL_BUILDINGS)
            .all(|b| self.buildings.contains_key(b))
    }
}

// ============================================
// Daily report
// ============================================

/// Today's usage for one building against its yearly daily mean
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BuildingDay {
    pub today_consumption: f64,
    pub daily_average: f64,
}

/// Daily usage report across buildings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub today_consumption: f64,
    pub daily_average: f64,
    pub comparison: AverageComparison,
    pub co2_pounds: f64,
    pub buildings: BTreeMap<String, BuildingDay>,
}

impl DailyReport {
    pub fn new(date: NaiveDate, buildings: BTreeMap<String, BuildingDay>, co2_factor: f64) -> Self {
        let today_consumption: f64 = buildings.values().map(|b| b.today_consumption).sum();
        let daily_average: f64 = buildings.values().map(|b| b.daily_average).sum();

        Self {
            date,
            today_consumption,
            daily_average,
            comparison: compare_to_average(today_consumption, daily_average),
            co2_pounds: co2_pounds(today_consumption, co2_factor),
            buildings,
        }
    }
}

// ============================================
// Yearly report
// ============================================

/// A labelled month total
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MonthMark {
    pub month: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
}

/// One building's yearly figures
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BuildingYear {
    pub today_consumption: f64,
    pub daily_average: f64,
    pub monthly_average: f64,
    pub yearly_average: f64,
    /// Sum of the selected month's readings
    pub total_consumption: f64,
    pub highest_month: MonthMark,
    /// Lowest non-zero month
    pub lowest_month: MonthMark,
}

impl BuildingYear {
    pub fn compute(today: f64, month_readings: &[DailyReading], stats: &PeriodStats) -> Self {
        // Totals per month label, in first-seen order
        let mut totals: Vec<(String, f64)> = Vec::new();
        for entry in &stats.monthly_data {
            match totals.iter_mut().find(|(m, _)| *m == entry.month) {
                Some((_, value)) => *value += entry.consumption,
                None => totals.push((entry.month.clone(), entry.consumption)),
            }
        }

        let mut highest = MonthMark::default();
        let mut lowest: Option<MonthMark> = None;
        for (month, value) in totals {
            if value > highest.value {
                highest = MonthMark {
                    month: month.clone(),
                    value,
                    building: None,
                };
            }
            if value > 0.0 && lowest.as_ref().map_or(true, |l| value < l.value) {
                lowest = Some(MonthMark {
                    month,
                    value,
                    building: None,
                });
            }
        }

        Self {
            today_consumption: today,
            daily_average: stats.mean,
            monthly_average: stats.mean * DAYS_PER_MONTH,
            yearly_average: stats.mean * DAYS_PER_YEAR,
            total_consumption: month_readings.iter().map(|r| r.consumption).sum(),
            highest_month: highest,
            lowest_month: lowest.unwrap_or_default(),
        }
    }
}

/// Yearly report for one building or the whole fleet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YearlyReport {
    pub building: String,
    pub date: NaiveDate,
    pub today_consumption: f64,
    pub daily_average: f64,
    pub monthly_average: f64,
    pub yearly_average: f64,
    pub highest_month: MonthMark,
    pub lowest_month: MonthMark,
    pub buildings: BTreeMap<String, BuildingYear>,
}

impl YearlyReport {
    pub fn for_building(building: impl Into<String>, date: NaiveDate, data: BuildingYear) -> Self {
        let building = building.into();
        Self {
            building: building.clone(),
            date,
            today_consumption: data.today_consumption,
            daily_average: data.daily_average,
            monthly_average: data.monthly_average,
            yearly_average: data.yearly_average,
            highest_month: data.highest_month.clone(),
            lowest_month: data.lowest_month.clone(),
            buildings: BTreeMap::from([(building, data)]),
        }
    }

    /// Sum averages across buildings and pick the extreme months fleet-wide
    pub fn for_fleet(date: NaiveDate, buildings: BTreeMap<String, BuildingYear>) -> Self {
        let mut highest = MonthMark::default();
        let mut lowest: Option<MonthMark> = None;
        for (name, data) in &buildings {
            if data.highest_month.value > highest.value {
                highest = MonthMark {
                    building: Some(name.clone()),
                    ..data.highest_month.clone()
                };
            }
            let candidate = data.lowest_month.value;
            if candidate > 0.0 && lowest.as_ref().map_or(true, |l| candidate < l.value) {
                lowest = Some(MonthMark {
                    building: Some(name.clone()),
                    ..data.lowest_month.clone()
                });
            }
        }

        Self {
            building: ALL_BUILDINGS.to_string(),
            date,
            today_consumption: buildings.values().map(|b| b.today_consumption).sum(),
            daily_average: buildings.values().map(|b| b.daily_average).sum(),
            monthly_average: buildings.values().map(|b| b.monthly_average).sum(),
            yearly_average: buildings.values().map(|b| b.yearly_average).sum(),
            highest_month: highest,
            lowest_month: lowest.unwrap_or_default(),
            buildings,
        }
    }
}
