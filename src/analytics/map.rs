//! Campus map
//!
//! Each building's consumption on one day next to its monthly statistics.
//! Buildings without a reading for the day are shown without a level.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::classify::{classify, ConsumptionLevel};
use super::types::PeriodStats;

/// One building's map marker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapBuilding {
    pub building: String,
    /// `None` when the day has no reading
    pub consumption: Option<f64>,
    /// Monthly mean, the reference for `level`
    pub average: f64,
    pub highest: f64,
    pub lowest: f64,
    pub median: f64,
    pub level: ConsumptionLevel,
    pub above_average: bool,
    /// Consumption relative to the busiest building, in 0..=1
    pub intensity: f64,
}

/// All buildings on the map for one day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildingMap {
    pub date: NaiveDate,
    pub max_consumption: f64,
    pub buildings: Vec<MapBuilding>,
}

impl BuildingMap {
    /// Build markers from each building's day reading and month statistics.
    ///
    /// A building whose data could not be fetched is passed as `None`. Zero
    /// consumption counts as no reading.
    pub fn build(date: NaiveDate, days: BTreeMap<String, Option<(f64, PeriodStats)>>) -> Self {
        let reading = |day: &Option<(f64, PeriodStats)>| {
            day.as_ref()
                .map(|(consumption, _)| *consumption)
                .filter(|c| c.is_finite() && *c > 0.0)
        };

        let max_consumption = days
            .values()
            .filter_map(reading)
            .fold(0.0_f64, f64::max);

        let buildings = days
            .iter()
            .map(|(building, day)| {
                let consumption = reading(day);
                let stats = day.as_ref().map(|(_, s)| s.clone()).unwrap_or_default();
                let (level, above_average, intensity) = match consumption {
                    Some(c) => (
                        classify(c, stats.mean),
                        stats.mean > 0.0 && c > stats.mean,
                        c / max_consumption,
                    ),
                    None => (ConsumptionLevel::Neutral, false, 0.0),
                };
                MapBuilding {
                    building: building.clone(),
                    consumption,
                    average: stats.mean,
                    highest: stats.highest,
                    lowest: stats.lowest,
                    median: stats.median,
                    level,
                    above_average,
                    intensity,
                }
            })
            .collect();

        Self {
            date,
            max_consumption,
            buildings,
        }
    }
}
