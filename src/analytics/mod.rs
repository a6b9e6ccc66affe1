//! Dashboard analytics
//!
//! Pure computations behind every dashboard view. Nothing here performs
//! I/O; callers fetch readings and hand them in.

pub mod aggregate;
pub mod alerts;
pub mod calendar;
pub mod classify;
pub mod compare;
pub mod map;
pub mod report;
pub mod stats;
pub mod types;

pub use aggregate::{average_series, dataset_stats, day_indexed_average, Dataset};
pub use alerts::{
    classify_severity, AlertList, AlertQuery, AlertStats, AlertSummary, AnalyzeRequest,
    AnalyzeResponse, StatusKind, StatusUpdate,
};
pub use calendar::{shift_month, CalendarDay, CalendarMonth};
pub use classify::{classify, ConsumptionLevel};
pub use compare::PeriodComparison;
pub use map::{BuildingMap, MapBuilding};
pub use report::{
    BuildingDay, BuildingMonth, BuildingYear, DailyReport, MonthlySummary, YearlyReport,
};
pub use stats::{
    co2_pounds, compare_to_average, cost, format_change, format_cost, format_energy, pct_change,
    AverageComparison, SeriesStats,
};
pub use types::{
    AnomalyAlert, AvailableData, DailyReading, DayConsumption, DetectionMethod, MonthlyReading,
    PeriodStats, Severity, ALL_BUILDINGS,
};
