//! Series Statistics
//!
//! Small arithmetic helpers shared by every dashboard view: percentage
//! change against a reference, summary statistics over a series with gaps,
//! cost and emissions conversion, and human-readable formatting.

use serde::{Deserialize, Serialize};

/// Percentage change of `current` relative to `reference`.
///
/// Returns `0.0` when the reference is zero so callers never see
/// infinities or NaN in comparison tiles.
pub fn pct_change(current: f64, reference: f64) -> f64 {
    if reference == 0.0 {
        return 0.0;
    }
    ((current - reference) / reference) * 100.0
}

/// Summary statistics over a series that may contain missing values
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SeriesStats {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub total: f64,
    pub median: f64,
    /// Number of valid values that contributed
    pub count: usize,
}

impl SeriesStats {
    /// Compute statistics over the present, finite values.
    ///
    /// All fields are zero when nothing valid remains.
    pub fn from_values(values: &[Option<f64>]) -> Self {
        let mut valid: Vec<f64> = values
            .iter()
            .filter_map(|v| *v)
            .filter(|v| v.is_finite())
            .collect();

        if valid.is_empty() {
            return Self::default();
        }

        valid.sort_by(|a, b| a.total_cmp(b));

        let count = valid.len();
        let total: f64 = valid.iter().sum();
        let median = if count % 2 == 0 {
            (valid[count / 2 - 1] + valid[count / 2]) / 2.0
        } else {
            valid[count / 2]
        };

        Self {
            average: total / count as f64,
            min: valid[0],
            max: valid[count - 1],
            total,
            median,
            count,
        }
    }

    /// Statistics over a dense series
    pub fn from_slice(values: &[f64]) -> Self {
        let wrapped: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
        Self::from_values(&wrapped)
    }
}

/// How a value relates to an average
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct AverageComparison {
    /// Magnitude of the difference, always non-negative for finite inputs
    pub percent: f64,
    pub is_above: bool,
}

/// Compare a value with its average as an unsigned percentage plus direction
pub fn compare_to_average(value: f64, average: f64) -> AverageComparison {
    if average == 0.0 {
        return AverageComparison::default();
    }
    let is_above = value > average;
    let percent = if is_above {
        (value / average - 1.0) * 100.0
    } else {
        (1.0 - value / average) * 100.0
    };
    AverageComparison { percent, is_above }
}

/// Cost of `kwh` at `rate` dollars per kWh
pub fn cost(kwh: f64, rate: f64) -> f64 {
    kwh * rate
}

/// Pounds of CO2 emitted for `kwh` at `factor` lb per kWh
pub fn co2_pounds(kwh: f64, factor: f64) -> f64 {
    kwh * factor
}

/// Format an energy amount with the largest fitting unit
pub fn format_energy(kwh: f64) -> String {
    let magnitude = kwh.abs();
    if magnitude >= 1e9 {
        format!("{:.2} TWh", kwh / 1e9)
    } else if magnitude >= 1e6 {
        format!("{:.2} GWh", kwh / 1e6)
    } else if magnitude >= 1e3 {
        format!("{:.2} MWh", kwh / 1e3)
    } else {
        format!("{:.2} kWh", kwh)
    }
}

/// Format a percentage change with an explicit sign
pub fn format_change(pct: f64) -> String {
    if pct >= 0.0 {
        format!("+{:.1}%", pct)
    } else {
        format!("{:.1}%", pct)
    }
}

/// Format a dollar amount
pub fn format_cost(dollars: f64) -> String {
    format!("${:.2}", dollars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_change() {
        assert_eq!(pct_change(150.0, 100.0), 50.0);
        assert_eq!(pct_change(50.0, 100.0), -50.0);
        assert_eq!(pct_change(42.0, 0.0), 0.0);
        assert_eq!(pct_change(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_series_stats_skips_missing() {
        let stats = SeriesStats::from_values(&[Some(4.0), None, Some(2.0), Some(f64::NAN), Some(6.0)]);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.total, 12.0);
        assert_eq!(stats.average, 4.0);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 6.0);
        assert_eq!(stats.median, 4.0);
    }

    #[test]
    fn test_series_stats_even_median() {
        let stats = SeriesStats::from_slice(&[1.0, 2.0, 3.0, 10.0]);
        assert_eq!(stats.median, 2.5);
    }

    #[test]
    fn test_series_stats_empty() {
        assert_eq!(SeriesStats::from_values(&[None, None]), SeriesStats::default());
        assert_eq!(SeriesStats::from_slice(&[]).count, 0);
    }

    #[test]
    fn test_compare_to_average() {
        let above = compare_to_average(120.0, 100.0);
        assert!(above.is_above);
        assert!((above.percent - 20.0).abs() < 1e-9);

        let below = compare_to_average(75.0, 100.0);
        assert!(!below.is_above);
        assert!((below.percent - 25.0).abs() < 1e-9);

        let equal = compare_to_average(100.0, 100.0);
        assert!(!equal.is_above);
        assert_eq!(equal.percent, 0.0);

        assert_eq!(compare_to_average(5.0, 0.0), AverageComparison::default());
    }

    #[test]
    fn test_cost_and_co2() {
        assert!((cost(1000.0, 0.11) - 110.0).abs() < 1e-9);
        assert!((co2_pounds(100.0, 0.81) - 81.0).abs() < 1e-9);
    }

    #[test]
    fn test_format_energy_units() {
        assert_eq!(format_energy(999.0), "999.00 kWh");
        assert_eq!(format_energy(1_500.0), "1.50 MWh");
        assert_eq!(format_energy(2_000_000.0), "2.00 GWh");
        assert_eq!(format_energy(3_250_000_000.0), "3.25 TWh");
    }

    #[test]
    fn test_format_change() {
        assert_eq!(format_change(12.345), "+12.3%");
        assert_eq!(format_change(-4.0), "-4.0%");
        assert_eq!(format_change(0.0), "+0.0%");
        assert_eq!(format_cost(110.0), "$110.00");
    }
}
