//! Day-bucket classification
//!
//! Buckets a day's consumption relative to the monthly average, as used
//! for the calendar heatmap colors.

use serde::{Deserialize, Serialize};

/// Relative consumption bucket for one day
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ConsumptionLevel {
    /// More than 20% below average
    VeryLow,
    /// Up to 20% below average
    Low,
    /// At or up to 20% above average
    Medium,
    /// 20% or more above average
    High,
    /// No meaningful average to compare against
    Neutral,
}

impl ConsumptionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumptionLevel::VeryLow => "very-low",
            ConsumptionLevel::Low => "low",
            ConsumptionLevel::Medium => "medium",
            ConsumptionLevel::High => "high",
            ConsumptionLevel::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for ConsumptionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boundary between the low/medium and very-low/high buckets
const BAND: f64 = 0.20;

/// Classify `consumption` against `monthly_avg`
pub fn classify(consumption: f64, monthly_avg: f64) -> ConsumptionLevel {
    if monthly_avg == 0.0 || !monthly_avg.is_finite() || !consumption.is_finite() {
        return ConsumptionLevel::Neutral;
    }

    let ratio = (consumption - monthly_avg) / monthly_avg;
    if ratio < -BAND {
        ConsumptionLevel::VeryLow
    } else if ratio < 0.0 {
        ConsumptionLevel::Low
    } else if ratio < BAND {
        ConsumptionLevel::Medium
    } else {
        ConsumptionLevel::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets() {
        assert_eq!(classify(70.0, 100.0), ConsumptionLevel::VeryLow);
        assert_eq!(classify(80.0, 100.0), ConsumptionLevel::Low);
        assert_eq!(classify(99.0, 100.0), ConsumptionLevel::Low);
        assert_eq!(classify(100.0, 100.0), ConsumptionLevel::Medium);
        assert_eq!(classify(119.0, 100.0), ConsumptionLevel::Medium);
        assert_eq!(classify(120.0, 100.0), ConsumptionLevel::High);
        assert_eq!(classify(500.0, 100.0), ConsumptionLevel::High);
    }

    #[test]
    fn test_neutral_cases() {
        assert_eq!(classify(50.0, 0.0), ConsumptionLevel::Neutral);
        assert_eq!(classify(f64::NAN, 10.0), ConsumptionLevel::Neutral);
        assert_eq!(classify(10.0, f64::INFINITY), ConsumptionLevel::Neutral);
    }

    #[test]
    fn test_serialized_labels() {
        assert_eq!(
            serde_json::to_string(&ConsumptionLevel::VeryLow).unwrap(),
            "\"very-low\""
        );
        assert_eq!(ConsumptionLevel::High.to_string(), "high");
    }
}
