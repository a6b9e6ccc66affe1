//! Meter CSV parsing
//!
//! Reads the wide meter export format the energy API ingests:
//!
//! ```text
//! Group,Resource,3/1/2024,3/2/2024,...
//! Campus,Library,412.5,398.0,...
//! ```
//!
//! The first data row holds one consumption value per date column. Parsing
//! locally lets the CLI validate a file before uploading it.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::analytics::types::month_name;
use crate::analytics::DailyReading;

/// Columns preceding the date columns
const LEADING_COLUMNS: usize = 2;

/// Date formats accepted in column headers
const DATE_FORMATS: [&str; 3] = ["%m/%d/%Y", "%m/%d/%y", "%Y-%m-%d"];

/// Errors that can occur while parsing a meter CSV
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No date columns found")]
    NoDateColumns,

    #[error("No data row found")]
    NoDataRow,

    #[error("Could not parse date column: {0}")]
    InvalidDate(String),

    #[error("Invalid consumption value '{value}' for {column}")]
    InvalidValue { column: String, value: String },

    #[error("No valid consumption data found in the file.")]
    NoConsumption,
}

/// A parsed meter export
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MeterCsv {
    pub group: Option<String>,
    /// Building name from the Resource column
    pub building: Option<String>,
    /// Month name of the first date column
    pub month_name: String,
    pub readings: Vec<DailyReading>,
}

impl MeterCsv {
    /// Parse a meter export from any reader
    pub fn parse<R: Read>(reader: R) -> Result<Self, ImportError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        if headers.len() <= LEADING_COLUMNS {
            return Err(ImportError::NoDateColumns);
        }

        let dates = headers
            .iter()
            .skip(LEADING_COLUMNS)
            .map(|h| parse_date(h).ok_or_else(|| ImportError::InvalidDate(h.trim().to_string())))
            .collect::<Result<Vec<NaiveDate>, _>>()?;

        let record = reader.records().next().ok_or(ImportError::NoDataRow)??;

        let mut readings = Vec::with_capacity(dates.len());
        for (i, date) in dates.iter().enumerate() {
            let raw = record.get(i + LEADING_COLUMNS).unwrap_or("");
            match parse_optional_f64(raw) {
                Some(consumption) => readings.push(DailyReading::new(*date, consumption)),
                None if raw.trim().is_empty() => {}
                None => {
                    return Err(ImportError::InvalidValue {
                        column: headers.get(i + LEADING_COLUMNS).unwrap_or("").to_string(),
                        value: raw.trim().to_string(),
                    })
                }
            }
        }

        if !readings.iter().any(|r| r.consumption != 0.0) {
            return Err(ImportError::NoConsumption);
        }

        Ok(Self {
            group: record.get(0).and_then(parse_optional_string),
            building: record.get(1).and_then(parse_optional_string),
            month_name: month_name(dates[0].month()).to_string(),
            readings,
        })
    }

    /// Parse a meter export from a file
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::parse(file)
    }

    /// Total consumption across all readings
    pub fn total(&self) -> f64 {
        self.readings.iter().map(|r| r.consumption).sum()
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_optional_f64(s: &str) -> Option<f64> {
    if s.trim().is_empty() {
        None
    } else {
        s.trim().parse().ok()
    }
}

fn parse_optional_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
