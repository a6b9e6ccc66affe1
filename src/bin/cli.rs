//! Wattboard CLI
//!
//! Command-line interface for the energy dashboard:
//! - Show summaries, reports, calendars, and comparisons
//! - Review and analyze anomaly alerts
//! - Validate and upload meter CSV files
//! - Generate a default config file

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use wattboard::analytics::{
    format_change, format_cost, format_energy, AlertSummary, AnalyzeRequest, BuildingMap,
    CalendarMonth, DailyReport, DetectionMethod, MonthlySummary, PeriodComparison, ALL_BUILDINGS,
};
use wattboard::client::UploadFile;
use wattboard::config::generate_default_config;
use wattboard::{
    Config, DashboardService, DashboardSettings, DateContext, EnergyApiClient, MeterCsv,
    ReportCache,
};

#[derive(Parser)]
#[command(name = "wattboard-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Building energy dashboard")]
#[command(long_about = "Wattboard summarizes per-building electricity use from the energy API.\nShow reports, compare periods, and review consumption alerts.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Energy API URL (overrides the config file)
    #[arg(long, global = true)]
    pub upstream_url: Option<String>,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List buildings with data
    Buildings,

    /// Monthly summary for a building or all buildings
    Summary {
        #[arg(short, long, default_value = ALL_BUILDINGS)]
        building: String,
        /// Month as YYYY-MM (default: current month)
        #[arg(short, long)]
        month: Option<String>,
        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
    },

    /// Daily report across buildings
    Daily {
        /// Date as YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        refresh: bool,
    },

    /// Calendar heatmap for a month
    Calendar {
        #[arg(short, long, default_value = ALL_BUILDINGS)]
        building: String,
        /// Month as YYYY-MM (default: current month)
        #[arg(short, long)]
        month: Option<String>,
    },

    /// Each building's consumption on a day against its monthly mean
    Map {
        /// Date as YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Recent alert summary
    Alerts {
        /// Window end date (default: today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Compare a day with the previous day, week, and month
    Compare {
        building: String,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Upload meter CSV files (at most two)
    Upload {
        files: Vec<PathBuf>,
        /// Validate only, don't send
        #[arg(long)]
        dry_run: bool,
    },

    /// Run anomaly detection for a building's month
    Analyze {
        building: String,
        /// Month as YYYY-MM
        #[arg(short, long)]
        month: String,
        /// Detection method: z_score, LOF, iqr, rolling_mean
        #[arg(long, default_value = "z_score")]
        method: DetectionMethod,
        #[arg(long, default_value = "3.0")]
        threshold: f64,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let dashboard = build_dashboard(&cli)?;
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::Buildings => {
            let buildings = dashboard
                .buildings()
                .await
                .context("Failed to list buildings")?;
            match cli.format {
                OutputFormat::Json => print_json(&buildings)?,
                OutputFormat::Table => {
                    for building in &buildings {
                        println!("{}", building);
                    }
                    println!("\n{} buildings", buildings.len());
                }
            }
        }

        Commands::Summary {
            building,
            month,
            refresh,
        } => {
            let (year, month) = parse_month(month.as_deref(), today)?;
            let summary = dashboard
                .monthly_summary(&building, year, month, refresh)
                .await
                .with_context(|| format!("Failed to load summary for {}", building))?;
            match cli.format {
                OutputFormat::Json => print_json(&summary)?,
                OutputFormat::Table => print_summary(&summary),
            }
        }

        Commands::Daily { date, refresh } => {
            let date = date.unwrap_or(today);
            let report = dashboard
                .daily_report(date, refresh)
                .await
                .context("Failed to load daily report")?;
            match cli.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Table => print_daily(&report),
            }
        }

        Commands::Calendar { building, month } => {
            let (year, month) = parse_month(month.as_deref(), today)?;
            let calendar = dashboard
                .calendar(&building, year, month)
                .await
                .context("Failed to load calendar")?;
            match cli.format {
                OutputFormat::Json => print_json(&calendar)?,
                OutputFormat::Table => print_calendar(&calendar),
            }
        }

        Commands::Map { date } => {
            let map = dashboard
                .building_map(date.unwrap_or(today))
                .await
                .context("Failed to load building map")?;
            match cli.format {
                OutputFormat::Json => print_json(&map)?,
                OutputFormat::Table => print_map(&map),
            }
        }

        Commands::Alerts { as_of } => {
            let summary = dashboard
                .alert_summary(as_of.unwrap_or(today))
                .await
                .context("Failed to load alerts")?;
            match cli.format {
                OutputFormat::Json => print_json(&summary)?,
                OutputFormat::Table => print_alerts(&summary),
            }
        }

        Commands::Compare { building, date } => {
            let comparison = dashboard
                .comparison(&building, date.unwrap_or(today))
                .await
                .with_context(|| format!("Failed to compare {}", building))?;
            match cli.format {
                OutputFormat::Json => print_json(&comparison)?,
                OutputFormat::Table => print_comparison(&building, &comparison),
            }
        }

        Commands::Upload { files, dry_run } => {
            let uploads = files
                .iter()
                .map(|path| read_upload(path))
                .collect::<Result<Vec<_>>>()?;

            let parsed = if dry_run {
                dashboard.validate_upload(&uploads)?
            } else {
                let (response, parsed) = dashboard.upload(uploads).await.context("Upload failed")?;
                println!("{}", response.message);
                parsed
            };

            for (path, meter) in files.iter().zip(&parsed) {
                print_meter(path, meter);
            }
            if dry_run {
                println!("\nDry run - {} file(s) valid, nothing sent", parsed.len());
            }
        }

        Commands::Analyze {
            building,
            month,
            method,
            threshold,
        } => {
            let (year, month) = parse_month(Some(&month), today)?;
            let request = AnalyzeRequest {
                building,
                year,
                month,
                method,
                threshold,
            };
            let result = dashboard
                .analyze(&request)
                .await
                .context("Anomaly analysis failed")?;
            match cli.format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Table => {
                    println!(
                        "Found {} anomalies ({} new): {} critical, {} error, {} warning",
                        result.count, result.new_count, result.critical, result.error, result.warning
                    );
                    for alert in &result.anomalies {
                        println!(
                            "  {}  {:<10} {:>12}  z={:.2}",
                            alert.date,
                            alert.severity,
                            format_energy(alert.consumption),
                            alert.z_score
                        );
                    }
                }
            }
        }

        Commands::Config { output } => write_config(output.as_deref())?,
    }

    Ok(())
}

/// Build a dashboard against the configured upstream with an in-memory cache
fn build_dashboard(cli: &Cli) -> Result<DashboardService> {
    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.upstream_url {
        config.upstream.url = url.clone();
    }

    let client = EnergyApiClient::new(config.upstream.client_config())
        .context("Failed to create energy API client")?;
    let cache = Arc::new(ReportCache::in_memory().context("Failed to open cache")?);

    Ok(DashboardService::new(
        Arc::new(client),
        cache,
        DateContext::new(Utc::now().date_naive()),
        DashboardSettings::from_config(&config),
    ))
}

fn write_config(output: Option<&Path>) -> Result<()> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {:?}", path))?;
            println!("Config written to {:?}", path);
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// Parse `YYYY-MM`, defaulting to the month of `today`
fn parse_month(raw: Option<&str>, today: NaiveDate) -> Result<(i32, u32)> {
    let Some(raw) = raw else {
        return Ok((today.year(), today.month()));
    };
    let (year, month) = raw
        .split_once('-')
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", raw))?;
    let year: i32 = year
        .parse()
        .with_context(|| format!("Invalid year in '{}'", raw))?;
    let month: u32 = month
        .parse()
        .with_context(|| format!("Invalid month in '{}'", raw))?;
    if !(1..=12).contains(&month) {
        bail!("Month must be between 1 and 12, got {}", month);
    }
    Ok((year, month))
}

fn read_upload(path: &Path) -> Result<UploadFile> {
    let contents = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload.csv".to_string());
    Ok(UploadFile {
        file_name,
        contents,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_summary(summary: &MonthlySummary) {
    println!("{} - {}-{:02}", summary.building, summary.year, summary.month);
    println!("{}", "-".repeat(44));
    println!(
        "{:<22} {:>12}  {}",
        "Total usage",
        format_energy(summary.total_usage),
        format_change(summary.total_usage_change)
    );
    println!(
        "{:<22} {:>12}  {}",
        "Cost",
        format_cost(summary.cost),
        format_change(summary.cost_change)
    );
    println!(
        "{:<22} {:>12}",
        "Average daily usage",
        format_energy(summary.average_daily_usage)
    );
    println!(
        "{:<22} {:>12}  {}",
        "Peak day",
        format_energy(summary.peak_day.usage),
        summary.peak_day.date
    );
    println!(
        "{:<22} {:>12}  {}",
        "Lowest day",
        format_energy(summary.lowest_day.usage),
        summary.lowest_day.date
    );
    if let Some(top) = &summary.top_change {
        println!(
            "{:<22} {:>12}  {}",
            "Top change",
            top.building,
            format_change(top.percent)
        );
    }

    if summary.buildings.len() > 1 {
        println!();
        println!("{:<24} | {:>12} | {:>8}", "Building", "Usage", "Change");
        println!("{}", "-".repeat(50));
        for (name, data) in &summary.buildings {
            println!(
                "{:<24} | {:>12} | {:>8}",
                name,
                format_energy(data.total),
                format_change(data.percent_change)
            );
        }
    }
}

fn print_daily(report: &DailyReport) {
    let direction = if report.comparison.is_above { "above" } else { "below" };
    println!("Daily report for {}", report.date);
    println!(
        "Today: {}  ({:.1}% {} the daily average of {})",
        format_energy(report.today_consumption),
        report.comparison.percent,
        direction,
        format_energy(report.daily_average)
    );
    println!("CO2: {:.0} lb", report.co2_pounds);
    println!();
    println!("{:<24} | {:>12} | {:>12}", "Building", "Today", "Average");
    println!("{}", "-".repeat(54));
    for (name, day) in &report.buildings {
        println!(
            "{:<24} | {:>12} | {:>12}",
            name,
            format_energy(day.today_consumption),
            format_energy(day.daily_average)
        );
    }
}

fn print_calendar(calendar: &CalendarMonth) {
    println!(
        "{} - {} {}  (average {})",
        calendar.building,
        calendar.month_name,
        calendar.year,
        format_energy(calendar.average)
    );
    println!("{}", "-".repeat(50));
    for day in &calendar.days {
        let usage = day
            .consumption
            .map(format_energy)
            .unwrap_or_else(|| "-".to_string());
        let cost = day.cost.map(format_cost).unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {:>12}  {:>10}  {}",
            day.date.format("%a %d"),
            usage,
            cost,
            day.level
        );
    }
}

fn print_map(map: &BuildingMap) {
    println!("Buildings on {}", map.date);
    println!();
    println!(
        "{:<24} | {:>12} | {:>12} | {:<9}",
        "Building", "Today", "Month mean", "Level"
    );
    println!("{}", "-".repeat(66));
    for marker in &map.buildings {
        let today = marker
            .consumption
            .map(format_energy)
            .unwrap_or_else(|| "no data".to_string());
        let flag = if marker.above_average { "  above" } else { "" };
        println!(
            "{:<24} | {:>12} | {:>12} | {:<9}{}",
            marker.building,
            today,
            format_energy(marker.average),
            marker.level.as_str(),
            flag
        );
    }
}

fn print_alerts(summary: &AlertSummary) {
    println!(
        "Alerts in the {} days to {}: {} total, {} critical, {} warning",
        summary.window_days, summary.as_of, summary.total, summary.critical, summary.warning
    );
    if summary.recent.is_empty() {
        println!("No recent alerts");
        return;
    }
    println!();
    println!("{:<12} | {:<24} | {:<9} | {:>12}", "Date", "Building", "Severity", "Usage");
    println!("{}", "-".repeat(66));
    for alert in &summary.recent {
        println!(
            "{:<12} | {:<24} | {:<9} | {:>12}",
            alert.date.to_string(),
            alert.building,
            alert.severity,
            format_energy(alert.consumption)
        );
    }
}

fn print_comparison(building: &str, cmp: &PeriodComparison) {
    let date = cmp
        .date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!("{} on {}: {}", building, date, format_energy(cmp.current));
    println!("{}", "-".repeat(44));
    let rows = [
        ("Previous day", cmp.previous_day, cmp.vs_previous_day),
        ("Weekly average", cmp.weekly_average, cmp.vs_weekly),
        ("Monthly average", cmp.monthly_average, cmp.vs_monthly),
    ];
    for (label, value, change) in rows {
        println!("{:<18} {:>12}  {}", label, format_energy(value), format_change(change));
    }
}

fn print_meter(path: &Path, meter: &MeterCsv) {
    println!(
        "{}: {} {} - {} days, {}",
        path.display(),
        meter.building.as_deref().unwrap_or("(unknown building)"),
        meter.month_name,
        meter.readings.len(),
        format_energy(meter.total())
    );
}
