use crate::aggregate::{Aggregates, aggregate};
use crate::error::{PipelineError, Result, Stage};
use crate::extract::read_table;
use crate::structs::{CleanedTable, CleaningReport, ColumnConfig, RawTable, Season, WeatherRecord};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use log::{debug, info};
use std::path::Path;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const NULL_TOKENS: &[&str] = &["", "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None", "-"];

/// Output of a full in-memory run: the cleaned table, what cleaning did,
/// and every aggregate derived from the table.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub table: CleanedTable,
    pub report: CleaningReport,
    pub aggregates: Aggregates,
}

/// Loads, cleans and aggregates the table at `file_path`.
///
/// Nothing is written to disk; exporting is a separate step so a failure
/// here never leaves partial output behind.
///
/// # Errors
///
/// Every error is attributed to the stage that raised it (load, clean or
/// aggregate), see [`PipelineError::at`]. Unreadable files, malformed
/// content and missing required columns are load errors.
pub fn process_data(file_path: &Path, columns: &ColumnConfig, delimiter: u8) -> Result<Analysis> {
    let raw = read_table(file_path, delimiter).map_err(|e| e.at(Stage::Load))?;
    // A missing required column is a property of the file, not of its rows.
    resolve_columns(&raw, columns).map_err(|e| e.at(Stage::Load))?;
    let (table, report) = clean_table(&raw, columns).map_err(|e| e.at(Stage::Clean))?;
    let aggregates = aggregate(&table).map_err(|e| e.at(Stage::Aggregate))?;
    Ok(Analysis {
        table,
        report,
        aggregates,
    })
}

/// Column positions of the required fields within a [`RawTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndices {
    pub date: usize,
    pub temperature: usize,
    pub precipitation: usize,
}

/// Resolves the configured header names against the table header.
///
/// # Errors
///
/// Returns `PipelineError::Schema` naming the first missing column.
pub fn resolve_columns(raw: &RawTable, columns: &ColumnConfig) -> Result<ColumnIndices> {
    let find = |name: &str| {
        raw.column_index(name).ok_or_else(|| PipelineError::Schema {
            column: name.to_string(),
            available: raw.headers.clone(),
        })
    };
    Ok(ColumnIndices {
        date: find(&columns.date)?,
        temperature: find(&columns.temperature)?,
        precipitation: find(&columns.precipitation)?,
    })
}

/// Turns a raw table into a [`CleanedTable`].
///
/// Rows whose date cannot be parsed are dropped and counted. Missing
/// temperature or precipitation values are replaced by the mean of the
/// observed values of the same column. Rows are then stably sorted by
/// date and the calendar fields and season are derived from the date.
///
/// # Errors
///
/// - `PipelineError::Schema` if a configured column is absent
/// - `PipelineError::InsufficientData` if a numeric column has missing
///   values but no observed value to take a mean from
pub fn clean_table(raw: &RawTable, columns: &ColumnConfig) -> Result<(CleanedTable, CleaningReport)> {
    let idx = resolve_columns(raw, columns)?;

    let mut dates = Vec::with_capacity(raw.len());
    let mut temps = Vec::with_capacity(raw.len());
    let mut precips = Vec::with_capacity(raw.len());
    let mut dropped_dates = 0;

    for row in 0..raw.len() {
        let Some(date) = raw.value(row, idx.date).and_then(parse_date) else {
            dropped_dates += 1;
            continue;
        };
        dates.push(date);
        temps.push(raw.value(row, idx.temperature).and_then(parse_number));
        precips.push(raw.value(row, idx.precipitation).and_then(parse_number));
    }

    if dropped_dates > 0 {
        info!(
            "Dropped {} of {} rows with unparseable '{}' values",
            dropped_dates,
            raw.len(),
            columns.date
        );
    }

    let (temps, imputed_temperature, temperature_fill) = impute_mean(temps, &columns.temperature)?;
    let (precips, imputed_precipitation, precipitation_fill) =
        impute_mean(precips, &columns.precipitation)?;

    let mut records: Vec<WeatherRecord> = dates
        .into_iter()
        .zip(temps)
        .zip(precips)
        .map(|((date, temperature), precipitation)| build_record(date, temperature, precipitation))
        .collect();
    // sort_by_key is stable: equal dates keep their input order
    records.sort_by_key(|r| r.date);

    let report = CleaningReport {
        total_rows: raw.len(),
        kept_rows: records.len(),
        dropped_dates,
        imputed_temperature,
        imputed_precipitation,
        temperature_fill,
        precipitation_fill,
    };
    info!("Kept {} of {} rows after cleaning", report.kept_rows, report.total_rows);
    debug!("Cleaning finished: {:?}", report);

    Ok((CleanedTable { records }, report))
}

fn build_record(date: NaiveDate, temperature: f64, precipitation: f64) -> WeatherRecord {
    let month = date.month();
    WeatherRecord {
        date,
        temperature,
        precipitation,
        year: date.year(),
        month,
        day: date.day(),
        season: Season::from_month(month),
    }
}

/// Replaces every missing value with the mean of the present ones.
///
/// The mean is taken over the present values in input order before any
/// value is filled. A column without missing values is returned untouched.
///
/// # Returns
///
/// The filled column, how many values were filled and the fill value.
fn impute_mean(values: Vec<Option<f64>>, column: &str) -> Result<(Vec<f64>, usize, Option<f64>)> {
    let missing = values.iter().filter(|v| v.is_none()).count();
    if missing == 0 {
        return Ok((values.into_iter().flatten().collect(), 0, None));
    }

    let present = values.len() - missing;
    if present == 0 {
        return Err(PipelineError::InsufficientData(format!(
            "column '{}' has no numeric values to impute {} missing entries from",
            column, missing
        )));
    }
    let mean = values.iter().flatten().sum::<f64>() / present as f64;

    info!(
        "Imputed {} missing '{}' values with column mean {:.4}",
        missing, column, mean
    );
    let filled = values.into_iter().map(|v| v.unwrap_or(mean)).collect();
    Ok((filled, missing, Some(mean)))
}

/// Parses a date cell permissively.
///
/// Accepts ISO dates, common slash/dot/compact layouts (slash dates are
/// month-first), month names, and date-times including RFC 3339; date-times
/// are reduced to their calendar date in their own local time.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Parses a numeric cell; null markers, unparseable text and non-finite
/// values read as missing.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if NULL_TOKENS.contains(&s) {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}
