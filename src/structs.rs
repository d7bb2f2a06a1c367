use chrono::NaiveDate;
use csv::StringRecord;
use log::{Level, Log, Metadata, Record as LogRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Simple logger implementation: warnings and errors go to stderr,
/// everything else to stdout.
pub struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &LogRecord) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Error | Level::Warn => eprintln!("[{}] {}", record.level(), record.args()),
            _ => println!("[{}] {}", record.level(), record.args()),
        }
    }

    fn flush(&self) {}
}

/// Raw delimited table: a header row plus untyped rows. Columns are only
/// addressed by name at this stage.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<StringRecord>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the column with the given header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell at (`row`, `column`); cells missing from a short row read as `None`.
    pub fn value(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(column))
    }
}

/// Header names of the three columns the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub date: String,
    pub temperature: String,
    pub precipitation: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            date: "Date.Full".to_string(),
            temperature: "Data.Temperature.Avg Temp".to_string(),
            precipitation: "Data.Precipitation".to_string(),
        }
    }
}

/// Configuration for a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub columns: ColumnConfig,
    pub delimiter: u8,
    pub render_charts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/weather.csv"),
            output_dir: PathBuf::from("output"),
            columns: ColumnConfig::default(),
            delimiter: b',',
            render_charts: true,
        }
    }
}

/// Meteorological season of the northern hemisphere calendar.
///
/// Variants are declared in calendar order, which is also their sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    /// Maps a calendar month (1-12) to its season: Dec-Feb winter, Mar-May
    /// spring, Jun-Aug summer, Sep-Nov autumn.
    pub fn from_month(month: u32) -> Season {
        debug_assert!((1..=12).contains(&month), "month out of range: {month}");
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cleaned daily observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub date: NaiveDate,
    pub temperature: f64,
    pub precipitation: f64,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub season: Season,
}

/// Cleaned records, sorted ascending by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedTable {
    pub records: Vec<WeatherRecord>,
}

impl CleanedTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn temperatures(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(|r| r.temperature)
    }

    pub fn precipitations(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(|r| r.precipitation)
    }
}

/// What the cleaning pass did to the raw rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub dropped_dates: usize,
    pub imputed_temperature: usize,
    pub imputed_precipitation: usize,
    pub temperature_fill: Option<f64>,
    pub precipitation_fill: Option<f64>,
}
