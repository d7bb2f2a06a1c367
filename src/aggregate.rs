use crate::error::{PipelineError, Result};
use crate::structs::{CleanedTable, Season, WeatherRecord};
use chrono::NaiveDate;
use log::debug;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A calendar month of a specific year, the key of monthly buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(record: &WeatherRecord) -> Self {
        Self {
            year: record.year,
            month: record.month,
        }
    }

    /// Last calendar day of the month.
    pub fn period_end(&self) -> Option<NaiveDate> {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)?.pred_opt()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Descriptive statistics of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnStats {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation (divides by N).
    pub std_dev: f64,
}

impl ColumnStats {
    /// Computes the statistics of `values`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InsufficientData` for an empty column.
    pub fn from_values(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(PipelineError::InsufficientData(
                "cannot compute statistics of an empty column".to_string(),
            ));
        }
        let count = values.len();
        let sum = values.iter().sum::<f64>();
        let mean = sum / count as f64;
        let min = values.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;

        Ok(Self {
            count,
            sum,
            mean,
            min,
            max,
            std_dev: variance.sqrt(),
        })
    }
}

/// Whole-table statistics for both measures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlobalStats {
    pub temperature: ColumnStats,
    pub precipitation: ColumnStats,
}

impl GlobalStats {
    /// # Errors
    ///
    /// Returns `PipelineError::InsufficientData` if the table is empty.
    pub fn compute(table: &CleanedTable) -> Result<Self> {
        if table.is_empty() {
            return Err(PipelineError::InsufficientData(
                "cleaned table has no rows".to_string(),
            ));
        }
        let temps: Vec<f64> = table.temperatures().collect();
        let precips: Vec<f64> = table.precipitations().collect();
        Ok(Self {
            temperature: ColumnStats::from_values(&temps)?,
            precipitation: ColumnStats::from_values(&precips)?,
        })
    }
}

/// Reduction of one bucket: temperature mean/min/max, precipitation total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketStats {
    pub count: usize,
    pub mean_temperature: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub total_precipitation: f64,
}

/// Reduction of one season: temperature mean, precipitation total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeasonStats {
    pub count: usize,
    pub mean_temperature: f64,
    pub total_precipitation: f64,
}

/// Running totals for a bucket, fed records in table order.
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    count: usize,
    temp_sum: f64,
    temp_min: f64,
    temp_max: f64,
    precip_sum: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            count: 0,
            temp_sum: 0.0,
            temp_min: f64::INFINITY,
            temp_max: f64::NEG_INFINITY,
            precip_sum: 0.0,
        }
    }
}

impl Accumulator {
    fn push(&mut self, record: &WeatherRecord) {
        self.count += 1;
        self.temp_sum += record.temperature;
        self.temp_min = self.temp_min.min(record.temperature);
        self.temp_max = self.temp_max.max(record.temperature);
        self.precip_sum += record.precipitation;
    }

    fn mean_temperature(&self) -> f64 {
        self.temp_sum / self.count as f64
    }

    fn bucket(&self) -> BucketStats {
        BucketStats {
            count: self.count,
            mean_temperature: self.mean_temperature(),
            min_temperature: self.temp_min,
            max_temperature: self.temp_max,
            total_precipitation: self.precip_sum,
        }
    }

    fn season(&self) -> SeasonStats {
        SeasonStats {
            count: self.count,
            mean_temperature: self.mean_temperature(),
            total_precipitation: self.precip_sum,
        }
    }
}

fn accumulate<K, F>(table: &CleanedTable, key: F) -> BTreeMap<K, Accumulator>
where
    K: Ord,
    F: Fn(&WeatherRecord) -> K,
{
    let mut groups: BTreeMap<K, Accumulator> = BTreeMap::new();
    for record in &table.records {
        groups.entry(key(record)).or_default().push(record);
    }
    groups
}

fn buckets<K, F>(table: &CleanedTable, key: F) -> BTreeMap<K, BucketStats>
where
    K: Ord,
    F: Fn(&WeatherRecord) -> K,
{
    accumulate(table, key)
        .into_iter()
        .map(|(k, acc)| (k, acc.bucket()))
        .collect()
}

/// One bucket per calendar date present in the table.
pub fn daily_buckets(table: &CleanedTable) -> BTreeMap<NaiveDate, BucketStats> {
    buckets(table, |r| r.date)
}

/// One bucket per (year, month) present in the table.
pub fn monthly_buckets(table: &CleanedTable) -> BTreeMap<YearMonth, BucketStats> {
    buckets(table, YearMonth::of)
}

pub fn yearly_buckets(table: &CleanedTable) -> BTreeMap<i32, BucketStats> {
    buckets(table, |r| r.year)
}

/// Merges the same calendar month across all years.
pub fn calendar_month_buckets(table: &CleanedTable) -> BTreeMap<u32, BucketStats> {
    buckets(table, |r| r.month)
}

pub fn season_buckets(table: &CleanedTable) -> BTreeMap<Season, SeasonStats> {
    accumulate(table, |r| r.season)
        .into_iter()
        .map(|(k, acc)| (k, acc.season()))
        .collect()
}

/// Everything derived from a cleaned table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregates {
    pub global: GlobalStats,
    pub daily: BTreeMap<NaiveDate, BucketStats>,
    pub monthly: BTreeMap<YearMonth, BucketStats>,
    pub yearly: BTreeMap<i32, BucketStats>,
    pub by_calendar_month: BTreeMap<u32, BucketStats>,
    pub by_season: BTreeMap<Season, SeasonStats>,
}

/// Computes global statistics and every bucket granularity.
///
/// The reductions are independent and run on the rayon pool; each one
/// folds records in table order, so the result does not depend on
/// scheduling.
///
/// # Errors
///
/// Returns `PipelineError::InsufficientData` if the table is empty.
pub fn aggregate(table: &CleanedTable) -> Result<Aggregates> {
    let (global, ((daily, monthly), (yearly, (by_calendar_month, by_season)))) = rayon::join(
        || GlobalStats::compute(table),
        || {
            rayon::join(
                || rayon::join(|| daily_buckets(table), || monthly_buckets(table)),
                || {
                    rayon::join(
                        || yearly_buckets(table),
                        || rayon::join(|| calendar_month_buckets(table), || season_buckets(table)),
                    )
                },
            )
        },
    );
    let global = global?;

    debug!(
        "Aggregated {} records: {} days, {} months, {} years, {} calendar months, {} seasons",
        table.len(),
        daily.len(),
        monthly.len(),
        yearly.len(),
        by_calendar_month.len(),
        by_season.len()
    );

    Ok(Aggregates {
        global,
        daily,
        monthly,
        yearly,
        by_calendar_month,
        by_season,
    })
}
