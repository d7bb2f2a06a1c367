use crate::error::{PipelineError, Result, Stage};
use crate::plot::{
    COMBINED_FILE, ChartConfig, DAILY_TEMPERATURE_FILE, MONTHLY_PRECIPITATION_FILE,
    daily_precipitation_series, daily_temperature_series, monthly_precipitation_series,
    render_combined, render_daily_temperature, render_monthly_precipitation, renders_text,
};
use crate::report::format_summary;
use crate::structs::{ColumnConfig, PipelineConfig, WeatherRecord};
use crate::transform::Analysis;
use arrow_array::{Date32Array, Float64Array, Int32Array, RecordBatch, StringArray, UInt32Array};
use arrow_schema::{DataType, Field, Schema};
use chrono::{Datelike, NaiveDate};
use csv::WriterBuilder;
use log::{debug, warn};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

pub const CLEANED_CSV_FILE: &str = "weather_cleaned.csv";
pub const CLEANED_PARQUET_FILE: &str = "weather_cleaned.parquet";
pub const AGGREGATES_JSON_FILE: &str = "aggregates.json";
pub const SUMMARY_FILE: &str = "summary_report.txt";

/// Writes the cleaned table as a delimited file.
///
/// The header is the configured date, temperature and precipitation column
/// names followed by `Year`, `Month`, `Day` and `Season`. Dates are written
/// as `YYYY-MM-DD` and floats in their shortest round-trip form, so the
/// same table always produces the same bytes.
///
/// # Errors
/// Returns error if file cannot be created or written to.
pub fn write_cleaned_csv(
    records: &[WeatherRecord],
    columns: &ColumnConfig,
    delimiter: u8,
    output_path: &Path,
) -> Result<()> {
    let file = File::create(output_path)?;
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_writer(file);

    writer.write_record([
        columns.date.as_str(),
        columns.temperature.as_str(),
        columns.precipitation.as_str(),
        "Year",
        "Month",
        "Day",
        "Season",
    ])?;

    for record in records {
        writer.write_record(&[
            record.date.format("%Y-%m-%d").to_string(),
            record.temperature.to_string(),
            record.precipitation.to_string(),
            record.year.to_string(),
            record.month.to_string(),
            record.day.to_string(),
            record.season.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes any serializable value to a pretty-formatted JSON file.
///
/// # Errors
/// Returns error if file cannot be created or serialization fails.
pub fn write_json<T: Serialize + ?Sized>(value: &T, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Writes the cleaned table to a columnar Parquet file using Arrow format.
///
/// # Errors
/// Returns error if file cannot be created, schema is invalid, or Arrow operations fail.
pub fn write_cleaned_parquet(records: &[WeatherRecord], output_path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("date", DataType::Date32, false),
        Field::new("temperature", DataType::Float64, false),
        Field::new("precipitation", DataType::Float64, false),
        Field::new("year", DataType::Int32, false),
        Field::new("month", DataType::UInt32, false),
        Field::new("day", DataType::UInt32, false),
        Field::new("season", DataType::Utf8, false),
    ]));

    let dates = Date32Array::from(
        records
            .iter()
            .map(|r| days_since_epoch(r.date))
            .collect::<Vec<i32>>(),
    );
    let temperatures: Float64Array = records.iter().map(|r| r.temperature).collect();
    let precipitations: Float64Array = records.iter().map(|r| r.precipitation).collect();
    let years: Int32Array = records.iter().map(|r| r.year).collect();
    let months: UInt32Array = records.iter().map(|r| r.month).collect();
    let days: UInt32Array = records.iter().map(|r| r.day).collect();
    let seasons = StringArray::from_iter_values(records.iter().map(|r| r.season.as_str()));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(dates),
            Arc::new(temperatures),
            Arc::new(precipitations),
            Arc::new(years),
            Arc::new(months),
            Arc::new(days),
            Arc::new(seasons),
        ],
    )?;

    let file = File::create(output_path)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

/// Writes the text summary.
///
/// # Errors
/// Returns error if file cannot be created or written to.
pub fn write_summary(summary: &str, output_path: &Path) -> Result<()> {
    fs::write(output_path, summary)?;
    Ok(())
}

/// Writes every artifact of a run into `config.output_dir`.
///
/// Artifacts are first written into a hidden staging directory inside the
/// output directory and only moved into place once all of them succeeded;
/// a failure leaves the output directory without any new artifact.
///
/// # Returns
/// Paths of the published files, in write order.
///
/// # Errors
/// Any failure is reported as an export stage error.
pub fn export(
    analysis: &Analysis,
    config: &PipelineConfig,
    charts: &ChartConfig,
) -> Result<Vec<PathBuf>> {
    export_inner(analysis, config, charts).map_err(|e| e.at(Stage::Export))
}

fn export_inner(
    analysis: &Analysis,
    config: &PipelineConfig,
    charts: &ChartConfig,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&config.output_dir)?;
    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(&config.output_dir)?;
    let stage = |name: &str| staging.path().join(name);

    let records = &analysis.table.records;
    let aggregates = &analysis.aggregates;
    let mut written = Vec::new();

    write_cleaned_csv(records, &config.columns, config.delimiter, &stage(CLEANED_CSV_FILE))?;
    written.push(CLEANED_CSV_FILE);

    write_cleaned_parquet(records, &stage(CLEANED_PARQUET_FILE))?;
    written.push(CLEANED_PARQUET_FILE);

    write_json(aggregates, &stage(AGGREGATES_JSON_FILE))?;
    written.push(AGGREGATES_JSON_FILE);

    write_summary(
        &format_summary(aggregates, &analysis.report),
        &stage(SUMMARY_FILE),
    )?;
    written.push(SUMMARY_FILE);

    if config.render_charts {
        if !renders_text() {
            warn!("Built without the 'ttf' feature, charts will have no text");
        }
        let temperature = daily_temperature_series(&aggregates.daily);
        let daily_rain = daily_precipitation_series(&aggregates.daily);
        let monthly_rain = monthly_precipitation_series(&aggregates.monthly);

        render_daily_temperature(&temperature, &stage(DAILY_TEMPERATURE_FILE), charts)?;
        written.push(DAILY_TEMPERATURE_FILE);
        render_monthly_precipitation(&monthly_rain, &stage(MONTHLY_PRECIPITATION_FILE), charts)?;
        written.push(MONTHLY_PRECIPITATION_FILE);
        render_combined(&temperature, &daily_rain, &stage(COMBINED_FILE), charts)?;
        written.push(COMBINED_FILE);
    }

    publish(staging.path(), &config.output_dir, &written)
}

/// Moves staged artifacts from `staging` into `output_dir`.
///
/// All targets are checked before anything moves: a target that is a
/// directory aborts the publish. Existing files are set aside inside the
/// staging directory while their replacement moves in, and if any move
/// fails every target already touched is put back the way it was.
fn publish(staging: &Path, output_dir: &Path, names: &[&str]) -> Result<Vec<PathBuf>> {
    for name in names {
        let target = output_dir.join(name);
        if target.is_dir() {
            return Err(PipelineError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} exists and is a directory", target.display()),
            )));
        }
    }

    let backups = staging.join(".previous");
    fs::create_dir(&backups)?;
    let mut moved: Vec<(PathBuf, Option<PathBuf>)> = Vec::with_capacity(names.len());
    for name in names {
        let target = output_dir.join(name);
        match replace(&staging.join(name), &target, &backups.join(name)) {
            Ok(backup) => {
                debug!("  - {}", target.display());
                moved.push((target, backup));
            }
            Err(err) => {
                rollback(&moved);
                return Err(err.into());
            }
        }
    }
    Ok(moved.into_iter().map(|(target, _)| target).collect())
}

/// Moves `staged` onto `target`, parking a previous `target` at `backup`.
fn replace(staged: &Path, target: &Path, backup: &Path) -> io::Result<Option<PathBuf>> {
    let parked = if target.exists() {
        fs::rename(target, backup)?;
        Some(backup.to_path_buf())
    } else {
        None
    };
    if let Err(err) = fs::rename(staged, target) {
        if parked.is_some() {
            if let Err(restore) = fs::rename(backup, target) {
                warn!("Could not restore {}: {}", target.display(), restore);
            }
        }
        return Err(err);
    }
    Ok(parked)
}

fn rollback(moved: &[(PathBuf, Option<PathBuf>)]) {
    for (target, backup) in moved.iter().rev() {
        let restored = match backup {
            Some(previous) => fs::rename(previous, target),
            None => fs::remove_file(target),
        };
        if let Err(err) = restored {
            warn!("Could not roll back {}: {}", target.display(), err);
        }
    }
}
