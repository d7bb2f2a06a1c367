use clap::Parser;
use log::debug;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use weather_analyzer::report::{PREVIEW_MONTHS, format_month_preview, format_monthly_preview};
use weather_analyzer::{
    ChartConfig, ColumnConfig, PipelineConfig, PipelineError, SimpleLogger, export, process_data,
};

static LOGGER: SimpleLogger = SimpleLogger;

const CHART_TEXT_NOTE: &str = "Chart titles, axis labels and legends are only drawn when built \
with the 'ttf' feature (cargo build --features ttf), which needs system font libraries.";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, after_help = CHART_TEXT_NOTE)]
struct Args {
    /// Input delimited file with daily weather records
    #[arg(short, long, default_value = "data/weather.csv")]
    input_file: PathBuf,

    /// Output directory (created if missing)
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Header of the date column
    #[arg(long, default_value = "Date.Full")]
    date_column: String,

    /// Header of the average temperature column
    #[arg(long, default_value = "Data.Temperature.Avg Temp")]
    temperature_column: String,

    /// Header of the precipitation column
    #[arg(long, default_value = "Data.Precipitation")]
    precipitation_column: String,

    /// Field delimiter of the input (and of the cleaned export)
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Skip chart rendering (charts have no text unless built with the 'ttf' feature)
    #[arg(long, default_value_t = false)]
    no_charts: bool,

    /// Log level for output
    #[arg(long, default_value_t = false)]
    debug: bool,
}

impl Args {
    fn into_config(self) -> Result<PipelineConfig, PipelineError> {
        if !self.delimiter.is_ascii() {
            return Err(PipelineError::Config(format!(
                "delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            )));
        }
        Ok(PipelineConfig {
            input_path: self.input_file,
            output_dir: self.output_dir,
            columns: ColumnConfig {
                date: self.date_column,
                temperature: self.temperature_column,
                precipitation: self.precipitation_column,
            },
            delimiter: self.delimiter as u8,
            render_charts: !self.no_charts,
        })
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), PipelineError> {
    let total_start = Instant::now();
    log::set_logger(&LOGGER).map_err(|e| PipelineError::Config(e.to_string()))?;

    let args = Args::parse();
    if args.debug {
        log::set_max_level(log::LevelFilter::Debug);
    } else {
        log::set_max_level(log::LevelFilter::Info);
    }
    let config = args.into_config()?;

    println!("Weather Analyzer! Daily Weather Data Pipeline");
    debug!(
        "Input file: {} | Output dir: {}",
        config.input_path.display(),
        config.output_dir.display()
    );
    debug!(
        "Columns: date='{}' temperature='{}' precipitation='{}'",
        config.columns.date, config.columns.temperature, config.columns.precipitation
    );

    println!("Starting data processing...");
    let processing_start = Instant::now();
    let analysis = process_data(&config.input_path, &config.columns, config.delimiter)?;
    let processing_time = processing_start.elapsed();
    println!(
        "Data processing completed in {:.2?} | Kept {} of {} records",
        processing_time, analysis.report.kept_rows, analysis.report.total_rows
    );

    let global = &analysis.aggregates.global;
    println!("\nOverall Statistics:");
    println!("temp_mean: {:.2}", global.temperature.mean);
    println!("temp_min: {:.2}", global.temperature.min);
    println!("temp_max: {:.2}", global.temperature.max);
    println!("temp_std: {:.2}", global.temperature.std_dev);
    println!("rain_mean: {:.2}", global.precipitation.mean);
    println!("rain_min: {:.2}", global.precipitation.min);
    println!("rain_max: {:.2}", global.precipitation.max);
    println!("rain_std: {:.2}", global.precipitation.std_dev);

    println!("\nMonthly statistics (first {} months):", PREVIEW_MONTHS);
    print!("{}", format_monthly_preview(&analysis.aggregates.monthly, PREVIEW_MONTHS));

    println!("\nGrouped by month:");
    print!("{}", format_month_preview(&analysis.aggregates.by_calendar_month, 12));

    println!("\nGrouped by season:");
    for (season, stats) in &analysis.aggregates.by_season {
        println!(
            "{:<7} mean temp {:>7.2} | total precipitation {:>9.2}",
            season, stats.mean_temperature, stats.total_precipitation
        );
    }

    println!("\nWriting output files to {}...", config.output_dir.display());
    let io_start = Instant::now();
    let written = export(&analysis, &config, &ChartConfig::default())?;
    let io_time = io_start.elapsed();
    println!("Wrote {} files in {:.2?}", written.len(), io_time);

    let total_time = total_start.elapsed();
    debug!(
        "Performance breakdown: Processing={:.1}%, IO={:.1}%",
        (processing_time.as_secs_f64() / total_time.as_secs_f64()) * 100.0,
        (io_time.as_secs_f64() / total_time.as_secs_f64()) * 100.0
    );
    println!("Pipeline completed successfully in {:.2?}", total_time);
    Ok(())
}
