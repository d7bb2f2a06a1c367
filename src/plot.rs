//! PNG charts of the daily and monthly buckets.
//!
//! The x axis is the bucket index; tick labels are mapped back to the
//! bucket's date or month.

use crate::aggregate::{BucketStats, YearMonth};
use crate::error::{PipelineError, Result};
use chrono::NaiveDate;
use log::debug;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

pub const DAILY_TEMPERATURE_FILE: &str = "daily_temperature_line.png";
pub const MONTHLY_PRECIPITATION_FILE: &str = "monthly_rainfall_bar.png";
pub const COMBINED_FILE: &str = "combined_temp_rain.png";

const LINE_COLOR: RGBColor = RGBColor(31, 119, 180);
const BAR_COLOR: RGBColor = RGBColor(44, 160, 44);

/// Whether charts carry text (titles, axis labels, legends).
///
/// Text needs the `ttf` feature; without it the plotted data is drawn and
/// every label is left blank.
pub fn renders_text() -> bool {
    cfg!(feature = "ttf")
}

/// Chart dimensions in pixels.
#[derive(Debug, Clone, Copy)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub combined_height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 500,
            combined_height: 800,
        }
    }
}

/// A labelled series ready for plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn points(&self) -> Vec<(f64, f64)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64, v))
            .collect()
    }

    fn label_at(&self, x: f64) -> String {
        let rounded = x.round();
        if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
            return String::new();
        }
        self.labels.get(rounded as usize).cloned().unwrap_or_default()
    }

    /// Value range padded by 10% of its span (or 1.0 for a flat series).
    fn value_range(&self, include_zero: bool) -> (f64, f64) {
        let mut lo = self.values.iter().copied().fold(f64::INFINITY, f64::min);
        let mut hi = self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if include_zero {
            lo = lo.min(0.0);
            hi = hi.max(0.0);
        }
        let pad = if hi > lo { (hi - lo) * 0.1 } else { 1.0 };
        let lo = if include_zero && lo >= 0.0 { 0.0 } else { lo - pad };
        (lo, hi + pad)
    }
}

/// Mean temperature per day.
pub fn daily_temperature_series(daily: &BTreeMap<NaiveDate, BucketStats>) -> Series {
    Series {
        labels: daily.keys().map(|d| d.format("%Y-%m-%d").to_string()).collect(),
        values: daily.values().map(|b| b.mean_temperature).collect(),
    }
}

/// Total precipitation per day.
pub fn daily_precipitation_series(daily: &BTreeMap<NaiveDate, BucketStats>) -> Series {
    Series {
        labels: daily.keys().map(|d| d.format("%Y-%m-%d").to_string()).collect(),
        values: daily.values().map(|b| b.total_precipitation).collect(),
    }
}

/// Total precipitation per month, labelled `YYYY-MM`.
pub fn monthly_precipitation_series(monthly: &BTreeMap<YearMonth, BucketStats>) -> Series {
    Series {
        labels: monthly.keys().map(|k| k.to_string()).collect(),
        values: monthly.values().map(|b| b.total_precipitation).collect(),
    }
}

fn x_range(series: &Series) -> std::ops::Range<f64> {
    -0.5..(series.len().max(1) as f64 - 0.5)
}

fn draw_line<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    series: &Series,
    title: &str,
    y_desc: &str,
) -> Result<()> {
    let (lo, hi) = series.value_range(false);
    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range(series), lo..hi)?;

    let fmt = |x: &f64| series.label_at(*x);
    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&fmt)
        .x_desc("Date")
        .y_desc(y_desc)
        .draw()?;

    chart
        .draw_series(LineSeries::new(series.points(), &LINE_COLOR))?
        .label(title)
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], LINE_COLOR));
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn draw_bars<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    series: &Series,
    title: &str,
    x_desc: &str,
    y_desc: &str,
) -> Result<()> {
    let (lo, hi) = series.value_range(true);
    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range(series), lo..hi)?;

    let fmt = |x: &f64| series.label_at(*x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(series.len().clamp(1, 12))
        .x_label_formatter(&fmt)
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()?;

    chart.draw_series(series.values.iter().enumerate().map(|(i, &v)| {
        let x = i as f64;
        Rectangle::new([(x - 0.4, 0.0), (x + 0.4, v)], BAR_COLOR.filled())
    }))?;
    Ok(())
}

fn ensure_data(series: &Series, chart: &str) -> Result<()> {
    if series.is_empty() {
        return Err(PipelineError::Chart(format!("no data to render for {chart}")));
    }
    Ok(())
}

/// Line chart of daily mean temperature.
pub fn render_daily_temperature(series: &Series, path: &Path, config: &ChartConfig) -> Result<()> {
    ensure_data(series, "daily temperature")?;
    let root = BitMapBackend::new(path, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE)?;
    draw_line(&root, series, "Daily Temperature Trend", "Temperature")?;
    root.present()?;
    debug!("Rendered daily temperature chart to {}", path.display());
    Ok(())
}

/// Bar chart of monthly precipitation totals.
pub fn render_monthly_precipitation(
    series: &Series,
    path: &Path,
    config: &ChartConfig,
) -> Result<()> {
    ensure_data(series, "monthly precipitation")?;
    let root = BitMapBackend::new(path, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE)?;
    draw_bars(
        &root,
        series,
        "Monthly Precipitation Totals",
        "Month",
        "Total Precipitation",
    )?;
    root.present()?;
    debug!("Rendered monthly precipitation chart to {}", path.display());
    Ok(())
}

/// Two stacked panels: daily mean temperature above daily precipitation.
pub fn render_combined(
    temperature: &Series,
    precipitation: &Series,
    path: &Path,
    config: &ChartConfig,
) -> Result<()> {
    ensure_data(temperature, "combined temperature")?;
    ensure_data(precipitation, "combined precipitation")?;
    let root =
        BitMapBackend::new(path, (config.width, config.combined_height)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 1));
    draw_line(&panels[0], temperature, "Temperature and Precipitation", "Temp")?;
    draw_bars(&panels[1], precipitation, "", "Date", "Precipitation")?;
    root.present()?;
    debug!("Rendered combined chart to {}", path.display());
    Ok(())
}
