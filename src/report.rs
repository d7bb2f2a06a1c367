use crate::aggregate::{Aggregates, BucketStats, YearMonth};
use crate::structs::CleaningReport;
use std::collections::BTreeMap;

/// Number of calendar-month groups shown in the summary preview.
pub const PREVIEW_MONTHS: usize = 5;

/// Renders the human-readable summary report.
pub fn format_summary(aggregates: &Aggregates, cleaning: &CleaningReport) -> String {
    let mut out = String::from("# Weather Data Summary\n\n");
    out.push_str("This report describes temperature and precipitation patterns.\n\n");
    out.push_str(&format!(
        "Overall mean temperature: {:.2}\n",
        aggregates.global.temperature.mean
    ));
    out.push_str(&format!(
        "Overall mean precipitation: {:.2}\n",
        aggregates.global.precipitation.mean
    ));
    out.push_str(&format!(
        "Records analysed: {} ({} dropped for unparseable dates)\n\n",
        cleaning.kept_rows, cleaning.dropped_dates
    ));
    out.push_str("Monthly overview (first few months):\n");
    out.push_str(&format_month_preview(&aggregates.by_calendar_month, PREVIEW_MONTHS));
    out.push_str("\nFirst months on record:\n");
    out.push_str(&format_monthly_preview(&aggregates.monthly, PREVIEW_MONTHS));
    out
}

/// Tabulates the first `limit` calendar-month groups.
pub fn format_month_preview(by_month: &BTreeMap<u32, BucketStats>, limit: usize) -> String {
    let mut out = header_row("Month", 5);
    for (month, stats) in by_month.iter().take(limit) {
        out.push_str(&bucket_row(&month.to_string(), 5, stats));
    }
    out
}

/// Tabulates the first `limit` year-month buckets, each labelled with the
/// last day of its month.
pub fn format_monthly_preview(monthly: &BTreeMap<YearMonth, BucketStats>, limit: usize) -> String {
    let mut out = header_row("Period End", 10);
    for (period, stats) in monthly.iter().take(limit) {
        let label = match period.period_end() {
            Some(end) => end.format("%Y-%m-%d").to_string(),
            None => period.to_string(),
        };
        out.push_str(&bucket_row(&label, 10, stats));
    }
    out
}

fn header_row(label: &str, width: usize) -> String {
    format!(
        "{:>width$} {:>10} {:>10} {:>10} {:>14}\n",
        label, "Mean Temp", "Min Temp", "Max Temp", "Precipitation"
    )
}

fn bucket_row(label: &str, width: usize, stats: &BucketStats) -> String {
    format!(
        "{:>width$} {:>10.2} {:>10.2} {:>10.2} {:>14.2}\n",
        label,
        stats.mean_temperature,
        stats.min_temperature,
        stats.max_temperature,
        stats.total_precipitation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(mean: f64, precip: f64) -> BucketStats {
        BucketStats {
            count: 1,
            mean_temperature: mean,
            min_temperature: mean - 1.0,
            max_temperature: mean + 1.0,
            total_precipitation: precip,
        }
    }

    #[test]
    fn preview_is_limited_and_ordered() {
        let by_month: BTreeMap<u32, BucketStats> =
            (1..=12).map(|m| (m, bucket(m as f64, 0.5))).collect();
        let preview = format_month_preview(&by_month, 5);
        let lines: Vec<&str> = preview.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].contains("Mean Temp"));
        assert!(lines[1].trim_start().starts_with("1 "));
        assert!(lines[5].trim_start().starts_with("5 "));
        assert!(lines[5].contains("5.00"));
        assert!(lines[5].contains("0.50"));
    }

    #[test]
    fn preview_of_no_months_is_just_the_header() {
        let preview = format_month_preview(&BTreeMap::new(), 5);
        assert_eq!(preview.lines().count(), 1);
    }

    #[test]
    fn monthly_preview_labels_rows_with_month_end() {
        let monthly: BTreeMap<YearMonth, BucketStats> = [
            (YearMonth { year: 2020, month: 2 }, bucket(3.0, 1.0)),
            (YearMonth { year: 2019, month: 12 }, bucket(-1.0, 4.0)),
            (YearMonth { year: 2021, month: 4 }, bucket(12.0, 0.0)),
        ]
        .into_iter()
        .collect();
        let preview = format_monthly_preview(&monthly, 2);
        let lines: Vec<&str> = preview.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Period End"));
        assert!(lines[1].trim_start().starts_with("2019-12-31 "));
        assert!(lines[1].contains("-1.00"));
        assert!(lines[2].trim_start().starts_with("2020-02-29 "));
    }

    #[test]
    fn monthly_preview_falls_back_to_year_month_label() {
        let monthly: BTreeMap<YearMonth, BucketStats> =
            [(YearMonth { year: 2020, month: 13 }, bucket(1.0, 1.0))]
                .into_iter()
                .collect();
        let preview = format_monthly_preview(&monthly, 5);
        assert!(preview.lines().nth(1).unwrap().trim_start().starts_with("2020-13 "));
    }
}
