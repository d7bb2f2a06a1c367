use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use weather_analyzer::load::{AGGREGATES_JSON_FILE, CLEANED_CSV_FILE, CLEANED_PARQUET_FILE, SUMMARY_FILE};
use weather_analyzer::{
    ChartConfig, ColumnConfig, PipelineConfig, PipelineError, Season, Stage, YearMonth, export,
    process_data,
};

const EPS: f64 = 1e-9;

const SCENARIO: &str = "\
Date.Full,Data.Temperature.Avg Temp,Data.Precipitation,Station.City
2020-01-05,10.0,0.0,Springfield
2020-01-06,,2.0,Springfield
2020-02-01,20.0,1.0,Springfield
bad-date,5.0,0.0,Springfield
";

fn write_input(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn config(input: &Path, output: &Path) -> PipelineConfig {
    PipelineConfig {
        input_path: input.to_path_buf(),
        output_dir: output.to_path_buf(),
        columns: ColumnConfig::default(),
        delimiter: b',',
        render_charts: false,
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_reference_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "weather.csv", SCENARIO);
    let analysis = process_data(&input, &ColumnConfig::default(), b',').unwrap();

    let records = &analysis.table.records;
    assert_eq!(records.len(), 3);
    assert_eq!(analysis.report.dropped_dates, 1);
    assert_eq!(records[1].date, ymd(2020, 1, 6));
    assert!((records[1].temperature - 15.0).abs() < EPS);
    assert_eq!(records[0].season, Season::Winter);
    assert_eq!(records[2].season, Season::Winter);

    let monthly = &analysis.aggregates.monthly;
    let jan = monthly[&YearMonth { year: 2020, month: 1 }];
    assert!((jan.mean_temperature - 12.5).abs() < EPS);
    assert!((jan.total_precipitation - 2.0).abs() < EPS);
    let feb = monthly[&YearMonth { year: 2020, month: 2 }];
    assert!((feb.mean_temperature - 20.0).abs() < EPS);

    assert!((analysis.aggregates.global.precipitation.sum - 3.0).abs() < EPS);
    assert_eq!(analysis.aggregates.by_season.len(), 1);
}

#[test]
fn test_export_writes_all_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "weather.csv", SCENARIO);
    let output = dir.path().join("output");
    let cfg = config(&input, &output);

    let analysis = process_data(&cfg.input_path, &cfg.columns, cfg.delimiter).unwrap();
    let written = export(&analysis, &cfg, &ChartConfig::default()).unwrap();
    assert_eq!(written.len(), 4);
    for name in [CLEANED_CSV_FILE, CLEANED_PARQUET_FILE, AGGREGATES_JSON_FILE, SUMMARY_FILE] {
        assert!(output.join(name).is_file(), "{name} missing");
    }

    let csv = fs::read_to_string(output.join(CLEANED_CSV_FILE)).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[2], "2020-01-06,15,2,2020,1,6,Winter");

    let summary = fs::read_to_string(output.join(SUMMARY_FILE)).unwrap();
    assert!(summary.contains("Overall mean temperature: 15.00"));
    assert!(summary.contains("Overall mean precipitation: 1.00"));
    assert!(summary.contains("Monthly overview"));
    assert!(summary.contains("First months on record"));
    assert!(summary.contains("2020-01-31"));
    assert!(summary.contains("2020-02-29"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.join(AGGREGATES_JSON_FILE)).unwrap())
            .unwrap();
    assert_eq!(json["monthly"]["2020-01"]["count"], 2);

    let leftovers: Vec<_> = fs::read_dir(&output)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".staging-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_runs_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "weather.csv", SCENARIO);
    let first_out = dir.path().join("first");
    let second_out = dir.path().join("second");

    let first = process_data(&input, &ColumnConfig::default(), b',').unwrap();
    let second = process_data(&input, &ColumnConfig::default(), b',').unwrap();
    assert_eq!(first.aggregates, second.aggregates);
    assert_eq!(first.table, second.table);

    export(&first, &config(&input, &first_out), &ChartConfig::default()).unwrap();
    export(&second, &config(&input, &second_out), &ChartConfig::default()).unwrap();
    let a = fs::read(first_out.join(CLEANED_CSV_FILE)).unwrap();
    let b = fs::read(second_out.join(CLEANED_CSV_FILE)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_custom_columns_and_delimiter() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        dir.path(),
        "weather.tsv",
        "day\ttemp\train\n2021-06-01\t18.5\t0.2\n2021-06-02\t19.5\t\n",
    );
    let columns = ColumnConfig {
        date: "day".into(),
        temperature: "temp".into(),
        precipitation: "rain".into(),
    };
    let analysis = process_data(&input, &columns, b'\t').unwrap();
    assert_eq!(analysis.table.len(), 2);
    assert!((analysis.table.records[1].precipitation - 0.2).abs() < EPS);
    assert_eq!(analysis.report.imputed_precipitation, 1);
    assert_eq!(analysis.table.records[0].season, Season::Summer);
}

#[test]
fn test_missing_file_fails_in_load_stage() {
    let err = process_data(
        Path::new("/no/such/weather.csv"),
        &ColumnConfig::default(),
        b',',
    )
    .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Load));
    assert!(matches!(err.root(), PipelineError::Io(_)));
    assert!(err.to_string().starts_with("load stage failed"));
}

#[test]
fn test_missing_column_fails_in_load_stage() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "weather.csv", "Date.Full,Data.Precipitation\n2020-01-01,1\n");
    let err = process_data(&input, &ColumnConfig::default(), b',').unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Load));
    assert!(matches!(err.root(), PipelineError::Schema { .. }));
    assert!(err.to_string().starts_with("load stage failed"));
}

#[test]
fn test_all_null_temperature_is_insufficient_data() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        dir.path(),
        "weather.csv",
        "Date.Full,Data.Temperature.Avg Temp,Data.Precipitation\n2020-01-01,,1\n2020-01-02,NA,2\n",
    );
    let err = process_data(&input, &ColumnConfig::default(), b',').unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Clean));
    assert!(matches!(err.root(), PipelineError::InsufficientData(_)));
}

#[test]
fn test_no_valid_dates_fails_in_aggregate_stage() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        dir.path(),
        "weather.csv",
        "Date.Full,Data.Temperature.Avg Temp,Data.Precipitation\nsoon,1,1\nlater,2,2\n",
    );
    let err = process_data(&input, &ColumnConfig::default(), b',').unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Aggregate));
    assert!(matches!(err.root(), PipelineError::InsufficientData(_)));
}

#[test]
fn test_unwritable_output_fails_in_export_stage() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "weather.csv", SCENARIO);
    // A regular file where the output directory should be.
    let output = write_input(dir.path(), "output", "occupied");
    let cfg = config(&input, &output);

    let analysis = process_data(&cfg.input_path, &cfg.columns, cfg.delimiter).unwrap();
    let err = export(&analysis, &cfg, &ChartConfig::default()).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Export));
    assert!(matches!(err.root(), PipelineError::Io(_)));
}

#[test]
fn test_failed_publish_leaves_no_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "weather.csv", SCENARIO);
    let output = dir.path().join("output");
    // The cleaned CSV is published first; a directory in its place makes that fail.
    fs::create_dir_all(output.join(CLEANED_CSV_FILE)).unwrap();
    let cfg = config(&input, &output);

    let analysis = process_data(&cfg.input_path, &cfg.columns, cfg.delimiter).unwrap();
    let err = export(&analysis, &cfg, &ChartConfig::default()).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Export));

    let entries: Vec<String> = fs::read_dir(&output)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec![CLEANED_CSV_FILE.to_string()]);
}

#[test]
fn test_blocked_later_artifact_publishes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "weather.csv", SCENARIO);
    let output = dir.path().join("output");
    fs::create_dir_all(output.join(AGGREGATES_JSON_FILE).join("nested")).unwrap();
    fs::write(output.join(CLEANED_CSV_FILE), "previous run").unwrap();
    let cfg = config(&input, &output);

    let analysis = process_data(&cfg.input_path, &cfg.columns, cfg.delimiter).unwrap();
    let err = export(&analysis, &cfg, &ChartConfig::default()).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Export));

    assert_eq!(
        fs::read_to_string(output.join(CLEANED_CSV_FILE)).unwrap(),
        "previous run"
    );
    assert!(!output.join(CLEANED_PARQUET_FILE).exists());
    assert!(!output.join(SUMMARY_FILE).exists());
    let mut entries: Vec<String> = fs::read_dir(&output)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    assert_eq!(
        entries,
        vec![AGGREGATES_JSON_FILE.to_string(), CLEANED_CSV_FILE.to_string()]
    );
}
