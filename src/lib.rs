pub mod aggregate;
pub mod error;
pub mod extract;
pub mod load;
pub mod plot;
pub mod report;
pub mod structs;
pub mod transform;

// Re-export public API
pub use aggregate::{
    Aggregates, BucketStats, ColumnStats, GlobalStats, SeasonStats, YearMonth, aggregate,
};
pub use error::{PipelineError, Result, Stage};
pub use extract::read_table;
pub use load::{export, write_cleaned_csv, write_cleaned_parquet, write_json, write_summary};
pub use plot::ChartConfig;
pub use report::format_summary;
pub use structs::{
    CleanedTable, CleaningReport, ColumnConfig, PipelineConfig, RawTable, Season, SimpleLogger,
    WeatherRecord,
};
pub use transform::{Analysis, clean_table, process_data};
