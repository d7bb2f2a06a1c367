use crate::error::{PipelineError, Result};
use crate::structs::RawTable;
use csv::{ReaderBuilder, StringRecord};
use log::{debug, info};
use std::{fs::File, io::Read, path::Path};

/// Reads a delimited table from disk.
///
/// This is a structural parse only: the first row is the header, every
/// following row is kept as untyped text. Rows shorter than the header are
/// accepted (missing cells read as absent); rows longer than the header are
/// malformed.
///
/// # Errors
///
/// - `PipelineError::Io` if the file cannot be opened or read
/// - `PipelineError::Parse` / `PipelineError::Csv` if the content is not a
///   valid delimited table
pub fn read_table(path: &Path, delimiter: u8) -> Result<RawTable> {
    debug!("Reading delimited table: {}", path.display());
    let file = File::open(path)?;
    let table = read_table_from(file, delimiter)?;
    info!(
        "Loaded {} rows with {} columns from {}",
        table.len(),
        table.headers.len(),
        path.display()
    );
    Ok(table)
}

/// Same as [`read_table`], over any reader.
pub fn read_table_from<R: Read>(reader: R, delimiter: u8) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(PipelineError::Parse("no header row found".to_string()));
    }

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    while rdr.read_record(&mut record)? {
        if record.len() > headers.len() {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            return Err(PipelineError::Parse(format!(
                "line {}: expected at most {} fields, found {}",
                line,
                headers.len(),
                record.len()
            )));
        }
        rows.push(record.clone());
    }

    Ok(RawTable { headers, rows })
}
