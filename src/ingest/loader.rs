use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::config::InputConfig;

use super::error::IngestError;
use super::types::TransactionRecord;

/// The count column is taken by position, whatever its header says.
const COUNT_COLUMN: usize = 2;

/// Load transaction records from a CSV file.
/// Expected columns: time, status, and a transaction count in the third position.
pub fn load_records(
    path: impl AsRef<Path>,
    input: &InputConfig,
) -> Result<Vec<TransactionRecord>, IngestError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let records = read_records(file, input)?;
    tracing::debug!(file = %path.display(), records = records.len(), "Loaded transaction records");
    Ok(records)
}

/// Parse transaction records from any CSV source.
pub fn read_records<R: Read>(
    source: R,
    input: &InputConfig,
) -> Result<Vec<TransactionRecord>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    let time_idx = headers
        .iter()
        .position(|h| h == "time")
        .ok_or(IngestError::MissingColumn("time"))?;
    let status_idx = headers
        .iter()
        .position(|h| h == "status")
        .ok_or(IngestError::MissingColumn("status"))?;
    if headers.len() <= COUNT_COLUMN {
        return Err(IngestError::MissingColumn("transaction count"));
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);

        let raw_time = row.get(time_idx).unwrap_or("");
        let time = if input.normalize_time_labels {
            normalize_time_label(raw_time)
        } else {
            raw_time.to_string()
        };
        let status = row.get(status_idx).unwrap_or("").to_string();
        let count = parse_count(row.get(COUNT_COLUMN).unwrap_or(""))
            .ok_or_else(|| IngestError::InvalidCount {
                line,
                value: row.get(COUNT_COLUMN).unwrap_or("").to_string(),
            })?;

        records.push(TransactionRecord { time, status, count });
    }

    Ok(records)
}

/// Rewrite exported labels like `00h 01` into `00:01`.
pub fn normalize_time_label(raw: &str) -> String {
    raw.replace("h ", ":").trim().to_string()
}

/// Counts are non-negative integers; integral floats (`12.0`) are tolerated.
fn parse_count(raw: &str) -> Option<u64> {
    if let Ok(n) = raw.parse::<u64>() {
        return Some(n);
    }
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Some(value as u64)
    } else {
        None
    }
}
