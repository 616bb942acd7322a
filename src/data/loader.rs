use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::errors::ParquetError;
use thiserror::Error;

use super::model::{Ticket, TicketDataset};

/// Columns every input file must provide.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "airline",
    "source_city",
    "destination_city",
    "class",
    "stops",
    "price",
    "duration",
    "days_left",
];

/// Why the dataset could not be loaded. Always fatal: nothing is kept from a
/// failed load.
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed delimited file: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed parquet file: {0}")]
    Parquet(#[from] ParquetError),
    #[error("malformed parquet record batch: {0}")]
    Arrow(#[from] ArrowError),
    #[error("missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("row {row}: column '{column}' has invalid value '{value}'")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("column '{column}' has unsupported type {dtype}")]
    UnsupportedColumnType { column: &'static str, dtype: String },
    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),
    #[error("file contains no data rows")]
    NoRows,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a ticket dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – comma separated, header row required
/// * `.tsv`     – tab separated, header row required
/// * `.parquet` – flat Parquet file with the same column names
///
/// Columns beyond [`REQUIRED_COLUMNS`] are ignored.
pub fn load_file(path: &Path) -> Result<TicketDataset, DataLoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let tickets = match ext.as_str() {
        "csv" => load_delimited(path, b',')?,
        "tsv" => load_delimited(path, b'\t')?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(DataLoadError::UnsupportedExtension(other.to_string())),
    };

    let dataset = TicketDataset::from_tickets(tickets);
    if dataset.is_empty() {
        return Err(DataLoadError::NoRows);
    }
    Ok(dataset)
}

/// Column positions of the required fields, in [`REQUIRED_COLUMNS`] order.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex([usize; 8]);

impl ColumnIndex {
    /// Locate every required column, reporting all missing names at once.
    fn locate<F>(mut position: F) -> Result<Self, DataLoadError>
    where
        F: FnMut(&str) -> Option<usize>,
    {
        let mut idx = [0usize; 8];
        let mut missing = Vec::new();
        for (slot, name) in idx.iter_mut().zip(REQUIRED_COLUMNS) {
            match position(name) {
                Some(i) => *slot = i,
                None => missing.push(name.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(ColumnIndex(idx))
        } else {
            Err(DataLoadError::MissingColumns(missing))
        }
    }
}

// ---------------------------------------------------------------------------
// Delimited loader
// ---------------------------------------------------------------------------

/// Delimited layout: header row with column names, one ticket per row.
/// Numeric cells must parse exactly; nothing is coerced.
fn load_delimited(path: &Path, delimiter: u8) -> Result<Vec<Ticket>, DataLoadError> {
    let file = std::fs::File::open(path).map_err(|source| DataLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_delimited(file, delimiter)
}

fn read_delimited<R: std::io::Read>(
    reader: R,
    delimiter: u8,
) -> Result<Vec<Ticket>, DataLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let cols = ColumnIndex::locate(|name| headers.iter().position(|h| h == name))?;

    let mut tickets = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let row = i + 1;
        let cell = |slot: usize| record.get(cols.0[slot]).unwrap_or("");

        tickets.push(Ticket::new(
            cell(0),
            cell(1),
            cell(2),
            cell(3),
            cell(4),
            parse_float(cell(5), row, REQUIRED_COLUMNS[5])?,
            parse_float(cell(6), row, REQUIRED_COLUMNS[6])?,
            parse_int(cell(7), row, REQUIRED_COLUMNS[7])?,
        ));
    }

    Ok(tickets)
}

fn invalid(row: usize, column: &'static str, value: &str) -> DataLoadError {
    DataLoadError::InvalidValue {
        row,
        column,
        value: value.to_string(),
    }
}

fn parse_float(s: &str, row: usize, column: &'static str) -> Result<f64, DataLoadError> {
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(row, column, s))
}

/// `f` as an `i64` when it is a whole number inside the `i64` range.
fn whole_number(f: f64) -> Option<i64> {
    // `i64::MAX as f64` rounds up to 2^63, hence the strict upper bound.
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then_some(f as i64)
}

/// Accepts `12` and `12.0`, rejects `12.5` and anything outside `i64`.
fn parse_int(s: &str, row: usize, column: &'static str) -> Result<i64, DataLoadError> {
    if let Ok(i) = s.parse::<i64>() {
        return Ok(i);
    }
    s.parse::<f64>()
        .ok()
        .and_then(whole_number)
        .ok_or_else(|| invalid(row, column, s))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet file with the ticket columns.
///
/// Text columns must be Utf8 / LargeUtf8; numeric columns may be any of
/// Int32, Int64, Float32 or Float64. Works with files written by both
/// **Pandas** (`df.to_parquet()`) and **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Vec<Ticket>, DataLoadError> {
    let file = std::fs::File::open(path).map_err(|source| DataLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let reader = builder.build()?;

    let mut tickets = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        let schema = batch.schema();
        let cols = ColumnIndex::locate(|name| schema.index_of(name).ok())?;
        let column = |slot: usize| batch.column(cols.0[slot]);

        for r in 0..batch.num_rows() {
            // Row numbers continue across batches.
            let row = tickets.len() + 1;
            tickets.push(Ticket::new(
                extract_text(column(0), r, row, REQUIRED_COLUMNS[0])?,
                extract_text(column(1), r, row, REQUIRED_COLUMNS[1])?,
                extract_text(column(2), r, row, REQUIRED_COLUMNS[2])?,
                extract_text(column(3), r, row, REQUIRED_COLUMNS[3])?,
                extract_text(column(4), r, row, REQUIRED_COLUMNS[4])?,
                extract_number(column(5), r, row, REQUIRED_COLUMNS[5])?,
                extract_number(column(6), r, row, REQUIRED_COLUMNS[6])?,
                extract_integer(column(7), r, row, REQUIRED_COLUMNS[7])?,
            ));
        }
    }

    Ok(tickets)
}

// -- Arrow helpers --

fn unsupported(col: &Arc<dyn Array>, column: &'static str) -> DataLoadError {
    DataLoadError::UnsupportedColumnType {
        column,
        dtype: format!("{:?}", col.data_type()),
    }
}

/// Extract a string cell from a Utf8 or LargeUtf8 column.
fn extract_text(
    col: &Arc<dyn Array>,
    r: usize,
    row: usize,
    column: &'static str,
) -> Result<String, DataLoadError> {
    if col.is_null(r) {
        return Err(invalid(row, column, "<null>"));
    }
    match col.data_type() {
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| unsupported(col, column))?;
            Ok(arr.value(r).trim().to_string())
        }
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(r).trim().to_string()),
        _ => Err(unsupported(col, column)),
    }
}

/// Extract a numeric cell as `f64`.
fn extract_number(
    col: &Arc<dyn Array>,
    r: usize,
    row: usize,
    column: &'static str,
) -> Result<f64, DataLoadError> {
    if col.is_null(r) {
        return Err(invalid(row, column, "<null>"));
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Int32 => any.downcast_ref::<Int32Array>().map(|a| a.value(r) as f64),
        DataType::Int64 => any.downcast_ref::<Int64Array>().map(|a| a.value(r) as f64),
        DataType::Float32 => any.downcast_ref::<Float32Array>().map(|a| a.value(r) as f64),
        DataType::Float64 => any.downcast_ref::<Float64Array>().map(|a| a.value(r)),
        _ => None,
    }
    .ok_or_else(|| unsupported(col, column))?;

    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid(row, column, &value.to_string()))
    }
}

/// Extract an integral cell; floats are accepted only when they are whole
/// numbers that fit an `i64`.
fn extract_integer(
    col: &Arc<dyn Array>,
    r: usize,
    row: usize,
    column: &'static str,
) -> Result<i64, DataLoadError> {
    if col.is_null(r) {
        return Err(invalid(row, column, "<null>"));
    }
    let any = col.as_any();
    let exact = match col.data_type() {
        DataType::Int32 => any.downcast_ref::<Int32Array>().map(|a| a.value(r) as i64),
        DataType::Int64 => any.downcast_ref::<Int64Array>().map(|a| a.value(r)),
        _ => None,
    };
    if let Some(value) = exact {
        return Ok(value);
    }

    let value = extract_number(col, r, row, column)?;
    whole_number(value).ok_or_else(|| invalid(row, column, &value.to_string()))
}
