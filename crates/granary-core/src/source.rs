//! Tabular source readers
//!
//! Two ways into a [`Table`]: run a query through a [`QuerySource`]
//! implementation, or parse a delimited text file whose field delimiter is
//! sniffed from a leading sample.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::table::{Column, ColumnType, Table, Value};

/// A source that executes a query and returns its result set.
///
/// Implementations acquire and release their connection per call; there is
/// no pooling or reuse across calls.
#[async_trait]
pub trait QuerySource: Send + Sync {
    /// Execute `query` and return the result as a [`Table`].
    async fn fetch(&self, query: &str) -> Result<Table>;
}

/// Number of leading bytes inspected when sniffing the delimiter.
pub const SNIFF_WINDOW: usize = 1024;

/// Delimiters considered by the sniffer, in precedence order.
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b'|', b';', b'\t'];

/// Infer the field delimiter from a leading sample of a delimited file.
///
/// A candidate qualifies when every sampled line contains the same nonzero
/// number of occurrences; ties resolve in candidate precedence order.
pub fn sniff_delimiter(sample: &str) -> Option<u8> {
    let mut lines: Vec<&str> = sample.lines().filter(|l| !l.trim().is_empty()).collect();
    // A sample cut mid-line would skew the last line's count.
    if lines.len() > 1 && sample.len() >= SNIFF_WINDOW && !sample.ends_with('\n') {
        lines.pop();
    }
    if lines.is_empty() {
        return None;
    }

    DELIMITER_CANDIDATES.iter().copied().find(|&candidate| {
        let first = lines[0].bytes().filter(|&b| b == candidate).count();
        first > 0
            && lines[1..]
                .iter()
                .all(|line| line.bytes().filter(|&b| b == candidate).count() == first)
    })
}

/// Read a delimited text file into a [`Table`].
///
/// The delimiter is sniffed from the first [`SNIFF_WINDOW`] bytes, the first
/// record is the header, and column types are inferred best-effort: a column
/// whose non-empty values all parse as integers is `Int`, else all as floats
/// is `Float`, else `Text`. Empty fields become `Null`.
pub fn read_delimited(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let parse_error = |message: String| Error::Parse {
        path: path.display().to_string(),
        message,
    };

    let file = File::open(path).map_err(|e| parse_error(e.to_string()))?;
    let mut sample = Vec::new();
    file.take(SNIFF_WINDOW as u64)
        .read_to_end(&mut sample)
        .map_err(|e| parse_error(e.to_string()))?;
    let sample = String::from_utf8_lossy(&sample);

    let delimiter = sniff_delimiter(&sample)
        .ok_or_else(|| parse_error("could not infer field delimiter".to_string()))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| parse_error(e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| parse_error(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| parse_error(e.to_string()))?;
        records.push(record.iter().map(|f| f.to_string()).collect());
    }

    let types: Vec<ColumnType> = (0..headers.len())
        .map(|i| infer_column_type(records.iter().map(|r| r[i].as_str())))
        .collect();

    let columns = headers
        .iter()
        .zip(&types)
        .map(|(name, &ty)| Column::new(name, ty))
        .collect();

    let rows = records
        .iter()
        .map(|record| {
            record
                .iter()
                .zip(&types)
                .map(|(field, &ty)| typed_field(field, ty))
                .collect()
        })
        .collect();

    let table = Table::new(columns, rows)?;
    tracing::info!(
        path = %path.display(),
        delimiter = %char::from(delimiter),
        rows = table.len(),
        "read delimited file"
    );
    Ok(table)
}

fn infer_column_type<'a>(values: impl Iterator<Item = &'a str>) -> ColumnType {
    let non_empty: Vec<&str> = values.map(str::trim).filter(|v| !v.is_empty()).collect();
    if non_empty.is_empty() {
        return ColumnType::Text;
    }
    if non_empty.iter().all(|v| v.parse::<i64>().is_ok()) {
        ColumnType::Int
    } else if non_empty.iter().all(|v| v.parse::<f64>().is_ok()) {
        ColumnType::Float
    } else {
        ColumnType::Text
    }
}

fn typed_field(field: &str, ty: ColumnType) -> Value {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match ty {
        ColumnType::Int => trimmed
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(field.to_string())),
        ColumnType::Float => trimmed
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or_else(|_| Value::Text(field.to_string())),
        ColumnType::Text | ColumnType::Timestamp => Value::Text(field.to_string()),
    }
}
