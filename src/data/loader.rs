use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Table, Value};

/// Bytes inspected when guessing the delimiter of a text table.
const SNIFF_BYTES: usize = 1024;

/// Delimiters tried by the sniffer, in tie-break order.
const CANDIDATE_DELIMITERS: [u8; 4] = [b'\t', b',', b';', b'|'];

/// How to turn a file into an entity-indexed [`Table`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Column holding the entity keys (e.g. `SampleID`). Required.
    pub entity_column: String,
    /// Field delimiter for text files. Sniffed when `None`.
    pub delimiter: Option<u8>,
}

impl LoadOptions {
    pub fn new(entity_column: impl Into<String>) -> Self {
        Self {
            entity_column: entity_column.into(),
            delimiter: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an entity table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.tsv` / `.tab` / `.txt` – delimited text with a header row
/// * `.json`    – `[{ "SampleID": "...", "feature": value, ... }, ...]`
/// * `.parquet` – flat scalar columns
pub fn load_table(path: &Path, options: &LoadOptions) -> Result<Table> {
    let ext = extension(path);
    let table = match ext.as_str() {
        "csv" | "tsv" | "tab" | "txt" => load_delimited(path, options),
        "json" => load_json(path, options),
        "parquet" | "pq" => load_parquet(path, options),
        other => bail!("Unsupported file extension: .{other}"),
    }?;
    log::debug!(
        "loaded {}: {} entities x {} features",
        path.display(),
        table.shape().0,
        table.shape().1
    );
    Ok(table)
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Split raw rows into the entity index and the feature grid.
fn build_table(
    headers: Vec<String>,
    records: Vec<Vec<Value>>,
    entity_column: &str,
) -> Result<Table> {
    let key_idx = headers
        .iter()
        .position(|h| h == entity_column)
        .with_context(|| format!("missing entity column '{entity_column}'"))?;

    let columns: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != key_idx)
        .map(|(_, h)| h.clone())
        .collect();

    let mut entities = Vec::with_capacity(records.len());
    let mut rows = Vec::with_capacity(records.len());
    for (row_no, mut record) in records.into_iter().enumerate() {
        let key = record.remove(key_idx);
        if key.is_null() {
            bail!("Row {row_no}: empty entity key in '{entity_column}'");
        }
        entities.push(key.to_string());
        rows.push(record);
    }

    Table::new(entities, columns, rows).context("building entity table")
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

/// Header row with column names, one entity per following row.
/// Entity keys are kept verbatim as text; other cells are type-guessed.
fn load_delimited(path: &Path, options: &LoadOptions) -> Result<Table> {
    let delimiter = match options.delimiter {
        Some(d) => d,
        None => {
            let mut sample = Vec::with_capacity(SNIFF_BYTES);
            std::fs::File::open(path)
                .context("opening delimited file")?
                .take(SNIFF_BYTES as u64)
                .read_to_end(&mut sample)
                .context("reading delimited file")?;
            sniff_delimiter(&sample).unwrap_or_else(|| default_delimiter(path))
        }
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .context("opening delimited file")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let key_idx = headers.iter().position(|h| h == &options.entity_column);

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("row {row_no}"))?;
        let values = record
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                if Some(i) == key_idx && !cell.trim().is_empty() {
                    Value::String(cell.trim().to_string())
                } else {
                    Value::parse(cell)
                }
            })
            .collect();
        records.push(values);
    }

    build_table(headers, records, &options.entity_column)
}

fn default_delimiter(path: &Path) -> u8 {
    match extension(path).as_str() {
        "tsv" | "tab" => b'\t',
        _ => b',',
    }
}

/// Guess the delimiter from the first bytes of a file.
///
/// A candidate qualifies when it occurs the same, non-zero number of times
/// on every complete line of the sample. Returns `None` if nothing does.
pub fn sniff_delimiter(sample: &[u8]) -> Option<u8> {
    let text = String::from_utf8_lossy(sample);
    let mut lines: Vec<&str> = text.split('\n').collect();
    if sample.len() >= SNIFF_BYTES && lines.len() > 1 {
        // last line may be cut short
        lines.pop();
    }
    let lines: Vec<&str> = lines
        .into_iter()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return None;
    }

    CANDIDATE_DELIMITERS.into_iter().find(|&d| {
        let counts: BTreeSet<usize> = lines
            .iter()
            .map(|l| l.bytes().filter(|&b| b == d).count())
            .collect();
        counts.len() == 1 && counts.first().is_some_and(|&n| n > 0)
    })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`:
///
/// ```json
/// [
///   { "SampleID": "S1", "Age": 34, "Antibiotics Usage": "no" },
///   ...
/// ]
/// ```
///
/// Columns are ordered by first appearance; missing keys become `Null`.
fn load_json(path: &Path, options: &LoadOptions) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            headers
                .iter()
                .map(|h| match obj.get(h) {
                    Some(JsonValue::Number(n)) if h == &options.entity_column => {
                        Value::String(n.to_string())
                    }
                    Some(v) => json_to_value(v),
                    None => Value::Null,
                })
                .collect()
        })
        .collect();

    build_table(headers, rows, &options.entity_column)
}

pub(crate) fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one scalar column per feature plus the entity
/// column. Works with files written by both **Pandas** (`df.to_parquet()`)
/// and **Polars** (`df.write_parquet()`); a pandas index has to be reset
/// into a regular column first.
fn load_parquet(path: &Path, options: &LoadOptions) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let values = batch
                .columns()
                .iter()
                .map(|col| extract_value(col, row))
                .collect();
            records.push(values);
        }
    }

    build_table(headers, records, &options.entity_column)
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    match col.data_type() {
        DataType::Utf8 => Value::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => Value::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => Value::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => Value::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => {
            let v = col.as_primitive::<Float64Type>().value(row);
            if v.is_nan() {
                Value::Null
            } else {
                Value::Float(v)
            }
        }
        DataType::Boolean => Value::Bool(col.as_boolean().value(row)),
        other => Value::String(format!("{other:?}")),
    }
}

// ---------------------------------------------------------------------------
// CSV writer
// ---------------------------------------------------------------------------

/// Write `table` as CSV with the entity keys in a leading `index_label` column.
/// Nulls are written as empty cells.
pub fn write_csv(table: &Table, path: &Path, index_label: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer
        .write_record(std::iter::once(index_label).chain(table.columns().iter().map(|c| c.as_str())))
        .context("writing CSV header")?;
    for (entity, row) in table.entities().iter().zip(table.rows()) {
        let cells = row.iter().map(|v| match v {
            Value::Null => String::new(),
            other => other.to_string(),
        });
        writer
            .write_record(std::iter::once(entity.clone()).chain(cells))
            .with_context(|| format!("writing row {entity}"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}
