use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray, BooleanArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, ColumnType, DataFrame, Value};

static JSON_NULL: JsonValue = JsonValue::Null;

/// Cell texts treated as missing, the same set `pandas.read_csv` uses.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` / `.pq` – flat scalar columns
/// * `.json`    – `[{ "col": value, ... }, ...]`
/// * anything else – comma-separated text with a header row
pub fn load_file(path: &Path) -> Result<DataFrame> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let df = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        _ => load_csv(path),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::debug!("{}: {} rows x {} columns", path.display(), df.n_rows(), df.n_cols());
    Ok(df)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<DataFrame> {
    let file = std::fs::File::open(path).context("opening CSV")?;
    read_csv(file)
}

/// Parse comma-separated text with a header row, inferring column types.
///
/// Empty header cells become `Unnamed: {i}` and repeated names get a `.N`
/// suffix, so every column name is unique.
pub fn read_csv<R: Read>(reader: R) -> Result<DataFrame> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let raw_headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if raw_headers.is_empty() {
        bail!("CSV has no header row");
    }
    let headers = dedupe_headers(&raw_headers);

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for (col_idx, value) in record.iter().enumerate() {
            cells[col_idx].push(value.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| infer_column(name, &raw))
        .collect();

    DataFrame::new(columns)
}

fn dedupe_headers(raw: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.iter()
        .enumerate()
        .map(|(i, h)| {
            let base = if h.is_empty() {
                format!("Unnamed: {i}")
            } else {
                h.clone()
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

fn is_na(s: &str) -> bool {
    NA_VALUES.contains(&s)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "True" | "TRUE" | "true" => Some(true),
        "False" | "FALSE" | "false" => Some(false),
        _ => None,
    }
}

/// Pick the narrowest type that every non-missing cell parses as:
/// int, then float, then bool, then string. An int column with gaps is
/// promoted to float; an all-missing column is float.
fn infer_column(name: String, raw: &[String]) -> Column {
    let present: Vec<&str> = raw
        .iter()
        .map(String::as_str)
        .filter(|s| !is_na(s))
        .collect();
    let has_nulls = present.len() < raw.len();

    let dtype = if present.iter().all(|s| s.trim().parse::<i64>().is_ok()) {
        if has_nulls || present.is_empty() {
            ColumnType::Float
        } else {
            ColumnType::Int
        }
    } else if present.iter().all(|s| s.trim().parse::<f64>().is_ok()) {
        ColumnType::Float
    } else if present.iter().all(|s| parse_bool(s).is_some()) {
        ColumnType::Bool
    } else {
        ColumnType::Str
    };

    let values = raw
        .iter()
        .map(|s| {
            if is_na(s) {
                return Value::Null;
            }
            let t = s.trim();
            match dtype {
                ColumnType::Int => t.parse().map(Value::Int).unwrap_or(Value::Null),
                ColumnType::Float => t.parse().map(Value::Float).unwrap_or(Value::Null),
                ColumnType::Bool => parse_bool(s).map(Value::Bool).unwrap_or(Value::Null),
                ColumnType::Str => Value::Str(s.clone()),
            }
        })
        .collect();

    Column::new(name, dtype, values)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path) -> Result<DataFrame> {
    let file = std::fs::File::open(path).context("opening JSON file")?;
    read_json(file)
}

/// Parse records-oriented JSON (the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "x1": 0.5, "x2": -1.2, "class": "A" },
///   ...
/// ]
/// ```
///
/// Columns appear in first-seen order across records; keys within one record
/// come out sorted.
pub fn read_json<R: Read>(reader: R) -> Result<DataFrame> {
    let root: JsonValue = serde_json::from_reader(reader).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut names: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if seen.insert(key.as_str()) {
                names.push(key.clone());
            }
        }
    }

    let mut cells: Vec<Vec<&JsonValue>> = vec![Vec::with_capacity(records.len()); names.len()];
    for rec in records {
        let obj = rec.as_object().context("Expected JSON object")?;
        for (name, column) in names.iter().zip(cells.iter_mut()) {
            column.push(obj.get(name).unwrap_or(&JSON_NULL));
        }
    }

    let columns = names
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| json_column(name, &raw))
        .collect::<Result<Vec<_>>>()?;

    DataFrame::new(columns)
}

fn json_column(name: String, raw: &[&JsonValue]) -> Result<Column> {
    let present: Vec<&JsonValue> = raw.iter().copied().filter(|v| !v.is_null()).collect();

    let all_present = !raw.is_empty() && present.len() == raw.len();

    let dtype = if all_present && present.iter().all(|v| v.is_i64()) {
        ColumnType::Int
    } else if present.iter().all(|v| v.is_number()) {
        ColumnType::Float
    } else if present.iter().all(|v| v.is_boolean()) {
        ColumnType::Bool
    } else if present.iter().all(|v| v.is_string() || v.is_number() || v.is_boolean()) {
        ColumnType::Str
    } else {
        bail!("column '{name}' holds nested arrays or objects");
    };

    let values = raw
        .iter()
        .map(|v| match (dtype, v) {
            (_, JsonValue::Null) => Value::Null,
            (ColumnType::Int, v) => v.as_i64().map(Value::Int).unwrap_or(Value::Null),
            (ColumnType::Float, v) => v.as_f64().map(Value::Float).unwrap_or(Value::Null),
            (ColumnType::Bool, v) => v.as_bool().map(Value::Bool).unwrap_or(Value::Null),
            (ColumnType::Str, JsonValue::String(s)) => Value::Str(s.clone()),
            (ColumnType::Str, other) => Value::Str(other.to_string()),
        })
        .collect();

    Ok(Column::new(name, dtype, values))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of flat scalar columns.
///
/// Integer, float, boolean and string columns keep their type; anything
/// else (dates, decimals, ...) is read as its display string.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<DataFrame> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;

    let schema = builder.schema().clone();
    let dtypes: Vec<ColumnType> = schema
        .fields()
        .iter()
        .map(|f| arrow_column_type(f.data_type()))
        .collect();
    let mut values: Vec<Vec<Value>> = vec![Vec::new(); dtypes.len()];

    let reader = builder.build().context("building parquet reader")?;
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col_idx, dtype) in dtypes.iter().enumerate() {
            let name = schema.field(col_idx).name();
            extract_values(batch.column(col_idx), *dtype, &mut values[col_idx])
                .with_context(|| format!("column '{name}'"))?;
        }
    }

    let columns = schema
        .fields()
        .iter()
        .zip(dtypes)
        .zip(values)
        .map(|((field, dtype), vals)| Column::new(field.name().clone(), dtype, vals))
        .collect();

    DataFrame::new(columns)
}

fn arrow_column_type(dt: &DataType) -> ColumnType {
    match dt {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => ColumnType::Int,
        DataType::UInt64 | DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            ColumnType::Float
        }
        DataType::Boolean => ColumnType::Bool,
        _ => ColumnType::Str,
    }
}

// -- Parquet / Arrow helpers --

/// Append every row of `col` to `out` as `dtype` values.
fn extract_values(col: &ArrayRef, dtype: ColumnType, out: &mut Vec<Value>) -> Result<()> {
    match dtype {
        ColumnType::Int => {
            let ints = cast(col.as_ref(), &DataType::Int64).context("casting to Int64")?;
            let ints = ints.as_primitive::<Int64Type>();
            out.extend(ints.iter().map(|v| v.map_or(Value::Null, Value::Int)));
        }
        ColumnType::Float => {
            let floats = cast(col.as_ref(), &DataType::Float64).context("casting to Float64")?;
            let floats = floats.as_primitive::<Float64Type>();
            out.extend(floats.iter().map(|v| v.map_or(Value::Null, Value::Float)));
        }
        ColumnType::Bool => {
            let bools = col
                .as_any()
                .downcast_ref::<BooleanArray>()
                .context("expected BooleanArray")?;
            out.extend(bools.iter().map(|v| v.map_or(Value::Null, Value::Bool)));
        }
        ColumnType::Str => {
            for row in 0..col.len() {
                if col.is_null(row) {
                    out.push(Value::Null);
                } else {
                    let text = array_value_to_string(col.as_ref(), row)
                        .with_context(|| format!("formatting row {row}"))?;
                    out.push(Value::Str(text));
                }
            }
        }
    }
    Ok(())
}
