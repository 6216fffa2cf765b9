use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, Float32Array, Float64Array, Int32Array, Int64Array, LargeListArray, ListArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{SeismicVolume, TimeSeries};

/// Column holding sample times in seconds.
pub const TIME_COLUMN: &str = "time";
/// Column holding sample values (impedance or amplitude).
pub const VALUE_COLUMN: &str = "value";
/// Optional per-trace lateral position.
pub const POSITION_COLUMN: &str = "position";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One series read from a file, plus its lateral position when the file has a
/// `position` column.
#[derive(Debug, Clone)]
pub struct TraceRecord {
    pub series: TimeSeries,
    pub position: Option<f64>,
}

/// A seismic volume together with the trace positions, if every trace had one.
#[derive(Debug, Clone)]
pub struct LoadedVolume {
    pub volume: SeismicVolume,
    pub positions: Option<Vec<f64>>,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load trace records from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – `time` and `value` list columns, one row per trace (recommended)
/// * `.json`    – `[{ "time": [...], "value": [...] }, ...]` or a single object
/// * `.csv`     – `time` and `value` columns holding semicolon-separated floats,
///   one row per trace; or plain numbers, one row per sample of a single series
pub fn load_records(path: &Path) -> Result<Vec<TraceRecord>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let records = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!("Loaded {} series from {}", records.len(), path.display());
    Ok(records)
}

/// Load a well log: the file must hold exactly one series.
pub fn load_well_log(path: &Path) -> Result<TimeSeries> {
    let mut records = load_records(path)?;
    if records.len() != 1 {
        bail!(
            "{}: expected a single well-log series, found {}",
            path.display(),
            records.len()
        );
    }
    Ok(records.remove(0).series)
}

/// Load a seismic volume from all records of a file.
pub fn load_volume(path: &Path) -> Result<LoadedVolume> {
    let records = load_records(path)?;
    let positions: Option<Vec<f64>> = records.iter().map(|r| r.position).collect();
    let traces = records.into_iter().map(|r| r.series).collect();
    let volume = SeismicVolume::new(traces)
        .with_context(|| format!("{}: inconsistent traces", path.display()))?;
    Ok(LoadedVolume { volume, positions })
}

fn record(time: Vec<f64>, value: Vec<f64>, position: Option<f64>, row: usize) -> Result<TraceRecord> {
    if time.len() != value.len() {
        bail!("Row {row}: time has {} values but value has {}", time.len(), value.len());
    }
    let series = TimeSeries::new(time, value).with_context(|| format!("Row {row}"))?;
    Ok(TraceRecord { series, position })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "time": [0.0, 0.001, ...], "value": [0.12, 0.14, ...], "position": 12.5 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Vec<TraceRecord>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows: Vec<&JsonValue> = match &root {
        JsonValue::Array(items) => items.iter().collect(),
        JsonValue::Object(_) => vec![&root],
        _ => bail!("Expected a JSON array of records or a single record object"),
    };

    rows.iter()
        .enumerate()
        .map(|(i, rec)| {
            let obj = rec
                .as_object()
                .with_context(|| format!("Row {i} is not a JSON object"))?;
            let time = json_array_to_f64(obj.get(TIME_COLUMN), i, TIME_COLUMN)?;
            let value = json_array_to_f64(obj.get(VALUE_COLUMN), i, VALUE_COLUMN)?;
            let position = obj.get(POSITION_COLUMN).and_then(|v| v.as_f64());
            record(time, value, position, i)
        })
        .collect()
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .with_context(|| format!("Row {row}, {col}[{j}]: not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names.
///
/// Trace-per-row: `time` and `value` cells contain semicolon-separated floats,
///   `"0.000;0.001;0.002"`, `"0.12;0.14;0.11"`.
/// Sample-per-row: `time` and `value` cells contain one float each and the
///   whole file is a single series (the usual well-log export).
fn load_csv(path: &Path) -> Result<Vec<TraceRecord>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("CSV missing '{name}' column"))
    };
    let t_idx = column(TIME_COLUMN)?;
    let v_idx = column(VALUE_COLUMN)?;
    let p_idx = headers.iter().position(|h| h == POSITION_COLUMN);

    let rows: Vec<csv::StringRecord> = reader
        .records()
        .enumerate()
        .map(|(row_no, r)| r.with_context(|| format!("CSV row {row_no}")))
        .collect::<Result<_>>()?;

    let sample_per_row = rows
        .first()
        .map(|r| !r.get(t_idx).unwrap_or("").contains(';'))
        .unwrap_or(false);

    if sample_per_row {
        let mut time = Vec::with_capacity(rows.len());
        let mut value = Vec::with_capacity(rows.len());
        for (row_no, r) in rows.iter().enumerate() {
            time.push(parse_float(r.get(t_idx).unwrap_or(""), row_no, TIME_COLUMN)?);
            value.push(parse_float(r.get(v_idx).unwrap_or(""), row_no, VALUE_COLUMN)?);
        }
        return Ok(vec![record(time, value, None, 0)?]);
    }

    rows.iter()
        .enumerate()
        .map(|(row_no, r)| {
            let time = parse_semicolon_floats(r.get(t_idx).unwrap_or(""), row_no, TIME_COLUMN)?;
            let value = parse_semicolon_floats(r.get(v_idx).unwrap_or(""), row_no, VALUE_COLUMN)?;
            let position = p_idx
                .and_then(|i| r.get(i))
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_float(s, row_no, POSITION_COLUMN))
                .transpose()?;
            record(time, value, position, row_no)
        })
        .collect()
}

fn parse_float(s: &str, row: usize, col: &str) -> Result<f64> {
    s.trim()
        .parse::<f64>()
        .with_context(|| format!("Row {row}, {col}: '{s}' is not a number"))
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing one trace per row.
///
/// Expected schema:
/// - `time`:  List<Float64> or LargeList<Float64> – sample times in seconds
/// - `value`: List<Float64> or LargeList<Float64> – sample values
/// - `position` (optional): numeric lateral trace position
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Vec<TraceRecord>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let t_idx = schema
            .index_of(TIME_COLUMN)
            .map_err(|_| anyhow::anyhow!("Parquet file missing '{TIME_COLUMN}' column"))?;
        let v_idx = schema
            .index_of(VALUE_COLUMN)
            .map_err(|_| anyhow::anyhow!("Parquet file missing '{VALUE_COLUMN}' column"))?;
        let p_col = schema.index_of(POSITION_COLUMN).ok().map(|i| batch.column(i));

        let t_col = batch.column(t_idx);
        let v_col = batch.column(v_idx);

        for row in 0..batch.num_rows() {
            let row_no = records.len();
            let time = extract_f64_list(t_col, row)
                .with_context(|| format!("Row {row_no}: failed to read '{TIME_COLUMN}'"))?;
            let value = extract_f64_list(v_col, row)
                .with_context(|| format!("Row {row_no}: failed to read '{VALUE_COLUMN}'"))?;
            let position = p_col.and_then(|c| extract_scalar_f64(c, row));
            records.push(record(time, value, position, row_no)?);
        }
    }

    Ok(records)
}

// -- Parquet / Arrow helpers --

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

/// Read a numeric scalar cell as `f64`; `None` for nulls and non-numeric columns.
fn extract_scalar_f64(col: &Arc<dyn Array>, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Float64 => any.downcast_ref::<Float64Array>().map(|a| a.value(row)),
        DataType::Float32 => any.downcast_ref::<Float32Array>().map(|a| a.value(row) as f64),
        DataType::Int64 => any.downcast_ref::<Int64Array>().map(|a| a.value(row) as f64),
        DataType::Int32 => any.downcast_ref::<Int32Array>().map(|a| a.value(row) as f64),
        _ => None,
    }
}
