use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, Float64Builder, Int64Array, ListBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

use super::loader::{POSITION_COLUMN, TIME_COLUMN, VALUE_COLUMN};
use super::model::{InvertedVolume, TimeSeries};

const TRACE_COLUMN: &str = "trace";

/// Write the inverted traces, one record per trace, in the format given by
/// the extension.  The output reads back with [`load_volume`](super::loader::load_volume).
pub fn write_volume(path: &Path, volume: &InvertedVolume) -> Result<()> {
    write_traces(path, volume.traces(), None)
}

/// Write `traces` (and their lateral positions, when known).
pub fn write_traces(path: &Path, traces: &[TimeSeries], positions: Option<&[f64]>) -> Result<()> {
    if let Some(p) = positions {
        if p.len() != traces.len() {
            bail!("{} positions for {} traces", p.len(), traces.len());
        }
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => write_parquet(path, traces, positions),
        "json" => write_json(path, traces, positions),
        "csv" => write_csv(path, traces, positions),
        other => bail!("Unsupported output extension: .{other}"),
    }
    .with_context(|| format!("writing {}", path.display()))?;

    log::info!("Wrote {} traces to {}", traces.len(), path.display());
    Ok(())
}

/// Pretty-printed JSON of any serializable report.
pub fn write_report<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(report).context("serializing report")?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Wrote report to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct JsonTrace<'a> {
    trace: usize,
    time: &'a [f64],
    value: &'a [f64],
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<f64>,
}

fn write_json(path: &Path, traces: &[TimeSeries], positions: Option<&[f64]>) -> Result<()> {
    let records: Vec<JsonTrace> = traces
        .iter()
        .enumerate()
        .map(|(i, t)| JsonTrace {
            trace: i,
            time: t.time(),
            value: t.values(),
            position: positions.map(|p| p[i]),
        })
        .collect();
    let file = std::fs::File::create(path).context("creating JSON file")?;
    let mut out = std::io::BufWriter::new(file);
    serde_json::to_writer(&mut out, &records).context("writing JSON")?;
    out.flush().context("flushing JSON")?;
    Ok(())
}

fn write_csv(path: &Path, traces: &[TimeSeries], positions: Option<&[f64]>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    let mut header = vec![TRACE_COLUMN, TIME_COLUMN, VALUE_COLUMN];
    if positions.is_some() {
        header.push(POSITION_COLUMN);
    }
    writer.write_record(&header)?;

    for (i, t) in traces.iter().enumerate() {
        let mut row = vec![i.to_string(), join_semicolon(t.time()), join_semicolon(t.values())];
        if let Some(p) = positions {
            row.push(p[i].to_string());
        }
        writer.write_record(&row)?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn join_semicolon(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

fn write_parquet(path: &Path, traces: &[TimeSeries], positions: Option<&[f64]>) -> Result<()> {
    let list_field = || DataType::List(Arc::new(Field::new("item", DataType::Float64, true)));
    let mut fields = vec![
        Field::new(TRACE_COLUMN, DataType::Int64, false),
        Field::new(TIME_COLUMN, list_field(), false),
        Field::new(VALUE_COLUMN, list_field(), false),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(0..traces.len() as i64)),
        Arc::new(list_array(traces.iter().map(|t| t.time()))),
        Arc::new(list_array(traces.iter().map(|t| t.values()))),
    ];
    if let Some(p) = positions {
        fields.push(Field::new(POSITION_COLUMN, DataType::Float64, false));
        columns.push(Arc::new(Float64Array::from(p.to_vec())));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn list_array<'a>(rows: impl Iterator<Item = &'a [f64]>) -> arrow::array::ListArray {
    let mut builder = ListBuilder::new(Float64Builder::new());
    for row in rows {
        builder.values().append_slice(row);
        builder.append(true);
    }
    builder.finish()
}
