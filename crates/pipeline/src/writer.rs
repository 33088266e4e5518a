//! CSV and JSON output.
//!
//! Each table is written twice: a CSV file with a header row and an HXL tag
//! row, and a JSON file holding a metadata envelope and one object per row
//! keyed by HXL tag.

use crate::driver::PipelineOutput;
use iati_core::config::{OutputFileConfig, OutputsConfig};
use iati_core::{Error, OutputRow, Result};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Write both tables of a run into the configured folder.
pub fn write_outputs(today: &str, outputs: &OutputsConfig, output: &PipelineOutput) -> Result<()> {
    let folder = Path::new(&outputs.folder);
    std::fs::create_dir_all(folder)?;

    write_output(today, folder, "flows", &outputs.flows, &output.flows, None)?;
    write_output(
        today,
        folder,
        "transactions",
        &outputs.transactions,
        &output.transactions,
        Some(output.stats.skipped_transactions),
    )?;
    Ok(())
}

/// Write one table as CSV and JSON.
pub fn write_output<R: OutputRow>(
    today: &str,
    folder: &Path,
    key: &str,
    file: &OutputFileConfig,
    rows: &[R],
    skipped: Option<usize>,
) -> Result<()> {
    if file.headers.len() != file.hxltags.len() {
        return Err(Error::config(format!("{}: headers and hxltags differ in length", key)));
    }

    let csv_path = folder.join(&file.csv);
    let mut csv_writer = csv::Writer::from_path(&csv_path).map_err(|e| Error::output(e.to_string()))?;
    csv_writer
        .write_record(&file.headers)
        .map_err(|e| Error::output(e.to_string()))?;
    csv_writer
        .write_record(&file.hxltags)
        .map_err(|e| Error::output(e.to_string()))?;

    let mut json = BufWriter::new(File::create(folder.join(&file.json))?);
    let metadata = metadata(today, key, rows.len(), skipped);
    write!(json, "{{\"metadata\":{},\"data\":[", serde_json::to_string(&metadata)?)?;

    for (index, row) in rows.iter().enumerate() {
        let values = row.values();
        if values.len() != file.hxltags.len() {
            return Err(Error::output(format!(
                "{}: row has {} fields but {} columns are configured",
                key,
                values.len(),
                file.hxltags.len()
            )));
        }

        csv_writer
            .write_record(values.iter().map(csv_field))
            .map_err(|e| Error::output(e.to_string()))?;

        if index > 0 {
            json.write_all(b",")?;
        }
        json.write_all(b"\n")?;
        write_json_row(&mut json, &file.hxltags, &values)?;
    }

    json.write_all(b"]}")?;
    json.flush()?;
    csv_writer.flush()?;

    info!("Wrote {} {} rows to {}", rows.len(), key, csv_path.display());
    Ok(())
}

/// Metadata envelope: run date, row count and optional skip count.
fn metadata(today: &str, key: &str, rows: usize, skipped: Option<usize>) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("#date+run".to_string(), Value::from(today));
    metadata.insert(format!("#meta+{}+num", key), Value::from(rows));
    if let Some(skipped) = skipped {
        metadata.insert(format!("#meta+{}+skipped+num", key), Value::from(skipped));
    }
    metadata
}

/// Write one row object, keeping the column order of `hxltags`.
fn write_json_row<W: Write>(out: &mut W, hxltags: &[String], values: &[Value]) -> Result<()> {
    out.write_all(b"{")?;
    for (i, (tag, value)) in hxltags.iter().zip(values).enumerate() {
        if i > 0 {
            out.write_all(b",")?;
        }
        write!(out, "{}:{}", serde_json::to_string(tag)?, serde_json::to_string(value)?)?;
    }
    out.write_all(b"}")?;
    Ok(())
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
