//! Write-side subcommands: write, append, create.

use anyhow::{Context, Result};
use serde_json::Value;
use xlq_core::writer::ValueKind;
use xlq_core::Engine;

use crate::format::{self, OutputFormat};

pub fn write(
    engine: &Engine,
    file: &str,
    cell: &str,
    value: &str,
    sheet: Option<&str>,
    value_type: &str,
    format: OutputFormat,
) -> Result<()> {
    let kind = ValueKind::parse(value_type)?;
    let outcome = engine.write_cell(
        file,
        sheet.unwrap_or(""),
        cell,
        &Value::String(value.to_string()),
        kind,
    )?;
    format::write_single(&mut std::io::stdout(), format, &outcome)
}

/// Rows for `append` and `create --data` come from a file holding a JSON
/// array of arrays.
fn load_rows(data_file: &str) -> Result<Vec<Vec<Value>>> {
    let data = std::fs::read_to_string(data_file)
        .with_context(|| format!("read data file {data_file}"))?;
    serde_json::from_str(&data)
        .with_context(|| format!("parse {data_file} as a JSON array of arrays"))
}

pub fn append(
    engine: &Engine,
    file: &str,
    data_file: &str,
    sheet: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let rows = load_rows(data_file)?;
    let outcome = engine.append_rows(file, sheet.unwrap_or(""), &rows)?;
    format::write_single(&mut std::io::stdout(), format, &outcome)
}

#[allow(clippy::too_many_arguments)]
pub fn create(
    engine: &Engine,
    file: &str,
    sheet: &str,
    headers: Option<&str>,
    data_file: Option<&str>,
    overwrite: bool,
    format: OutputFormat,
) -> Result<()> {
    let headers: Vec<String> = headers
        .filter(|h| !h.is_empty())
        .map(|h| h.split(',').map(str::to_string).collect())
        .unwrap_or_default();
    let rows = match data_file {
        Some(path) => load_rows(path)?,
        None => Vec::new(),
    };
    let outcome = engine.create_file(file, sheet, &headers, &rows, overwrite)?;
    format::write_single(&mut std::io::stdout(), format, &outcome)
}
