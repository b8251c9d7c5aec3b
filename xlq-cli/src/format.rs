//! Output encoding for the CLI: JSON (default), CSV, TSV.
//!
//! Row sets stream through the writer row by row; the JSON form emits the
//! array brackets itself so a large result never has to exist as a single
//! serialised string.

use std::io::Write;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
    Tsv,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "" | "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            other => bail!("unknown format: {other} (valid: json, csv, tsv)"),
        }
    }
}

/// Stream a row set to the writer.
pub fn write_rows<W: Write>(w: &mut W, format: OutputFormat, rows: &[Vec<String>]) -> Result<()> {
    match format {
        OutputFormat::Json => {
            w.write_all(b"[")?;
            for (i, row) in rows.iter().enumerate() {
                if i > 0 {
                    w.write_all(b",")?;
                }
                let encoded = serde_json::to_string(row).context("encode row as JSON")?;
                w.write_all(encoded.as_bytes())?;
            }
            w.write_all(b"]\n")?;
        }
        OutputFormat::Csv => {
            let mut csv = csv::Writer::from_writer(&mut *w);
            for row in rows {
                csv.write_record(row).context("write CSV row")?;
            }
            csv.flush().context("flush CSV output")?;
        }
        OutputFormat::Tsv => {
            for row in rows {
                writeln!(w, "{}", row.join("\t"))?;
            }
        }
    }
    Ok(())
}

/// A flat list of strings: a JSON array, or one delimiter-separated row.
pub fn write_string_list<W: Write>(
    w: &mut W,
    format: OutputFormat,
    items: &[String],
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let encoded = serde_json::to_string(items).context("encode list as JSON")?;
            writeln!(w, "{encoded}")?;
        }
        OutputFormat::Csv | OutputFormat::Tsv => {
            write_rows(w, format, std::slice::from_ref(&items.to_vec()))?;
        }
    }
    Ok(())
}

/// A single object (sheet info, a cell, a write outcome). Delimiter
/// formats have no well-defined field order for objects, so these always
/// serialise as JSON.
pub fn write_single<W: Write>(w: &mut W, _format: OutputFormat, value: &impl Serialize) -> Result<()> {
    let encoded = serde_json::to_string(value).context("encode value as JSON")?;
    writeln!(w, "{encoded}")?;
    Ok(())
}
