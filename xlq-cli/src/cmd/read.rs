//! Read-side subcommands: sheets, info, read, head, tail, search, cell.

use std::io::Write;

use anyhow::Result;
use xlq_core::addr::is_valid_range;
use xlq_core::{rows_to_values, CancelToken, Engine};

use crate::format::{self, OutputFormat};

pub fn sheets(engine: &Engine, file: &str, format: OutputFormat) -> Result<()> {
    let names = engine.sheets(file)?;
    format::write_string_list(&mut std::io::stdout(), format, &names)
}

pub fn info(engine: &Engine, file: &str, sheet: Option<&str>, format: OutputFormat) -> Result<()> {
    let info = engine.info(file, sheet.unwrap_or(""))?;
    format::write_single(&mut std::io::stdout(), format, &info)
}

/// `read <file> [sheet] [range]` — the second positional may be either a
/// sheet name or a range; a parseable range wins.
pub fn read(
    engine: &Engine,
    file: &str,
    sheet_or_range: Option<&str>,
    range: Option<&str>,
    limit: i64,
    format: OutputFormat,
) -> Result<()> {
    let (sheet, range) = match (sheet_or_range, range) {
        (Some(first), Some(second)) => (first, Some(second)),
        (Some(first), None) if is_valid_range(first) => ("", Some(first)),
        (Some(first), None) => (first, None),
        (None, _) => ("", None),
    };

    let slice = engine.read(file, sheet, range, limit, &CancelToken::new())?;
    if slice.truncated {
        eprintln!(
            "Warning: output truncated at {} rows (use --limit to adjust)",
            slice.limit
        );
    }
    format::write_rows(&mut std::io::stdout(), format, &rows_to_values(&slice.rows))
}

pub fn head(
    engine: &Engine,
    file: &str,
    sheet: Option<&str>,
    n: i64,
    format: OutputFormat,
) -> Result<()> {
    let slice = engine.head(file, sheet.unwrap_or(""), n, &CancelToken::new())?;
    format::write_rows(&mut std::io::stdout(), format, &rows_to_values(&slice.rows))
}

pub fn tail(
    engine: &Engine,
    file: &str,
    sheet: Option<&str>,
    n: i64,
    format: OutputFormat,
) -> Result<()> {
    let slice = engine.tail(file, sheet.unwrap_or(""), n, &CancelToken::new())?;
    format::write_rows(&mut std::io::stdout(), format, &rows_to_values(&slice.rows))
}

#[allow(clippy::too_many_arguments)]
pub fn search(
    engine: &Engine,
    file: &str,
    pattern: &str,
    sheet: Option<&str>,
    ignore_case: bool,
    regex: bool,
    max: i64,
    format: OutputFormat,
) -> Result<()> {
    let outcome = engine.search(
        file,
        pattern,
        sheet.map(str::to_string),
        ignore_case,
        regex,
        max,
        &CancelToken::new(),
    )?;
    let mut stdout = std::io::stdout();
    match format {
        OutputFormat::Json => format::write_single(&mut stdout, format, &outcome.hits),
        OutputFormat::Csv | OutputFormat::Tsv => {
            let rows: Vec<Vec<String>> = outcome
                .hits
                .iter()
                .map(|h| {
                    vec![
                        h.sheet.clone(),
                        h.address.clone(),
                        h.value.clone(),
                        h.row.to_string(),
                        h.col.to_string(),
                    ]
                })
                .collect();
            format::write_rows(&mut stdout, format, &rows)
        }
    }
}

/// `cell <file> [sheet] <address>` — with one trailing positional it is
/// the address; with two, the first is the sheet.
pub fn cell(
    engine: &Engine,
    file: &str,
    first: &str,
    second: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let (sheet, address) = match second {
        Some(address) => (first, address),
        None => ("", first),
    };
    let cell = engine.cell(file, sheet, address)?;
    let mut stdout = std::io::stdout();
    format::write_single(&mut stdout, format, &cell)?;
    stdout.flush()?;
    Ok(())
}
