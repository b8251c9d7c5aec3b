//! Cell address and range codec.
//!
//! Addresses are the usual "A1" form: uppercase column letters in
//! bijective base-26 (A=1, Z=26, AA=27) followed by a 1-based row number.

use serde::Serialize;

use crate::error::{Result, XlqError};

/// A single cell position, 1-based in both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellAddress {
    pub col: u32,
    pub row: u32,
}

impl CellAddress {
    pub fn new(col: u32, row: u32) -> Self {
        CellAddress { col, row }
    }

    /// Canonical textual form, e.g. `AA27`.
    pub fn to_a1(&self) -> String {
        format_address(self.col, self.row)
    }
}

/// A rectangular cell range. Construction normalises so that
/// `start.col <= end.col` and `start.row <= end.row`; a degenerate range
/// where start equals end names a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        let (start_col, end_col) = if a.col <= b.col { (a.col, b.col) } else { (b.col, a.col) };
        let (start_row, end_row) = if a.row <= b.row { (a.row, b.row) } else { (b.row, a.row) };
        CellRange {
            start: CellAddress::new(start_col, start_row),
            end: CellAddress::new(end_col, end_row),
        }
    }

    /// Componentwise inclusion test.
    pub fn contains(&self, col: u32, row: u32) -> bool {
        col >= self.start.col && col <= self.end.col && row >= self.start.row && row <= self.end.row
    }

    /// `A1` for a single cell, `A1:C10` otherwise.
    pub fn to_a1(&self) -> String {
        if self.start == self.end {
            self.start.to_a1()
        } else {
            format!("{}:{}", self.start.to_a1(), self.end.to_a1())
        }
    }
}

/// Convert column letters to a 1-based column number.
/// Assumes the input is already validated as `[A-Z]+`.
pub fn column_name_to_number(name: &str) -> u32 {
    let mut result: u32 = 0;
    for ch in name.chars() {
        result = result * 26 + (ch as u32 - 'A' as u32 + 1);
    }
    result
}

/// Convert a 1-based column number to column letters.
pub fn column_number_to_name(col: u32) -> String {
    let mut name = String::new();
    let mut col = col;
    while col > 0 {
        col -= 1;
        name.insert(0, (b'A' + (col % 26) as u8) as char);
        col /= 26;
    }
    name
}

/// Format a `(col, row)` pair as an address like `A1`.
pub fn format_address(col: u32, row: u32) -> String {
    format!("{}{}", column_number_to_name(col), row)
}

/// Parse an address like `"A1"` or `" aa27 "` into a [`CellAddress`].
///
/// Surrounding whitespace is trimmed and letters are uppercased; anything
/// not matching `[A-Z]+[1-9][0-9]*` is rejected.
pub fn parse_address(addr: &str) -> Result<CellAddress> {
    let addr = addr.trim().to_uppercase();
    let letters_end = addr.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    let (letters, digits) = addr.split_at(letters_end);
    if letters.is_empty()
        || digits.is_empty()
        || digits.starts_with('0')
        || !digits.chars().all(|c| c.is_ascii_digit())
    {
        return Err(XlqError::InvalidAddress(addr));
    }
    let row: u32 = digits
        .parse()
        .map_err(|_| XlqError::InvalidAddress(addr.clone()))?;
    if row < 1 {
        return Err(XlqError::InvalidAddress(addr));
    }
    Ok(CellAddress::new(column_name_to_number(letters), row))
}

/// Parse a range like `"A1:C10"`, or a single address as a degenerate
/// range. Reversed corners are normalised.
pub fn parse_range(range: &str) -> Result<CellRange> {
    let range = range.trim();
    let mut parts = range.split(':');
    let first = parts.next().unwrap_or("");
    match (parts.next(), parts.next()) {
        (None, _) => {
            let a = parse_address(first)?;
            Ok(CellRange::new(a, a))
        }
        (Some(second), None) => {
            let a = parse_address(first)
                .map_err(|_| XlqError::InvalidRange(format!("invalid start in {range}")))?;
            let b = parse_address(second)
                .map_err(|_| XlqError::InvalidRange(format!("invalid end in {range}")))?;
            Ok(CellRange::new(a, b))
        }
        (Some(_), Some(_)) => Err(XlqError::InvalidRange(range.to_string())),
    }
}

/// Whether a string parses as a range; used by the CLI to disambiguate a
/// positional that may be a sheet name or a range.
pub fn is_valid_range(s: &str) -> bool {
    parse_range(s).is_ok()
}
