//! Workbook access engine for xlq.
//!
//! The engine treats a workbook the way a structured-text query tool
//! treats JSON: an opaque store from which small, bounded slices are read
//! or into which small, bounded slices are written. Both front-ends (the
//! CLI and the stdio tool server) go through [`engine::Engine`]; the path
//! sandbox and the numeric limits are enforced there and nowhere else.

pub mod addr;
pub mod book;
pub mod cancel;
pub mod engine;
pub mod error;
pub mod limits;
pub mod mutate;
pub mod sandbox;
pub mod search;
pub mod shape;
pub mod stream;
pub mod tail;
pub mod writer;

use serde::Serialize;

pub use addr::{CellAddress, CellRange};
pub use book::Workbook;
pub use cancel::CancelToken;
pub use engine::Engine;
pub use error::{Result, XlqError};
pub use sandbox::Sandbox;
pub use search::SearchOptions;
pub use writer::{ValueKind, WriteOutcome};

/// Tag describing what a cell holds.
///
/// On read an empty value is always `Empty`; for written cells the tag is
/// the explicit or inferred kind, not re-derived from the stored string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    String,
    Number,
    Bool,
    Formula,
    Error,
    Empty,
}

/// A single cell with its location and string value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub address: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: CellKind,
    pub row: u32,
    pub col: u32,
}

/// A row of cells in column order, left-justified from column 1. Trailing
/// empty cells are not represented.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    #[serde(rename = "row")]
    pub number: u32,
    pub cells: Vec<Cell>,
}

impl Row {
    /// Bare column values, for delimiter-separated output.
    pub fn values(&self) -> Vec<String> {
        self.cells.iter().map(|c| c.value.clone()).collect()
    }
}

/// Metadata about one worksheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetInfo {
    pub name: String,
    pub rows: u32,
    pub cols: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
}

/// A cell that matched a search pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub sheet: String,
    pub address: String,
    pub value: String,
    pub row: u32,
    pub col: u32,
}

/// Convert rows to bare string matrices for the output formatters.
pub fn rows_to_values(rows: &[Row]) -> Vec<Vec<String>> {
    rows.iter().map(|r| r.values()).collect()
}
