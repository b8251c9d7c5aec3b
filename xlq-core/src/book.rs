//! Thin wrapper over the workbook parser/serialiser.
//!
//! Everything the engine knows about the xlsx container goes through this
//! module: opening and creating workbooks, case-insensitive sheet
//! resolution, a pull-model row iterator, typed cell access, and the row
//! and sheet mutation primitives. Components above this layer never touch
//! the parser types directly.

use std::collections::BTreeMap;
use std::path::Path;

use umya_spreadsheet::{Cell as UCell, Spreadsheet, Worksheet};

use crate::addr::CellAddress;
use crate::error::{Result, XlqError};
use crate::CellKind;

/// A value coerced and ready to be stored in a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellScalar {
    Str(String),
    Num(f64),
    Bool(bool),
    /// Formula text without the leading `=`.
    Formula(String),
    Empty,
}

/// One sheet row as raw column values: left-justified from column 1, gaps
/// filled with empty strings, trailing empties trimmed.
#[derive(Debug, Clone)]
pub struct RowRecord {
    pub number: u32,
    pub values: Vec<String>,
}

/// An open workbook. A handle is owned by exactly one engine operation and
/// released when dropped, on every exit path.
#[derive(Debug)]
pub struct Workbook {
    book: Spreadsheet,
}

impl Workbook {
    /// Open an existing workbook file.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(XlqError::FileNotFound(path.display().to_string()));
        }
        let book = umya_spreadsheet::reader::xlsx::read(path)
            .map_err(|e| XlqError::parser(format!("open {}", path.display()), e))?;
        Ok(Workbook { book })
    }

    /// A fresh workbook with the parser's single default sheet (`Sheet1`).
    pub fn create() -> Self {
        Workbook {
            book: umya_spreadsheet::new_file(),
        }
    }

    /// Serialise to a file. Callers wanting atomic replacement go through
    /// [`crate::writer::save_atomic`], which writes to a sibling temp path.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        umya_spreadsheet::writer::xlsx::write(&self.book, path)
            .map_err(|e| XlqError::parser(format!("save {}", path.display()), e))
    }

    /// Sheet names in declaration order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.book
            .get_sheet_collection_no_check()
            .iter()
            .map(|ws| ws.get_name().to_string())
            .collect()
    }

    pub fn sheet_count(&self) -> usize {
        self.book.get_sheet_collection_no_check().len()
    }

    /// Resolve a sheet name to its actual casing. An empty name means the
    /// first sheet; otherwise the lookup is case-insensitive.
    pub fn resolve_sheet(&self, name: &str) -> Result<String> {
        let names = self.sheet_names();
        if name.is_empty() {
            return names
                .into_iter()
                .next()
                .ok_or_else(|| XlqError::SheetNotFound("<no sheets in workbook>".to_string()));
        }
        let wanted = name.to_lowercase();
        names
            .into_iter()
            .find(|n| n.to_lowercase() == wanted)
            .ok_or_else(|| XlqError::SheetNotFound(name.to_string()))
    }

    pub fn sheet_exists(&self, name: &str) -> bool {
        self.resolve_sheet(name).is_ok() && !name.is_empty()
    }

    fn worksheet(&self, resolved: &str) -> Result<&Worksheet> {
        self.book
            .get_sheet_by_name(resolved)
            .ok_or_else(|| XlqError::SheetNotFound(resolved.to_string()))
    }

    fn worksheet_mut(&mut self, resolved: &str) -> Result<&mut Worksheet> {
        self.book
            .get_sheet_by_name_mut(resolved)
            .ok_or_else(|| XlqError::SheetNotFound(resolved.to_string()))
    }

    /// Pull-model iterator over a sheet's rows in ascending row order.
    ///
    /// Only cell references are gathered up front; the per-row value
    /// strings are materialised lazily as the consumer pulls.
    pub fn rows(&self, sheet: &str) -> Result<SheetRows<'_>> {
        let resolved = self.resolve_sheet(sheet)?;
        let ws = self.worksheet(&resolved)?;
        let mut by_row: BTreeMap<u32, Vec<(u32, &UCell)>> = BTreeMap::new();
        for cell in ws.get_cell_collection() {
            let coord = cell.get_coordinate();
            by_row
                .entry(*coord.get_row_num())
                .or_default()
                .push((*coord.get_col_num(), cell));
        }
        let mut rows: Vec<(u32, Vec<(u32, &UCell)>)> = by_row.into_iter().collect();
        for (_, cells) in rows.iter_mut() {
            cells.sort_by_key(|(col, _)| *col);
        }
        Ok(SheetRows {
            rows: rows.into_iter(),
        })
    }

    /// Highest row number holding any data, 0 for an empty sheet.
    pub fn last_row(&self, sheet: &str) -> Result<u32> {
        Ok(self.rows(sheet)?.last().map(|r| r.number).unwrap_or(0))
    }

    /// Cell value in string form; empty string for absent cells.
    pub fn cell_value(&self, sheet: &str, addr: &CellAddress) -> Result<String> {
        let resolved = self.resolve_sheet(sheet)?;
        let ws = self.worksheet(&resolved)?;
        Ok(ws
            .get_cell((addr.col, addr.row))
            .map(|c| c.get_value().to_string())
            .unwrap_or_default())
    }

    /// Formula text with a leading `=`, or empty when the cell holds none.
    pub fn cell_formula(&self, sheet: &str, addr: &CellAddress) -> Result<String> {
        let resolved = self.resolve_sheet(sheet)?;
        let ws = self.worksheet(&resolved)?;
        let formula = ws
            .get_cell((addr.col, addr.row))
            .map(|c| c.get_formula().to_string())
            .unwrap_or_default();
        if formula.is_empty() || formula.starts_with('=') {
            Ok(formula)
        } else {
            Ok(format!("={formula}"))
        }
    }

    /// Type of a single cell, for targeted reads. Bulk streaming does not
    /// use this; it tags everything as a string.
    pub fn cell_kind(&self, sheet: &str, addr: &CellAddress) -> Result<CellKind> {
        let resolved = self.resolve_sheet(sheet)?;
        let ws = self.worksheet(&resolved)?;
        let cell = match ws.get_cell((addr.col, addr.row)) {
            Some(c) => c,
            None => return Ok(CellKind::Empty),
        };
        if cell.is_formula() {
            return Ok(CellKind::Formula);
        }
        let value = cell.get_value();
        Ok(kind_of_value(&value))
    }

    /// Store a coerced scalar in a cell, replacing any existing formula.
    pub fn set_cell(&mut self, sheet: &str, addr: &CellAddress, scalar: &CellScalar) -> Result<()> {
        let resolved = self.resolve_sheet(sheet)?;
        let ws = self.worksheet_mut(&resolved)?;
        let cell = ws.get_cell_mut((addr.col, addr.row));
        match scalar {
            CellScalar::Formula(f) => {
                cell.set_formula(f.strip_prefix('=').unwrap_or(f).to_string());
            }
            other => {
                cell.get_cell_value_mut().remove_formula();
                let text = match other {
                    CellScalar::Str(s) => s.clone(),
                    CellScalar::Num(n) => n.to_string(),
                    CellScalar::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
                    CellScalar::Empty => String::new(),
                    CellScalar::Formula(_) => unreachable!(),
                };
                cell.set_value(text);
            }
        }
        Ok(())
    }

    /// Write one row of scalars starting at `start`, one cell per column.
    pub fn set_row(&mut self, sheet: &str, start: &CellAddress, cells: &[CellScalar]) -> Result<()> {
        for (i, scalar) in cells.iter().enumerate() {
            let addr = CellAddress::new(start.col + i as u32, start.row);
            self.set_cell(sheet, &addr, scalar)?;
        }
        Ok(())
    }

    /// Shift rows down, opening `count` empty rows at `row`.
    pub fn insert_rows(&mut self, sheet: &str, row: u32, count: u32) -> Result<()> {
        let resolved = self.resolve_sheet(sheet)?;
        let ws = self.worksheet_mut(&resolved)?;
        ws.insert_new_row(&row, &count);
        Ok(())
    }

    /// Remove a single row, shifting later rows up.
    pub fn remove_row(&mut self, sheet: &str, row: u32) -> Result<()> {
        let resolved = self.resolve_sheet(sheet)?;
        let ws = self.worksheet_mut(&resolved)?;
        ws.remove_row(&row, &1);
        Ok(())
    }

    /// Add a sheet; the name must not collide case-insensitively.
    pub fn new_sheet(&mut self, name: &str) -> Result<()> {
        if self.sheet_exists(name) {
            return Err(XlqError::SheetAlreadyExists(name.to_string()));
        }
        self.book
            .new_sheet(name.to_string())
            .map_err(|e| XlqError::parser(format!("create sheet {name}"), e))?;
        Ok(())
    }

    /// Remove a sheet by its resolved name.
    pub fn delete_sheet(&mut self, resolved: &str) -> Result<()> {
        self.book
            .remove_sheet_by_name(resolved)
            .map_err(|e| XlqError::parser(format!("delete sheet {resolved}"), e))
    }

    /// Rename a sheet identified by its resolved name.
    pub fn rename_sheet(&mut self, resolved: &str, new_name: &str) -> Result<()> {
        let index = self
            .book
            .get_sheet_collection_no_check()
            .iter()
            .position(|ws| ws.get_name() == resolved)
            .ok_or_else(|| XlqError::SheetNotFound(resolved.to_string()))?;
        self.book
            .set_sheet_name(index, new_name.to_string())
            .map_err(|e| XlqError::parser(format!("rename sheet {resolved}"), e))?;
        Ok(())
    }
}

/// Classify a bare value string the way the parser reports cell content:
/// numbers and booleans keep their lexical form, error literals look like
/// `#DIV/0!`.
fn kind_of_value(value: &str) -> CellKind {
    if value.is_empty() {
        return CellKind::Empty;
    }
    if value.parse::<f64>().is_ok() {
        return CellKind::Number;
    }
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        return CellKind::Bool;
    }
    const ERROR_LITERALS: &[&str] = &[
        "#DIV/0!", "#N/A", "#NAME?", "#NULL!", "#NUM!", "#REF!", "#VALUE!",
    ];
    if ERROR_LITERALS.contains(&value) {
        return CellKind::Error;
    }
    CellKind::String
}

/// Pull iterator over a sheet's rows. Holds only cell references; dropping
/// it mid-iteration releases the workbook borrow immediately.
pub struct SheetRows<'a> {
    rows: std::vec::IntoIter<(u32, Vec<(u32, &'a UCell)>)>,
}

impl<'a> Iterator for SheetRows<'a> {
    type Item = RowRecord;

    fn next(&mut self) -> Option<RowRecord> {
        let (number, cells) = self.rows.next()?;
        let max_col = cells.last().map(|(col, _)| *col).unwrap_or(0);
        let mut values = vec![String::new(); max_col as usize];
        for (col, cell) in cells {
            values[(col - 1) as usize] = cell.get_value().to_string();
        }
        while values.last().map(|v| v.is_empty()).unwrap_or(false) {
            values.pop();
        }
        Some(RowRecord { number, values })
    }
}
