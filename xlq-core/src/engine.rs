//! The engine façade: the single entry point for both front-ends.
//!
//! Every operation resolves its path through the sandbox, applies the
//! numeric limits, opens its own workbook handle, dispatches to the right
//! component, and returns a typed outcome. Nothing above this layer gets
//! to touch paths or workbooks directly, so the sandbox cannot be
//! bypassed.

use std::path::PathBuf;

use serde_json::Value;

use crate::addr::parse_address;
use crate::book::Workbook;
use crate::cancel::CancelToken;
use crate::error::Result;
use crate::limits;
use crate::sandbox::Sandbox;
use crate::search::{self, SearchOptions};
use crate::stream::{collect_rows, collect_rows_with_limit, stream_range, stream_rows};
use crate::writer::{self, ValueKind, WriteOutcome};
use crate::{mutate, tail, Cell, Row, SearchHit, SheetInfo};

/// A bounded set of rows plus how it was bounded.
#[derive(Debug)]
pub struct RowSlice {
    pub rows: Vec<Row>,
    pub truncated: bool,
    pub limit: usize,
}

/// A bounded set of search hits plus how it was bounded.
#[derive(Debug)]
pub struct SearchOutcome {
    pub hits: Vec<SearchHit>,
    pub truncated: bool,
    pub limit: usize,
}

/// The workbook access engine. Holds the immutable sandbox; everything
/// else is per-call state.
pub struct Engine {
    sandbox: Sandbox,
}

impl Engine {
    pub fn new(sandbox: Sandbox) -> Self {
        Engine { sandbox }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Sheet names in declaration order.
    pub fn sheets(&self, path: &str) -> Result<Vec<String>> {
        let path = self.sandbox.validate_read(path)?;
        let workbook = Workbook::open(&path)?;
        Ok(workbook.sheet_names())
    }

    /// Sheet metadata: highest populated row, widest row, first-row headers.
    pub fn info(&self, path: &str, sheet: &str) -> Result<SheetInfo> {
        let path = self.sandbox.validate_read(path)?;
        let workbook = Workbook::open(&path)?;
        let name = workbook.resolve_sheet(sheet)?;

        let mut rows = 0u32;
        let mut cols = 0usize;
        let mut headers: Vec<String> = Vec::new();
        for (i, record) in workbook.rows(&name)?.enumerate() {
            rows = record.number;
            cols = cols.max(record.values.len());
            if i == 0 {
                headers = record.values.clone();
            }
        }
        Ok(SheetInfo {
            name,
            rows,
            cols: cols as u32,
            headers,
        })
    }

    /// Read a range, or the whole sheet under the row limit when no range
    /// is given.
    pub fn read(
        &self,
        path: &str,
        sheet: &str,
        range: Option<&str>,
        limit: i64,
        cancel: &CancelToken,
    ) -> Result<RowSlice> {
        let path = self.sandbox.validate_read(path)?;
        let workbook = Workbook::open(&path)?;
        match range {
            Some(range) => {
                let rows = collect_rows(stream_range(&workbook, sheet, range, cancel.clone())?)?;
                let limit = rows.len();
                Ok(RowSlice {
                    rows,
                    truncated: false,
                    limit,
                })
            }
            None => {
                let limit = limits::clamp_count(limit, limits::DEFAULT_ROW_LIMIT, limits::MAX_ROW_LIMIT);
                let stream = stream_rows(&workbook, sheet, 0, 0, cancel.clone())?;
                let (rows, _total, truncated) = collect_rows_with_limit(stream, limit)?;
                Ok(RowSlice {
                    rows,
                    truncated,
                    limit,
                })
            }
        }
    }

    /// First N rows.
    pub fn head(&self, path: &str, sheet: &str, n: i64, cancel: &CancelToken) -> Result<RowSlice> {
        let limit = limits::clamp_count(n, limits::DEFAULT_HEAD_ROWS, limits::MAX_HEAD_ROWS);
        let path = self.sandbox.validate_read(path)?;
        let workbook = Workbook::open(&path)?;
        let rows = collect_rows(stream_rows(&workbook, sheet, 1, limit as u32, cancel.clone())?)?;
        let truncated = rows.len() == limit;
        Ok(RowSlice {
            rows,
            truncated,
            limit,
        })
    }

    /// Last N rows, in original order, with bounded memory.
    pub fn tail(&self, path: &str, sheet: &str, n: i64, cancel: &CancelToken) -> Result<RowSlice> {
        let limit = limits::clamp_count(n, limits::DEFAULT_TAIL_ROWS, limits::MAX_TAIL_ROWS);
        let path = self.sandbox.validate_read(path)?;
        let workbook = Workbook::open(&path)?;
        let (rows, seen) = tail::tail(&workbook, sheet, limit, cancel)?;
        Ok(RowSlice {
            rows,
            truncated: seen > limit,
            limit,
        })
    }

    /// Pattern search over one sheet or all of them.
    pub fn search(
        &self,
        path: &str,
        pattern: &str,
        sheet: Option<String>,
        case_insensitive: bool,
        regex: bool,
        max_results: i64,
        cancel: &CancelToken,
    ) -> Result<SearchOutcome> {
        let limit = limits::clamp_search_results(max_results);
        let path = self.sandbox.validate_read(path)?;
        let workbook = Workbook::open(&path)?;
        let opts = SearchOptions {
            sheet,
            case_insensitive,
            regex,
            max_results: limit,
        };
        let hits = search::collect_hits(search::search(&workbook, pattern, opts, cancel.clone())?)?;
        let truncated = hits.len() >= limit;
        Ok(SearchOutcome {
            hits,
            truncated,
            limit,
        })
    }

    /// A single cell with the parser's type information consulted.
    pub fn cell(&self, path: &str, sheet: &str, address: &str) -> Result<Cell> {
        let path = self.sandbox.validate_read(path)?;
        let workbook = Workbook::open(&path)?;
        let name = workbook.resolve_sheet(sheet)?;
        let addr = parse_address(address)?;
        let value = workbook.cell_value(&name, &addr)?;
        let kind = workbook.cell_kind(&name, &addr)?;
        Ok(Cell {
            address: addr.to_a1(),
            value,
            kind,
            row: addr.row,
            col: addr.col,
        })
    }

    fn resolve_mutation_target(&self, path: &str) -> Result<PathBuf> {
        let resolved = self.sandbox.validate_write(path, true)?;
        self.sandbox.check_write_size(&resolved)?;
        Ok(resolved)
    }

    pub fn write_cell(
        &self,
        path: &str,
        sheet: &str,
        cell: &str,
        value: &Value,
        kind: ValueKind,
    ) -> Result<WriteOutcome> {
        let path = self.resolve_mutation_target(path)?;
        writer::write_cell(&path, sheet, cell, value, kind)
    }

    pub fn append_rows(&self, path: &str, sheet: &str, rows: &[Vec<Value>]) -> Result<WriteOutcome> {
        let path = self.resolve_mutation_target(path)?;
        mutate::append_rows(&path, sheet, rows)
    }

    pub fn insert_rows(
        &self,
        path: &str,
        sheet: &str,
        row: u32,
        rows: &[Vec<Value>],
    ) -> Result<WriteOutcome> {
        let path = self.resolve_mutation_target(path)?;
        mutate::insert_rows(&path, sheet, row, rows)
    }

    pub fn delete_rows(&self, path: &str, sheet: &str, start: u32, count: u32) -> Result<WriteOutcome> {
        let path = self.resolve_mutation_target(path)?;
        mutate::delete_rows(&path, sheet, start, count)
    }

    pub fn write_range(
        &self,
        path: &str,
        sheet: &str,
        start_cell: &str,
        data: &[Vec<Value>],
    ) -> Result<WriteOutcome> {
        let path = self.resolve_mutation_target(path)?;
        mutate::write_range(&path, sheet, start_cell, data)
    }

    pub fn create_sheet(&self, path: &str, name: &str, headers: &[String]) -> Result<WriteOutcome> {
        let path = self.resolve_mutation_target(path)?;
        mutate::create_sheet(&path, name, headers)
    }

    pub fn delete_sheet(&self, path: &str, name: &str) -> Result<WriteOutcome> {
        let path = self.resolve_mutation_target(path)?;
        mutate::delete_sheet(&path, name)
    }

    pub fn rename_sheet(&self, path: &str, old: &str, new: &str) -> Result<WriteOutcome> {
        let path = self.resolve_mutation_target(path)?;
        mutate::rename_sheet(&path, old, new)
    }

    pub fn create_file(
        &self,
        path: &str,
        sheet_name: &str,
        headers: &[String],
        rows: &[Vec<Value>],
        overwrite: bool,
    ) -> Result<WriteOutcome> {
        let path = self.sandbox.validate_write(path, overwrite)?;
        mutate::create_file(&path, sheet_name, headers, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::XlqError;
    use serde_json::json;

    struct Fixture {
        _dir: tempfile::TempDir,
        engine: Engine,
        root: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::initialize([dir.path().to_string_lossy().as_ref()]).unwrap();
        let root = dir.path().canonicalize().unwrap();
        Fixture {
            _dir: dir,
            engine: Engine::new(sandbox),
            root,
        }
    }

    fn path_str(f: &Fixture, name: &str) -> String {
        f.root.join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn create_then_sheets_then_info_agree() {
        let f = fixture();
        let path = path_str(&f, "people.xlsx");
        let headers = vec!["Name".to_string(), "Age".to_string(), "City".to_string()];
        let rows = vec![
            vec![json!("alice"), json!(31), json!("Oslo")],
            vec![json!("bob"), json!(27), json!("Lima")],
        ];
        f.engine
            .create_file(&path, "People", &headers, &rows, false)
            .unwrap();

        assert_eq!(f.engine.sheets(&path).unwrap(), vec!["People".to_string()]);

        let info = f.engine.info(&path, "").unwrap();
        assert_eq!(info.name, "People");
        assert_eq!(info.rows, 3); // headers + 2 data rows
        assert_eq!(info.cols, 3);
        assert_eq!(info.headers, headers);
    }

    #[test]
    fn sheets_lists_declaration_order() {
        let f = fixture();
        let path = path_str(&f, "multi.xlsx");
        f.engine.create_file(&path, "Data", &[], &[], false).unwrap();
        f.engine.create_sheet(&path, "Products", &[]).unwrap();
        assert_eq!(
            f.engine.sheets(&path).unwrap(),
            vec!["Data".to_string(), "Products".to_string()]
        );
    }

    #[test]
    fn append_then_tail_round_trips() {
        let f = fixture();
        let path = path_str(&f, "log.xlsx");
        f.engine
            .create_file(&path, "", &["Event".to_string()], &[], false)
            .unwrap();

        let appended = vec![
            vec![json!("boot"), json!(1)],
            vec![json!("login"), json!(2)],
            vec![json!("halt"), json!(3)],
        ];
        f.engine.append_rows(&path, "", &appended).unwrap();

        let slice = f
            .engine
            .tail(&path, "", appended.len() as i64, &CancelToken::new())
            .unwrap();
        assert_eq!(slice.rows.len(), 3);
        let values: Vec<Vec<String>> = slice.rows.iter().map(|r| r.values()).collect();
        assert_eq!(
            values,
            vec![
                vec!["boot".to_string(), "1".to_string()],
                vec!["login".to_string(), "2".to_string()],
                vec!["halt".to_string(), "3".to_string()],
            ]
        );
    }

    #[test]
    fn insert_then_read_shows_shifted_rows() {
        let f = fixture();
        let path = path_str(&f, "shift.xlsx");
        let rows = vec![vec![json!("r1")], vec![json!("r2")], vec![json!("r3")]];
        f.engine.create_file(&path, "", &[], &rows, false).unwrap();

        f.engine
            .insert_rows(&path, "", 2, &[vec![json!("i1")], vec![json!("i2")]])
            .unwrap();

        let slice = f
            .engine
            .read(&path, "", None, 0, &CancelToken::new())
            .unwrap();
        let first_col: Vec<String> = slice
            .rows
            .iter()
            .map(|r| r.cells.first().map(|c| c.value.clone()).unwrap_or_default())
            .collect();
        assert_eq!(first_col, vec!["r1", "i1", "i2", "r2", "r3"]);
    }

    #[test]
    fn read_clamps_and_reports_truncation() {
        let f = fixture();
        let path = path_str(&f, "wide.xlsx");
        let rows: Vec<Vec<Value>> = (1..=20).map(|i| vec![json!(i)]).collect();
        f.engine.create_file(&path, "", &[], &rows, false).unwrap();

        let slice = f.engine.read(&path, "", None, 5, &CancelToken::new()).unwrap();
        assert_eq!(slice.rows.len(), 5);
        assert!(slice.truncated);
        assert_eq!(slice.limit, 5);

        let range = f
            .engine
            .read(&path, "", Some("A2:A4"), 0, &CancelToken::new())
            .unwrap();
        assert_eq!(range.rows.len(), 3);
        assert!(!range.truncated);
    }

    #[test]
    fn head_returns_leading_rows() {
        let f = fixture();
        let path = path_str(&f, "head.xlsx");
        let rows: Vec<Vec<Value>> = (1..=10).map(|i| vec![json!(format!("row{i}"))]).collect();
        f.engine.create_file(&path, "", &[], &rows, false).unwrap();

        let slice = f.engine.head(&path, "", 3, &CancelToken::new()).unwrap();
        assert_eq!(slice.rows.len(), 3);
        assert_eq!(slice.rows[0].cells[0].value, "row1");
        assert_eq!(slice.rows[2].cells[0].value, "row3");
    }

    #[test]
    fn search_finds_hits_across_sheets() {
        let f = fixture();
        let path = path_str(&f, "greet.xlsx");
        let rows = vec![
            vec![json!("Hello World")],
            vec![json!("hello")],
            vec![json!("Goodbye")],
            vec![json!("hello again")],
            vec![json!("Another Hello")],
        ];
        f.engine.create_file(&path, "", &[], &rows, false).unwrap();

        let outcome = f
            .engine
            .search(&path, "hello", None, true, false, 0, &CancelToken::new())
            .unwrap();
        assert_eq!(outcome.hits.len(), 4);
        assert!(outcome
            .hits
            .windows(2)
            .all(|pair| pair[0].row < pair[1].row));
    }

    #[test]
    fn cell_reports_value_and_kind() {
        let f = fixture();
        let path = path_str(&f, "typed.xlsx");
        f.engine
            .create_file(&path, "", &[], &[vec![json!("text"), json!(12.5)]], false)
            .unwrap();

        let a1 = f.engine.cell(&path, "", "a1").unwrap();
        assert_eq!(a1.address, "A1");
        assert_eq!(a1.value, "text");
        assert_eq!(a1.kind, crate::CellKind::String);

        let b1 = f.engine.cell(&path, "", "B1").unwrap();
        assert_eq!(b1.kind, crate::CellKind::Number);

        let empty = f.engine.cell(&path, "", "Z9").unwrap();
        assert_eq!(empty.kind, crate::CellKind::Empty);
        assert_eq!(empty.value, "");
    }

    #[test]
    fn write_cell_round_trips_formula() {
        let f = fixture();
        let path = path_str(&f, "formula.xlsx");
        f.engine
            .create_file(&path, "", &[], &[vec![json!("old")]], false)
            .unwrap();

        let outcome = f
            .engine
            .write_cell(&path, "", "A1", &json!("=SUM(A2:A4)"), ValueKind::Formula)
            .unwrap();
        match outcome {
            WriteOutcome::CellWritten {
                previous_value,
                new_value,
                ..
            } => {
                assert_eq!(previous_value, json!("old"));
                assert_eq!(new_value, json!("=SUM(A2:A4)"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn traversal_outside_sandbox_is_denied() {
        let f = fixture();
        match f.engine.sheets("../../etc/passwd") {
            Err(XlqError::PathOutsideAllowed(_)) | Err(XlqError::FileNotFound(_)) => {}
            other => panic!("expected denial, got {:?}", other.map(|_| ())),
        }
        match f
            .engine
            .sandbox()
            .validate_write("../../etc/passwd", true)
        {
            Err(XlqError::PathOutsideAllowed(_)) => {}
            other => panic!("expected PathOutsideAllowed, got {other:?}"),
        }
    }

    #[test]
    fn create_file_respects_overwrite_flag() {
        let f = fixture();
        let path = path_str(&f, "dup.xlsx");
        f.engine.create_file(&path, "First", &[], &[], false).unwrap();
        match f.engine.create_file(&path, "Second", &[], &[], false) {
            Err(XlqError::FileExists(_)) => {}
            other => panic!("expected FileExists, got {:?}", other.map(|_| ())),
        }
        f.engine.create_file(&path, "Second", &[], &[], true).unwrap();
        assert_eq!(f.engine.sheets(&path).unwrap(), vec!["Second".to_string()]);
        assert!(!f.root.join("dup.xlsx.tmp").exists());
    }

    #[test]
    fn cancelled_token_aborts_reads() {
        let f = fixture();
        let path = path_str(&f, "cancel.xlsx");
        let rows: Vec<Vec<Value>> = (1..=50).map(|i| vec![json!(i)]).collect();
        f.engine.create_file(&path, "", &[], &rows, false).unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            f.engine.read(&path, "", None, 0, &cancel),
            Err(XlqError::Cancelled)
        ));
        assert!(matches!(
            f.engine.tail(&path, "", 5, &cancel),
            Err(XlqError::Cancelled)
        ));
    }
}
