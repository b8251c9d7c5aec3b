//! Row, sheet, and file mutations.
//!
//! Every operation opens its own workbook handle, applies the change, and
//! persists through the atomic save protocol. Counts are validated against
//! the engine limits before anything is touched; paths arriving here are
//! already sandbox-validated.

use std::path::Path;

use serde_json::Value;

use crate::addr::{format_address, parse_address, CellAddress};
use crate::book::{CellScalar, Workbook};
use crate::error::{Result, XlqError};
use crate::limits;
use crate::writer::{coerce, save_atomic, ValueKind, WriteOutcome};

fn coerce_row(row: &[Value]) -> Result<Vec<CellScalar>> {
    row.iter().map(|v| coerce(v, ValueKind::Auto)).collect()
}

/// Append rows after the last row holding any data.
pub fn append_rows(path: &Path, sheet: &str, rows: &[Vec<Value>]) -> Result<WriteOutcome> {
    if rows.len() > limits::MAX_WRITE_ROWS {
        return Err(XlqError::CountLimitExceeded {
            count: rows.len(),
            limit: limits::MAX_WRITE_ROWS,
        });
    }

    let mut workbook = Workbook::open(path)?;
    let resolved = workbook.resolve_sheet(sheet)?;
    let last = workbook.last_row(&resolved)?;
    let first = last + 1;

    for (i, row) in rows.iter().enumerate() {
        let scalars = coerce_row(row)?;
        let start = CellAddress::new(1, first + i as u32);
        workbook.set_row(&resolved, &start, &scalars)?;
    }
    save_atomic(&workbook, path)?;

    Ok(WriteOutcome::RowsAppended {
        success: true,
        rows_added: rows.len(),
        starting_row: first,
        ending_row: last + rows.len() as u32,
    })
}

/// Shift existing rows down and write new rows starting at `row`.
pub fn insert_rows(path: &Path, sheet: &str, row: u32, rows: &[Vec<Value>]) -> Result<WriteOutcome> {
    if row < 1 {
        return Err(XlqError::InvalidRange(format!(
            "insert position must be >= 1, got {row}"
        )));
    }
    if rows.len() > limits::MAX_WRITE_ROWS {
        return Err(XlqError::CountLimitExceeded {
            count: rows.len(),
            limit: limits::MAX_WRITE_ROWS,
        });
    }

    let mut workbook = Workbook::open(path)?;
    let resolved = workbook.resolve_sheet(sheet)?;
    workbook.insert_rows(&resolved, row, rows.len() as u32)?;
    for (i, data) in rows.iter().enumerate() {
        let scalars = coerce_row(data)?;
        let start = CellAddress::new(1, row + i as u32);
        workbook.set_row(&resolved, &start, &scalars)?;
    }
    save_atomic(&workbook, path)?;

    Ok(WriteOutcome::RowsInserted {
        success: true,
        rows_inserted: rows.len(),
        starting_row: row,
        ending_row: row + rows.len() as u32 - 1,
    })
}

/// Delete `count` rows starting at `start`. Removal walks from the highest
/// index downward so shifting never invalidates a pending deletion.
pub fn delete_rows(path: &Path, sheet: &str, start: u32, count: u32) -> Result<WriteOutcome> {
    if start < 1 {
        return Err(XlqError::InvalidRange(format!(
            "start row must be >= 1, got {start}"
        )));
    }
    if count < 1 {
        return Err(XlqError::InvalidRange(format!(
            "count must be >= 1, got {count}"
        )));
    }
    if count as usize > limits::MAX_WRITE_ROWS {
        return Err(XlqError::CountLimitExceeded {
            count: count as usize,
            limit: limits::MAX_WRITE_ROWS,
        });
    }

    let mut workbook = Workbook::open(path)?;
    let resolved = workbook.resolve_sheet(sheet)?;
    for row in (start..start + count).rev() {
        workbook.remove_row(&resolved, row)?;
    }
    save_atomic(&workbook, path)?;

    Ok(WriteOutcome::RowsDeleted {
        success: true,
        rows_deleted: count as usize,
    })
}

/// Write a rectangular block of values with auto type detection, anchored
/// at `start_cell`.
pub fn write_range(
    path: &Path,
    sheet: &str,
    start_cell: &str,
    data: &[Vec<Value>],
) -> Result<WriteOutcome> {
    let start = parse_address(start_cell)?;
    let total_cells: usize = data.iter().map(|row| row.len()).sum();
    if total_cells > limits::MAX_WRITE_RANGE_CELLS {
        return Err(XlqError::CellLimitExceeded {
            count: total_cells,
            limit: limits::MAX_WRITE_RANGE_CELLS,
        });
    }

    let mut workbook = Workbook::open(path)?;
    let resolved = workbook.resolve_sheet(sheet)?;

    let mut max_width = 0usize;
    for (i, row) in data.iter().enumerate() {
        max_width = max_width.max(row.len());
        let scalars = coerce_row(row)?;
        let anchor = CellAddress::new(start.col, start.row + i as u32);
        workbook.set_row(&resolved, &anchor, &scalars)?;
    }
    save_atomic(&workbook, path)?;

    let end_col = start.col + max_width.max(1) as u32 - 1;
    let end_row = start.row + data.len().max(1) as u32 - 1;
    Ok(WriteOutcome::RangeWritten {
        success: true,
        range: format!("{}:{}", start.to_a1(), format_address(end_col, end_row)),
        cells_written: total_cells,
    })
}

/// Add a sheet, optionally writing a header row.
pub fn create_sheet(path: &Path, name: &str, headers: &[String]) -> Result<WriteOutcome> {
    let mut workbook = Workbook::open(path)?;
    workbook.new_sheet(name)?;
    if !headers.is_empty() {
        let scalars: Vec<CellScalar> = headers.iter().map(|h| CellScalar::Str(h.clone())).collect();
        workbook.set_row(name, &CellAddress::new(1, 1), &scalars)?;
    }
    save_atomic(&workbook, path)?;
    Ok(WriteOutcome::SheetCreated {
        success: true,
        sheet: name.to_string(),
    })
}

/// Remove a sheet; the workbook must keep at least one.
pub fn delete_sheet(path: &Path, name: &str) -> Result<WriteOutcome> {
    let mut workbook = Workbook::open(path)?;
    let resolved = workbook.resolve_sheet(name)?;
    if workbook.sheet_count() <= 1 {
        return Err(XlqError::CannotDeleteLastSheet);
    }
    workbook.delete_sheet(&resolved)?;
    save_atomic(&workbook, path)?;
    Ok(WriteOutcome::SheetDeleted {
        success: true,
        sheet: resolved,
    })
}

/// Rename a sheet; the new name must be free.
pub fn rename_sheet(path: &Path, old: &str, new: &str) -> Result<WriteOutcome> {
    let mut workbook = Workbook::open(path)?;
    let resolved = workbook.resolve_sheet(old)?;
    if workbook.sheet_exists(new) {
        return Err(XlqError::SheetAlreadyExists(new.to_string()));
    }
    workbook.rename_sheet(&resolved, new)?;
    save_atomic(&workbook, path)?;
    Ok(WriteOutcome::SheetRenamed {
        success: true,
        sheet: new.to_string(),
    })
}

/// Build a fresh workbook file. Overwrite policy is enforced upstream by
/// the sandbox; this only shapes the content.
pub fn create_file(
    path: &Path,
    sheet_name: &str,
    headers: &[String],
    rows: &[Vec<Value>],
) -> Result<WriteOutcome> {
    if rows.len() > limits::MAX_CREATE_FILE_ROWS {
        return Err(XlqError::CountLimitExceeded {
            count: rows.len(),
            limit: limits::MAX_CREATE_FILE_ROWS,
        });
    }

    let mut workbook = Workbook::create();
    let default = workbook.resolve_sheet("")?;
    let sheet = if sheet_name.is_empty() || sheet_name == default {
        default
    } else {
        workbook.rename_sheet(&default, sheet_name)?;
        sheet_name.to_string()
    };

    let mut next_row = 1u32;
    if !headers.is_empty() {
        let scalars: Vec<CellScalar> = headers.iter().map(|h| CellScalar::Str(h.clone())).collect();
        workbook.set_row(&sheet, &CellAddress::new(1, 1), &scalars)?;
        next_row = 2;
    }
    let mut written = 0usize;
    for row in rows {
        let scalars = coerce_row(row)?;
        workbook.set_row(&sheet, &CellAddress::new(1, next_row), &scalars)?;
        next_row += 1;
        written += 1;
    }
    save_atomic(&workbook, path)?;

    Ok(WriteOutcome::FileCreated {
        success: true,
        file: path.display().to_string(),
        sheet_name: sheet,
        rows_written: written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("data.xlsx");
        let headers = vec!["Name".to_string(), "Value".to_string()];
        let rows = vec![
            vec![json!("Value1"), json!(11)],
            vec![json!("Value2"), json!(22)],
        ];
        create_file(&path, "Sheet1", &headers, &rows).unwrap();
        path
    }

    fn read_cell(path: &Path, sheet: &str, addr: &str) -> String {
        let wb = Workbook::open(path).unwrap();
        wb.cell_value(sheet, &parse_address(addr).unwrap()).unwrap()
    }

    #[test]
    fn append_continues_after_last_data_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path());
        let rows = vec![
            vec![json!("Value3"), json!(33)],
            vec![json!("Value4"), json!(44)],
        ];
        let outcome = append_rows(&path, "Sheet1", &rows).unwrap();
        match outcome {
            WriteOutcome::RowsAppended {
                rows_added,
                starting_row,
                ending_row,
                ..
            } => {
                assert_eq!(rows_added, 2);
                assert_eq!(starting_row, 4);
                assert_eq!(ending_row, 5);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(read_cell(&path, "", "A4"), "Value3");
        assert_eq!(read_cell(&path, "", "B5"), "44");
    }

    #[test]
    fn append_to_empty_sheet_starts_at_row_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        create_file(&path, "", &[], &[]).unwrap();

        let rows = vec![vec![json!("First")], vec![json!("Second")]];
        match append_rows(&path, "", &rows).unwrap() {
            WriteOutcome::RowsAppended {
                starting_row,
                ending_row,
                ..
            } => {
                assert_eq!(starting_row, 1);
                assert_eq!(ending_row, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(read_cell(&path, "", "A1"), "First");
    }

    #[test]
    fn append_rejects_oversize_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path());
        let rows: Vec<Vec<Value>> = (0..=limits::MAX_WRITE_ROWS).map(|i| vec![json!(i)]).collect();
        assert!(matches!(
            append_rows(&path, "Sheet1", &rows),
            Err(XlqError::CountLimitExceeded { .. })
        ));
    }

    #[test]
    fn insert_shifts_existing_rows_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path());
        let rows = vec![vec![json!("Inserted")]];
        insert_rows(&path, "Sheet1", 2, &rows).unwrap();

        assert_eq!(read_cell(&path, "", "A2"), "Inserted");
        // previous row 2 moved to row 3
        assert_eq!(read_cell(&path, "", "A3"), "Value1");
        assert_eq!(read_cell(&path, "", "A4"), "Value2");
    }

    #[test]
    fn insert_rejects_row_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path());
        assert!(matches!(
            insert_rows(&path, "Sheet1", 0, &[vec![json!("x")]]),
            Err(XlqError::InvalidRange(_))
        ));
    }

    #[test]
    fn delete_removes_a_contiguous_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path());
        append_rows(&path, "", &[vec![json!("Value3")], vec![json!("Value4")]]).unwrap();

        match delete_rows(&path, "Sheet1", 2, 2).unwrap() {
            WriteOutcome::RowsDeleted { rows_deleted, .. } => assert_eq!(rows_deleted, 2),
            other => panic!("unexpected {other:?}"),
        }
        // rows 2-3 (Value1, Value2) are gone; later rows shifted up
        assert_eq!(read_cell(&path, "", "A1"), "Name");
        assert_eq!(read_cell(&path, "", "A2"), "Value3");
        assert_eq!(read_cell(&path, "", "A3"), "Value4");
    }

    #[test]
    fn delete_validates_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path());
        assert!(matches!(
            delete_rows(&path, "Sheet1", 0, 1),
            Err(XlqError::InvalidRange(_))
        ));
        assert!(matches!(
            delete_rows(&path, "Sheet1", 1, 0),
            Err(XlqError::InvalidRange(_))
        ));
        assert!(matches!(
            delete_rows(&path, "Sheet1", 1, limits::MAX_WRITE_ROWS as u32 + 1),
            Err(XlqError::CountLimitExceeded { .. })
        ));
    }

    #[test]
    fn write_range_anchors_and_reports_extent() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path());
        let data = vec![
            vec![json!("R1C1"), json!("R1C2"), json!("R1C3")],
            vec![json!(100), json!(200), json!(300)],
            vec![json!(true), json!(false), json!(true)],
        ];
        match write_range(&path, "Sheet1", "B2", &data).unwrap() {
            WriteOutcome::RangeWritten {
                range,
                cells_written,
                ..
            } => {
                assert_eq!(range, "B2:D4");
                assert_eq!(cells_written, 9);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(read_cell(&path, "", "B2"), "R1C1");
        assert_eq!(read_cell(&path, "", "C3"), "200");
        assert_eq!(read_cell(&path, "", "D4"), "TRUE");
    }

    #[test]
    fn write_range_rejects_oversize_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path());
        let data: Vec<Vec<Value>> = (0..=limits::MAX_WRITE_RANGE_CELLS)
            .map(|i| vec![json!(i)])
            .collect();
        assert!(matches!(
            write_range(&path, "Sheet1", "A1", &data),
            Err(XlqError::CellLimitExceeded { .. })
        ));
    }

    #[test]
    fn sheet_create_delete_rename_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path());

        create_sheet(&path, "Extra", &["H1".to_string()]).unwrap();
        assert_eq!(read_cell(&path, "Extra", "A1"), "H1");
        assert!(matches!(
            create_sheet(&path, "extra", &[]),
            Err(XlqError::SheetAlreadyExists(_))
        ));

        rename_sheet(&path, "Extra", "Renamed").unwrap();
        let wb = Workbook::open(&path).unwrap();
        assert!(wb.sheet_names().contains(&"Renamed".to_string()));
        drop(wb);
        assert!(matches!(
            rename_sheet(&path, "Renamed", "Sheet1"),
            Err(XlqError::SheetAlreadyExists(_))
        ));

        delete_sheet(&path, "Renamed").unwrap();
        let wb = Workbook::open(&path).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Sheet1".to_string()]);
    }

    #[test]
    fn cannot_delete_the_only_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path());
        assert!(matches!(
            delete_sheet(&path, "Sheet1"),
            Err(XlqError::CannotDeleteLastSheet)
        ));
    }

    #[test]
    fn create_file_names_sheet_and_counts_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.xlsx");
        let headers = vec!["Name".to_string(), "Age".to_string()];
        let rows = vec![
            vec![json!("alice"), json!(31)],
            vec![json!("bob"), json!(27)],
        ];
        match create_file(&path, "People", &headers, &rows).unwrap() {
            WriteOutcome::FileCreated {
                sheet_name,
                rows_written,
                ..
            } => {
                assert_eq!(sheet_name, "People");
                assert_eq!(rows_written, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
        let wb = Workbook::open(&path).unwrap();
        assert_eq!(wb.sheet_names(), vec!["People".to_string()]);
        assert_eq!(wb.last_row("").unwrap(), 3);
    }

    #[test]
    fn create_file_keeps_default_sheet_name_when_unset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.xlsx");
        create_file(&path, "", &[], &[vec![json!("x")]]).unwrap();
        let wb = Workbook::open(&path).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Sheet1".to_string()]);
    }
}
