//! Cancellable row streaming.
//!
//! Streams are pull-model iterators borrowing the open workbook: there is
//! no background producer, so abandoning a stream mid-iteration releases
//! the row iterator and the workbook borrow immediately. The cancellation
//! token is checked before every row.

use crate::addr::{format_address, parse_range, CellRange};
use crate::book::{RowRecord, SheetRows, Workbook};
use crate::cancel::CancelToken;
use crate::error::{Result, XlqError};
use crate::{Cell, CellKind, Row};

/// Stream rows of a sheet in ascending row order.
///
/// `start_row = 0` means "from the beginning", `end_row = 0` means "to the
/// end"; both bounds are inclusive when non-zero. Sheet resolution errors
/// surface here, before any row is produced.
pub fn stream_rows<'a>(
    workbook: &'a Workbook,
    sheet: &str,
    start_row: u32,
    end_row: u32,
    cancel: CancelToken,
) -> Result<RowStream<'a>> {
    let inner = workbook.rows(sheet)?;
    Ok(RowStream {
        inner,
        start_row,
        end_row,
        cancel,
        done: false,
    })
}

/// Stream the rows of a rectangular range. Rows outside the range's row
/// bounds are skipped; cells outside its column bounds are elided, and
/// missing cells inside the window come back as empty-string cells.
pub fn stream_range<'a>(
    workbook: &'a Workbook,
    sheet: &str,
    range: &str,
    cancel: CancelToken,
) -> Result<RangeStream<'a>> {
    let range = parse_range(range)?;
    let inner = workbook.rows(sheet)?;
    Ok(RangeStream {
        inner,
        range,
        cancel,
        done: false,
    })
}

pub struct RowStream<'a> {
    inner: SheetRows<'a>,
    start_row: u32,
    end_row: u32,
    cancel: CancelToken,
    done: bool,
}

impl Iterator for RowStream<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if self.cancel.is_cancelled() {
                self.done = true;
                return Some(Err(XlqError::Cancelled));
            }
            let record = match self.inner.next() {
                Some(r) => r,
                None => {
                    self.done = true;
                    return None;
                }
            };
            if self.start_row > 0 && record.number < self.start_row {
                continue;
            }
            if self.end_row > 0 && record.number > self.end_row {
                self.done = true;
                return None;
            }
            return Some(Ok(row_from_record(record)));
        }
    }
}

pub struct RangeStream<'a> {
    inner: SheetRows<'a>,
    range: CellRange,
    cancel: CancelToken,
    done: bool,
}

impl Iterator for RangeStream<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if self.cancel.is_cancelled() {
                self.done = true;
                return Some(Err(XlqError::Cancelled));
            }
            let record = match self.inner.next() {
                Some(r) => r,
                None => {
                    self.done = true;
                    return None;
                }
            };
            if record.number < self.range.start.row {
                continue;
            }
            if record.number > self.range.end.row {
                self.done = true;
                return None;
            }
            let number = record.number;
            let cells = (self.range.start.col..=self.range.end.col)
                .map(|col| {
                    let value = record
                        .values
                        .get((col - 1) as usize)
                        .cloned()
                        .unwrap_or_default();
                    Cell {
                        address: format_address(col, number),
                        value,
                        kind: CellKind::String,
                        row: number,
                        col,
                    }
                })
                .collect();
            return Some(Ok(Row { number, cells }));
        }
    }
}

/// Bulk streaming tags every cell as a string; single-cell reads consult
/// the parser's type information instead.
fn row_from_record(record: RowRecord) -> Row {
    let number = record.number;
    let cells = record
        .values
        .into_iter()
        .enumerate()
        .map(|(i, value)| Cell {
            address: format_address(i as u32 + 1, number),
            value,
            kind: CellKind::String,
            row: number,
            col: i as u32 + 1,
        })
        .collect();
    Row { number, cells }
}

/// Drain a stream into a vector, failing on the first row error.
pub fn collect_rows<I>(stream: I) -> Result<Vec<Row>>
where
    I: Iterator<Item = Result<Row>>,
{
    stream.collect()
}

/// Drain a stream keeping at most `limit` rows.
///
/// Returns the kept rows, the total rows seen, and whether the limit cut
/// anything off.
pub fn collect_rows_with_limit<I>(stream: I, limit: usize) -> Result<(Vec<Row>, usize, bool)>
where
    I: Iterator<Item = Result<Row>>,
{
    let mut rows = Vec::new();
    let mut total = 0usize;
    for item in stream {
        let row = item?;
        total += 1;
        if rows.len() < limit {
            rows.push(row);
        }
    }
    let truncated = total > limit;
    Ok((rows, total, truncated))
}
