//! Bounded-memory "last N rows" extraction.
//!
//! Unlike the other read paths this must scan the whole sheet, so the
//! working set is kept to a ring of N raw-string slots. Slots are reused
//! in place across iterations (string and vector buffers included), and
//! `Cell` records are synthesised exactly once, for the rows that are
//! actually returned.

use crate::addr::format_address;
use crate::book::Workbook;
use crate::cancel::CancelToken;
use crate::error::Result;
use crate::{Cell, CellKind, Row};

/// Raw column values for one buffered row. No addresses, no type tags;
/// just what is needed to rebuild the row if it survives the scan.
#[derive(Debug, Default)]
struct RawRow {
    number: u32,
    values: Vec<String>,
}

/// Ring buffer holding the most recent N rows of a scan.
pub struct TailBuffer {
    slots: Vec<RawRow>,
    seen: usize,
}

impl TailBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, RawRow::default);
        TailBuffer { slots, seen: 0 }
    }

    /// Record a row, overwriting the oldest slot. The slot's vector and
    /// string buffers are reused when their capacity suffices.
    pub fn push(&mut self, number: u32, values: &[String]) {
        let capacity = self.slots.len();
        let slot = &mut self.slots[self.seen % capacity];
        slot.number = number;
        slot.values.truncate(values.len());
        let kept = slot.values.len();
        for (dst, src) in slot.values.iter_mut().zip(values) {
            dst.clone_from(src);
        }
        if kept < values.len() {
            slot.values.extend_from_slice(&values[kept..]);
        }
        self.seen += 1;
    }

    /// Total rows pushed, buffered or not.
    pub fn seen(&self) -> usize {
        self.seen
    }

    /// Materialise the buffered rows in original order. This is the only
    /// place Cell records are constructed.
    pub fn into_rows(self) -> Vec<Row> {
        let capacity = self.slots.len();
        if self.seen == 0 {
            return Vec::new();
        }
        if self.seen < capacity {
            self.slots[..self.seen].iter().map(construct_row).collect()
        } else {
            let oldest = self.seen % capacity;
            (0..capacity)
                .map(|i| construct_row(&self.slots[(oldest + i) % capacity]))
                .collect()
        }
    }

    #[cfg(test)]
    fn slot_capacity(&self, index: usize) -> usize {
        self.slots[index].values.capacity()
    }
}

fn construct_row(raw: &RawRow) -> Row {
    let cells = raw
        .values
        .iter()
        .enumerate()
        .map(|(i, value)| Cell {
            address: format_address(i as u32 + 1, raw.number),
            value: value.clone(),
            kind: CellKind::String,
            row: raw.number,
            col: i as u32 + 1,
        })
        .collect();
    Row {
        number: raw.number,
        cells,
    }
}

/// Return the last `n` rows of a sheet in original order, plus the total
/// number of rows scanned. Sheets shorter than `n` come back whole.
pub fn tail(
    workbook: &Workbook,
    sheet: &str,
    n: usize,
    cancel: &CancelToken,
) -> Result<(Vec<Row>, usize)> {
    let mut buffer = TailBuffer::new(n);
    for record in workbook.rows(sheet)? {
        if cancel.is_cancelled() {
            return Err(crate::XlqError::Cancelled);
        }
        buffer.push(record.number, &record.values);
    }
    let seen = buffer.seen();
    Ok((buffer.into_rows(), seen))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::parse_address;
    use crate::book::CellScalar;

    fn values(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn underfilled_buffer_returns_rows_in_order() {
        let mut buf = TailBuffer::new(10);
        for r in 1..=3u32 {
            buf.push(r, &values(&[&r.to_string()]));
        }
        let rows = buf.into_rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows.iter().map(|r| r.number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn full_ring_keeps_only_last_n() {
        let mut buf = TailBuffer::new(10);
        for r in 1..=10_000u32 {
            buf.push(r, &values(&[&r.to_string()]));
        }
        assert_eq!(buf.seen(), 10_000);
        let rows = buf.into_rows();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows.first().unwrap().number, 9991);
        assert_eq!(rows.last().unwrap().number, 10_000);
        assert_eq!(rows.last().unwrap().cells[0].value, "10000");
        // ascending original order throughout
        for pair in rows.windows(2) {
            assert!(pair[0].number < pair[1].number);
        }
        // cells were constructed only for the returned rows
        let constructed: usize = rows.iter().map(|r| r.cells.len()).sum();
        assert_eq!(constructed, 10);
    }

    #[test]
    fn slots_reuse_their_allocations() {
        let mut buf = TailBuffer::new(1);
        buf.push(1, &values(&["a", "b", "c", "d", "e"]));
        let wide = buf.slot_capacity(0);
        assert!(wide >= 5);
        // narrower rows land in the same slot without shrinking capacity
        buf.push(2, &values(&["x"]));
        buf.push(3, &values(&["y", "z"]));
        assert_eq!(buf.slot_capacity(0), wide);
        let rows = buf.into_rows();
        assert_eq!(rows[0].number, 3);
        assert_eq!(rows[0].cells.len(), 2);
    }

    #[test]
    fn empty_sheet_yields_empty_result() {
        let wb = Workbook::create();
        let (rows, seen) = tail(&wb, "", 10, &CancelToken::new()).unwrap();
        assert!(rows.is_empty());
        assert_eq!(seen, 0);
    }

    #[test]
    fn tail_of_real_sheet_returns_last_rows() {
        let mut wb = Workbook::create();
        for r in 1..=100u32 {
            let addr = parse_address(&format!("A{r}")).unwrap();
            wb.set_cell("", &addr, &CellScalar::Str(r.to_string())).unwrap();
        }
        let (rows, seen) = tail(&wb, "", 10, &CancelToken::new()).unwrap();
        assert_eq!(seen, 100);
        assert_eq!(
            rows.iter().map(|r| r.number).collect::<Vec<_>>(),
            (91..=100).collect::<Vec<_>>()
        );
        assert_eq!(rows[0].cells[0].address, "A91");
    }

    #[test]
    fn shorter_sheet_comes_back_whole() {
        let mut wb = Workbook::create();
        for r in 1..=4u32 {
            let addr = parse_address(&format!("A{r}")).unwrap();
            wb.set_cell("", &addr, &CellScalar::Str(r.to_string())).unwrap();
        }
        let (rows, seen) = tail(&wb, "", 10, &CancelToken::new()).unwrap();
        assert_eq!(seen, 4);
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn cancellation_aborts_the_scan() {
        let mut wb = Workbook::create();
        wb.set_cell("", &parse_address("A1").unwrap(), &CellScalar::Str("x".into())).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            tail(&wb, "", 10, &cancel),
            Err(crate::XlqError::Cancelled)
        ));
    }
}
