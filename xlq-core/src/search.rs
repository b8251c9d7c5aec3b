//! Pattern search across sheets.
//!
//! The matcher is built once, before any scanning: regex compile errors
//! and empty patterns surface synchronously. The scan itself is a pull
//! iterator over (sheet, row, cell) in declaration order, with the same
//! no-leak guarantees as row streaming.

use std::collections::VecDeque;

use regex::{Regex, RegexBuilder};

use crate::addr::format_address;
use crate::book::{SheetRows, Workbook};
use crate::cancel::CancelToken;
use crate::error::{Result, XlqError};
use crate::SearchHit;

/// Search configuration, taken by value per call.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Restrict to one sheet; `None` searches every sheet in declared order.
    pub sheet: Option<String>,
    pub case_insensitive: bool,
    pub regex: bool,
    /// Already-clamped result cutoff; 0 disables the cutoff.
    pub max_results: usize,
}

enum Matcher {
    Literal(String),
    LiteralLower(String),
    Pattern(Regex),
}

impl Matcher {
    fn matches(&self, value: &str) -> bool {
        match self {
            Matcher::Literal(needle) => value.contains(needle.as_str()),
            Matcher::LiteralLower(needle) => value.to_lowercase().contains(needle.as_str()),
            Matcher::Pattern(re) => re.is_match(value),
        }
    }
}

fn build_matcher(pattern: &str, opts: &SearchOptions) -> Result<Matcher> {
    if pattern.is_empty() {
        return Err(XlqError::InvalidPattern("search pattern cannot be empty".to_string()));
    }
    if opts.regex {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(opts.case_insensitive)
            .build()
            .map_err(|e| XlqError::InvalidPattern(e.to_string()))?;
        Ok(Matcher::Pattern(re))
    } else if opts.case_insensitive {
        Ok(Matcher::LiteralLower(pattern.to_lowercase()))
    } else {
        Ok(Matcher::Literal(pattern.to_string()))
    }
}

/// Begin a search. Sheet resolution and matcher construction happen here;
/// the returned iterator does the scanning lazily.
pub fn search<'a>(
    workbook: &'a Workbook,
    pattern: &str,
    opts: SearchOptions,
    cancel: CancelToken,
) -> Result<SearchScan<'a>> {
    let matcher = build_matcher(pattern, &opts)?;
    let sheets = match &opts.sheet {
        Some(name) if !name.is_empty() => vec![workbook.resolve_sheet(name)?],
        _ => workbook.sheet_names(),
    };
    Ok(SearchScan {
        workbook,
        sheets,
        next_sheet: 0,
        current: None,
        pending: VecDeque::new(),
        matcher,
        max_results: opts.max_results,
        emitted: 0,
        cancel,
        done: false,
    })
}

/// Lazy sequence of search hits ordered by (sheet declaration order, row,
/// column). Stops immediately at the result cutoff; checks cancellation at
/// every row boundary.
pub struct SearchScan<'a> {
    workbook: &'a Workbook,
    sheets: Vec<String>,
    next_sheet: usize,
    current: Option<(String, SheetRows<'a>)>,
    pending: VecDeque<SearchHit>,
    matcher: Matcher,
    max_results: usize,
    emitted: usize,
    cancel: CancelToken,
    done: bool,
}

impl Iterator for SearchScan<'_> {
    type Item = Result<SearchHit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(hit) = self.pending.pop_front() {
                self.emitted += 1;
                if self.max_results > 0 && self.emitted >= self.max_results {
                    self.done = true;
                }
                return Some(Ok(hit));
            }
            if self.cancel.is_cancelled() {
                self.done = true;
                return Some(Err(XlqError::Cancelled));
            }
            if self.current.is_none() {
                if self.next_sheet >= self.sheets.len() {
                    self.done = true;
                    return None;
                }
                let name = self.sheets[self.next_sheet].clone();
                self.next_sheet += 1;
                let workbook: &Workbook = self.workbook;
                match workbook.rows(&name) {
                    Ok(rows) => self.current = Some((name, rows)),
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
            }
            let (sheet_name, rows) = self.current.as_mut().expect("sheet scan state set above");
            match rows.next() {
                Some(record) => {
                    for (i, value) in record.values.iter().enumerate() {
                        if !value.is_empty() && self.matcher.matches(value) {
                            self.pending.push_back(SearchHit {
                                sheet: sheet_name.clone(),
                                address: format_address(i as u32 + 1, record.number),
                                value: value.clone(),
                                row: record.number,
                                col: i as u32 + 1,
                            });
                        }
                    }
                }
                None => {
                    self.current = None;
                }
            }
        }
    }
}

/// Drain a scan into a vector, failing on the first error.
pub fn collect_hits(scan: SearchScan<'_>) -> Result<Vec<SearchHit>> {
    scan.collect()
}
