//! Typed cell writes and the atomic save protocol.
//!
//! Values arrive as JSON (the tool server's native shape; the CLI parses
//! into the same space). Coercion resolves the requested kind, `Auto`
//! inferring it from the value: formulas start with `=`, numeric strings
//! become numbers, boolean literals become booleans, everything else
//! stays a string.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::addr::parse_address;
use crate::book::{CellScalar, Workbook};
use crate::error::{Result, XlqError};

/// Requested type for a written value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueKind {
    #[default]
    Auto,
    String,
    Number,
    Bool,
    Formula,
}

impl ValueKind {
    pub fn parse(tag: &str) -> Result<Self> {
        match tag.to_lowercase().as_str() {
            "" | "auto" => Ok(ValueKind::Auto),
            "string" => Ok(ValueKind::String),
            "number" => Ok(ValueKind::Number),
            "bool" => Ok(ValueKind::Bool),
            "formula" => Ok(ValueKind::Formula),
            other => Err(XlqError::parser(
                "value type",
                format!("unknown value type: {other} (valid: auto, string, number, bool, formula)"),
            )),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ValueKind::Auto => "auto",
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Bool => "bool",
            ValueKind::Formula => "formula",
        };
        f.write_str(tag)
    }
}

/// Outcome of a successful mutation, serialised flat for front-ends.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum WriteOutcome {
    CellWritten {
        success: bool,
        cell: String,
        previous_value: Value,
        new_value: Value,
    },
    RowsAppended {
        success: bool,
        rows_added: usize,
        starting_row: u32,
        ending_row: u32,
    },
    RowsInserted {
        success: bool,
        rows_inserted: usize,
        starting_row: u32,
        ending_row: u32,
    },
    RowsDeleted {
        success: bool,
        rows_deleted: usize,
    },
    RangeWritten {
        success: bool,
        range: String,
        cells_written: usize,
    },
    SheetCreated {
        success: bool,
        sheet: String,
    },
    SheetDeleted {
        success: bool,
        sheet: String,
    },
    SheetRenamed {
        success: bool,
        sheet: String,
    },
    FileCreated {
        success: bool,
        file: String,
        sheet_name: String,
        rows_written: usize,
    },
}

/// Infer the concrete kind for an `Auto` write.
pub fn detect_kind(value: &Value) -> ValueKind {
    match value {
        Value::Null => ValueKind::String,
        Value::Bool(_) => ValueKind::Bool,
        Value::Number(_) => ValueKind::Number,
        Value::String(s) => {
            if s.starts_with('=') {
                ValueKind::Formula
            } else if s.parse::<f64>().is_ok() {
                ValueKind::Number
            } else if parse_bool_literal(s).is_some() {
                ValueKind::Bool
            } else {
                ValueKind::String
            }
        }
        _ => ValueKind::String,
    }
}

/// Boolean literals accepted when coercing strings to booleans.
fn parse_bool_literal(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Coerce a JSON value to a storable scalar under the requested kind.
pub fn coerce(value: &Value, kind: ValueKind) -> Result<CellScalar> {
    let kind = match kind {
        ValueKind::Auto => detect_kind(value),
        explicit => explicit,
    };
    match kind {
        ValueKind::Auto => unreachable!("auto resolved above"),
        ValueKind::String => {
            if value.is_null() {
                Ok(CellScalar::Str(String::new()))
            } else {
                Ok(CellScalar::Str(stringify(value)))
            }
        }
        ValueKind::Number => match value {
            Value::Number(n) => n.as_f64().map(CellScalar::Num).ok_or_else(|| {
                XlqError::parser("write cell", format!("not a finite number: {n}"))
            }),
            Value::String(s) => s.parse::<f64>().map(CellScalar::Num).map_err(|_| {
                XlqError::parser("write cell", format!("cannot parse {s:?} as number"))
            }),
            other => Err(XlqError::parser(
                "write cell",
                format!("cannot convert {other} to number"),
            )),
        },
        ValueKind::Bool => match value {
            Value::Bool(b) => Ok(CellScalar::Bool(*b)),
            Value::String(s) => parse_bool_literal(s).map(CellScalar::Bool).ok_or_else(|| {
                XlqError::parser("write cell", format!("cannot parse {s:?} as bool"))
            }),
            other => Err(XlqError::parser(
                "write cell",
                format!("cannot convert {other} to bool"),
            )),
        },
        ValueKind::Formula => match value {
            Value::String(s) => {
                let formula = if s.starts_with('=') {
                    s.clone()
                } else {
                    format!("={s}")
                };
                Ok(CellScalar::Formula(formula))
            }
            other => Err(XlqError::parser(
                "write cell",
                format!("formula must be a string, got {other}"),
            )),
        },
    }
}

/// JSON rendering of a stored scalar, for write outcomes.
pub fn scalar_to_value(scalar: &CellScalar) -> Value {
    match scalar {
        CellScalar::Str(s) => Value::String(s.clone()),
        CellScalar::Num(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(n.to_string())),
        CellScalar::Bool(b) => Value::Bool(*b),
        CellScalar::Formula(f) => Value::String(f.clone()),
        CellScalar::Empty => Value::String(String::new()),
    }
}

/// Persist a workbook over `target` without ever leaving it partially
/// written: serialise to a sibling `<base>.tmp`, then rename. On any
/// failure the temp file is removed and the original error surfaces.
pub fn save_atomic(workbook: &Workbook, target: &Path) -> Result<()> {
    let dir = target.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                XlqError::parser(format!("create directory {}", dir.display()), e)
            })?;
        }
    }

    let base = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = match dir {
        Some(dir) => dir.join(format!("{base}.tmp")),
        None => std::path::PathBuf::from(format!("{base}.tmp")),
    };

    if let Err(e) = workbook.write_to(&tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    if let Err(e) = fs::rename(&tmp, target) {
        let _ = fs::remove_file(&tmp);
        return Err(XlqError::parser(
            format!("rename {} over {}", tmp.display(), target.display()),
            e,
        ));
    }

    Ok(())
}

/// Write one cell, capturing the previous value before the mutation, and
/// persist atomically. `path` must already be sandbox-validated.
pub fn write_cell(
    path: &Path,
    sheet: &str,
    cell: &str,
    value: &Value,
    kind: ValueKind,
) -> Result<WriteOutcome> {
    let addr = parse_address(cell)?;
    let mut workbook = Workbook::open(path)?;
    let resolved = workbook.resolve_sheet(sheet)?;

    let previous = workbook.cell_value(&resolved, &addr)?;
    let scalar = coerce(value, kind)?;
    workbook.set_cell(&resolved, &addr, &scalar)?;
    save_atomic(&workbook, path)?;

    Ok(WriteOutcome::CellWritten {
        success: true,
        cell: addr.to_a1(),
        previous_value: Value::String(previous),
        new_value: scalar_to_value(&scalar),
    })
}
