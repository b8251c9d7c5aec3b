//! Tool-call dispatch: argument extraction, engine invocation, and
//! response envelopes.

use serde_json::{json, Value};
use xlq_core::shape::{to_bounded_json, Envelope};
use xlq_core::writer::ValueKind;
use xlq_core::{rows_to_values, CancelToken, Engine, Result, XlqError};

fn str_arg<'a>(args: &'a Value, key: &str) -> &'a str {
    args.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn opt_str_arg(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn i64_arg(args: &Value, key: &str, default: i64) -> i64 {
    args.get(key).and_then(|v| v.as_i64()).unwrap_or(default)
}

fn bool_arg(args: &Value, key: &str) -> bool {
    args.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn rows_arg(args: &Value, key: &str) -> Result<Vec<Vec<Value>>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
            XlqError::parser("arguments", format!("{key} must be an array of arrays: {e}"))
        }),
    }
}

fn strings_arg(args: &Value, key: &str) -> Result<Vec<String>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
            XlqError::parser("arguments", format!("{key} must be an array of strings: {e}"))
        }),
    }
}

/// Route a `tools/call` request. Business failures come back inside the
/// tool result; oversize responses are the one engine failure treated as
/// an RPC error.
pub fn handle_call(engine: &Engine, id: Value, params: &Value) -> Value {
    let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
    let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
    match dispatch(engine, name, &args) {
        Ok(body) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {"content": [{"type": "text", "text": body}]}
        }),
        Err(e @ XlqError::ResponseTooLarge { .. }) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": -32000, "message": e.to_string()}
        }),
        Err(e) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {"content": [{"type": "text", "text": e.to_string()}], "isError": true}
        }),
    }
}

fn dispatch(engine: &Engine, name: &str, args: &Value) -> Result<String> {
    let file = str_arg(args, "file");
    let sheet = str_arg(args, "sheet");
    let cancel = CancelToken::new();
    match name {
        "sheets" => {
            let sheets = engine.sheets(file)?;
            to_bounded_json(&sheets)
        }
        "info" => {
            let info = engine.info(file, sheet)?;
            to_bounded_json(&info)
        }
        "read" => {
            let range = opt_str_arg(args, "range");
            let limit = i64_arg(args, "limit", 0);
            let slice = engine.read(file, sheet, range.as_deref(), limit, &cancel)?;
            let envelope = Envelope::new(
                rows_to_values(&slice.rows),
                slice.rows.len(),
                slice.truncated,
                slice.limit,
            );
            to_bounded_json(&envelope)
        }
        "head" => {
            let slice = engine.head(file, sheet, i64_arg(args, "n", 0), &cancel)?;
            let envelope = Envelope::new(
                rows_to_values(&slice.rows),
                slice.rows.len(),
                slice.truncated,
                slice.limit,
            );
            to_bounded_json(&envelope)
        }
        "tail" => {
            let slice = engine.tail(file, sheet, i64_arg(args, "n", 0), &cancel)?;
            let envelope = Envelope::new(
                rows_to_values(&slice.rows),
                slice.rows.len(),
                slice.truncated,
                slice.limit,
            );
            to_bounded_json(&envelope)
        }
        "search" => {
            let pattern = str_arg(args, "pattern");
            let outcome = engine.search(
                file,
                pattern,
                opt_str_arg(args, "sheet"),
                bool_arg(args, "ignoreCase"),
                bool_arg(args, "regex"),
                i64_arg(args, "maxResults", -1),
                &cancel,
            )?;
            let total = outcome.hits.len();
            let envelope = Envelope::new(
                json!({"pattern": pattern, "total": total, "results": outcome.hits}),
                total,
                outcome.truncated,
                outcome.limit,
            );
            to_bounded_json(&envelope)
        }
        "cell" => {
            let cell = engine.cell(file, sheet, str_arg(args, "address"))?;
            to_bounded_json(&cell)
        }
        "write_cell" => {
            let kind = ValueKind::parse(str_arg(args, "type"))?;
            let value = args.get("value").cloned().unwrap_or(Value::Null);
            let outcome = engine.write_cell(file, sheet, str_arg(args, "cell"), &value, kind)?;
            to_bounded_json(&outcome)
        }
        "append_rows" => {
            let rows = rows_arg(args, "rows")?;
            let outcome = engine.append_rows(file, sheet, &rows)?;
            to_bounded_json(&outcome)
        }
        "insert_rows" => {
            let rows = rows_arg(args, "rows")?;
            let row = i64_arg(args, "row", 0).max(0) as u32;
            let outcome = engine.insert_rows(file, sheet, row, &rows)?;
            to_bounded_json(&outcome)
        }
        "delete_rows" => {
            let start = i64_arg(args, "start_row", 0).max(0) as u32;
            let count = i64_arg(args, "count", 0).max(0) as u32;
            let outcome = engine.delete_rows(file, sheet, start, count)?;
            to_bounded_json(&outcome)
        }
        "write_range" => {
            let data = rows_arg(args, "data")?;
            let outcome = engine.write_range(file, sheet, str_arg(args, "start_cell"), &data)?;
            to_bounded_json(&outcome)
        }
        "create_sheet" => {
            let headers = strings_arg(args, "headers")?;
            let outcome = engine.create_sheet(file, str_arg(args, "name"), &headers)?;
            to_bounded_json(&outcome)
        }
        "delete_sheet" => {
            let outcome = engine.delete_sheet(file, str_arg(args, "name"))?;
            to_bounded_json(&outcome)
        }
        "rename_sheet" => {
            let outcome =
                engine.rename_sheet(file, str_arg(args, "old_name"), str_arg(args, "new_name"))?;
            to_bounded_json(&outcome)
        }
        "create_file" => {
            let headers = strings_arg(args, "headers")?;
            let rows = rows_arg(args, "rows")?;
            let outcome = engine.create_file(
                file,
                str_arg(args, "sheet_name"),
                &headers,
                &rows,
                bool_arg(args, "overwrite"),
            )?;
            to_bounded_json(&outcome)
        }
        other => Err(XlqError::parser(
            "tools/call",
            format!("unknown tool: {other}"),
        )),
    }
}
