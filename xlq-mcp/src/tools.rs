//! Tool declarations for the stdio server.

use serde_json::json;

fn tool(name: &str, description: &str, input_schema: serde_json::Value) -> serde_json::Value {
    json!({"name": name, "description": description, "inputSchema": input_schema})
}

pub fn tools_list() -> Vec<serde_json::Value> {
    vec![
        tool("sheets", "List all sheets in an Excel workbook", json!({"type":"object","properties":{
            "file":{"type":"string","description":"Path to xlsx file"}
        },"required":["file"]})),
        tool("info", "Get metadata about a sheet (rows, columns, headers)", json!({"type":"object","properties":{
            "file":{"type":"string","description":"Path to xlsx file"},
            "sheet":{"type":"string","description":"Sheet name (default: first sheet)"}
        },"required":["file"]})),
        tool("read", "Read cells from a range or entire sheet", json!({"type":"object","properties":{
            "file":{"type":"string","description":"Path to xlsx file"},
            "sheet":{"type":"string","description":"Sheet name (default: first sheet)"},
            "range":{"type":"string","description":"Cell range (e.g., A1:C10). If not specified, reads entire sheet"},
            "limit":{"type":"number","description":"Maximum rows when no range specified (default: 1000)"}
        },"required":["file"]})),
        tool("head", "Get first N rows of a sheet", json!({"type":"object","properties":{
            "file":{"type":"string","description":"Path to xlsx file"},
            "sheet":{"type":"string","description":"Sheet name (default: first sheet)"},
            "n":{"type":"number","description":"Number of rows (default: 10)"}
        },"required":["file"]})),
        tool("tail", "Get last N rows of a sheet", json!({"type":"object","properties":{
            "file":{"type":"string","description":"Path to xlsx file"},
            "sheet":{"type":"string","description":"Sheet name (default: first sheet)"},
            "n":{"type":"number","description":"Number of rows (default: 10)"}
        },"required":["file"]})),
        tool("search", "Search for cells matching a pattern across sheets", json!({"type":"object","properties":{
            "file":{"type":"string","description":"Path to xlsx file"},
            "pattern":{"type":"string","description":"Search pattern (string or regex)"},
            "sheet":{"type":"string","description":"Sheet to search (default: all sheets)"},
            "ignoreCase":{"type":"boolean","description":"Case-insensitive search (default: false)"},
            "regex":{"type":"boolean","description":"Treat pattern as regex (default: false)"},
            "maxResults":{"type":"number","description":"Maximum results to return (0 = unlimited, default: 100)"}
        },"required":["file","pattern"]})),
        tool("cell", "Get a single cell value", json!({"type":"object","properties":{
            "file":{"type":"string","description":"Path to xlsx file"},
            "address":{"type":"string","description":"Cell address (e.g., A1, B23)"},
            "sheet":{"type":"string","description":"Sheet name (default: first sheet)"}
        },"required":["file","address"]})),
        tool("write_cell", "Write a value to a single cell", json!({"type":"object","properties":{
            "file":{"type":"string","description":"Path to xlsx file"},
            "cell":{"type":"string","description":"Cell address (e.g., A1)"},
            "value":{"description":"Value to write"},
            "sheet":{"type":"string","description":"Sheet name (default: first sheet)"},
            "type":{"type":"string","description":"Value type: auto, string, number, bool, formula (default: auto)"}
        },"required":["file","cell","value"]})),
        tool("append_rows", "Append rows after the last data row of a sheet", json!({"type":"object","properties":{
            "file":{"type":"string","description":"Path to xlsx file"},
            "rows":{"type":"array","items":{"type":"array"},"description":"Rows to append (array of arrays)"},
            "sheet":{"type":"string","description":"Sheet name (default: first sheet)"}
        },"required":["file","rows"]})),
        tool("create_file", "Create a new xlsx file with optional headers and data", json!({"type":"object","properties":{
            "file":{"type":"string","description":"Path for the new xlsx file"},
            "sheet_name":{"type":"string","description":"Name for the first sheet (default: Sheet1)"},
            "headers":{"type":"array","items":{"type":"string"},"description":"Header row values"},
            "rows":{"type":"array","items":{"type":"array"},"description":"Initial data rows (array of arrays)"},
            "overwrite":{"type":"boolean","description":"Overwrite an existing file (default: false)"}
        },"required":["file"]})),
        tool("write_range", "Write a block of values anchored at a start cell", json!({"type":"object","properties":{
            "file":{"type":"string","description":"Path to xlsx file"},
            "start_cell":{"type":"string","description":"Top-left cell of the block (e.g., B2)"},
            "data":{"type":"array","items":{"type":"array"},"description":"Values to write (array of arrays)"},
            "sheet":{"type":"string","description":"Sheet name (default: first sheet)"}
        },"required":["file","start_cell","data"]})),
        tool("create_sheet", "Add a new sheet to a workbook", json!({"type":"object","properties":{
            "file":{"type":"string","description":"Path to xlsx file"},
            "name":{"type":"string","description":"Name of the new sheet"},
            "headers":{"type":"array","items":{"type":"string"},"description":"Optional header row"}
        },"required":["file","name"]})),
        tool("delete_sheet", "Delete a sheet from a workbook", json!({"type":"object","properties":{
            "file":{"type":"string","description":"Path to xlsx file"},
            "name":{"type":"string","description":"Name of the sheet to delete"}
        },"required":["file","name"]})),
        tool("rename_sheet", "Rename a sheet", json!({"type":"object","properties":{
            "file":{"type":"string","description":"Path to xlsx file"},
            "old_name":{"type":"string","description":"Current sheet name"},
            "new_name":{"type":"string","description":"New sheet name"}
        },"required":["file","old_name","new_name"]})),
        tool("insert_rows", "Insert rows at a position, shifting existing rows down", json!({"type":"object","properties":{
            "file":{"type":"string","description":"Path to xlsx file"},
            "row":{"type":"number","description":"1-based row position to insert at"},
            "rows":{"type":"array","items":{"type":"array"},"description":"Rows to insert (array of arrays)"},
            "sheet":{"type":"string","description":"Sheet name (default: first sheet)"}
        },"required":["file","row","rows"]})),
        tool("delete_rows", "Delete a contiguous block of rows", json!({"type":"object","properties":{
            "file":{"type":"string","description":"Path to xlsx file"},
            "start_row":{"type":"number","description":"1-based first row to delete"},
            "count":{"type":"number","description":"Number of rows to delete"},
            "sheet":{"type":"string","description":"Sheet name (default: first sheet)"}
        },"required":["file","start_row","count"]})),
    ]
}
