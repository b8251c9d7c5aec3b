//! Stdio tool server exposing the workbook engine.
//!
//! Speaks JSON-RPC 2.0 over stdin/stdout. Two framings are supported and
//! detected per connection from the first inbound bytes: newline-delimited
//! JSON, or LSP-style `Content-Length` headers. Business failures are
//! reported inside the tool result; only protocol and response-size
//! violations become RPC errors.

mod handlers;
mod tools;

use std::io::{BufRead, BufReader, Write};

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use xlq_core::Engine;

/// Append a protocol trace line to the file named by `XLQ_DEBUG_LOG`.
/// Silent when the variable is unset.
fn dbg_log(msg: &str) {
    let Ok(path) = std::env::var("XLQ_DEBUG_LOG") else {
        return;
    };
    if path.is_empty() {
        return;
    }
    if let Ok(mut f) = std::fs::OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(f, "{msg}");
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FramingMode {
    Lsp,
    Lines,
}

/// Extract a `Content-Length` value from a single header line, if that is
/// what the line holds.
fn parse_content_length(line: &str) -> Option<usize> {
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse().ok()
}

/// One client connection. The framing is a property of the connection,
/// learned from the first message and then used for every reply.
struct Transport<R, W> {
    reader: R,
    writer: W,
    mode: FramingMode,
}

impl<R: BufRead, W: Write> Transport<R, W> {
    fn new(reader: R, writer: W) -> Self {
        Transport {
            reader,
            writer,
            mode: FramingMode::Lsp,
        }
    }

    /// Read one logical message, or `None` at end of stream.
    ///
    /// A line opening with `{` is a complete newline-delimited JSON
    /// message. Anything else starts an LSP-style header block; headers
    /// are parsed as they stream past, and the blank separator line is
    /// followed by an exact-length JSON body.
    fn read_message(&mut self) -> Result<Option<Value>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        if line.trim_start().starts_with('{') {
            self.mode = FramingMode::Lines;
            dbg_log(&format!("[recv-line] {}", line.trim_end()));
            return Ok(Some(serde_json::from_str(line.trim_end())?));
        }

        self.mode = FramingMode::Lsp;
        let mut content_length = parse_content_length(&line);
        while !line.trim().is_empty() {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                break;
            }
            content_length = content_length.or_else(|| parse_content_length(&line));
        }

        let Some(length) = content_length.filter(|n| *n > 0) else {
            dbg_log("[recv-lsp] no content length, skipping frame");
            return Ok(Some(Value::Null));
        };
        let mut body = vec![0u8; length];
        self.reader.read_exact(&mut body)?;
        dbg_log(&format!("[recv-lsp] {length} bytes"));
        Ok(Some(serde_json::from_slice(&body)?))
    }

    /// Reply in the connection's framing.
    fn write_message(&mut self, v: &Value) -> Result<()> {
        let body = serde_json::to_vec(v)?;
        if self.mode == FramingMode::Lsp {
            write!(self.writer, "Content-Length: {}\r\n\r\n", body.len())?;
        }
        self.writer.write_all(&body)?;
        if self.mode == FramingMode::Lines {
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        dbg_log(&format!("[send] {} bytes", body.len()));
        Ok(())
    }
}

#[derive(Deserialize)]
struct Request {
    id: serde_json::Value,
    method: String,
    #[serde(default)]
    params: serde_json::Value,
}

fn handle_initialize(id: serde_json::Value) -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "protocolVersion": "2024-11-05",
            "capabilities": { "tools": {} },
            "serverInfo": { "name": "xlq", "version": env!("CARGO_PKG_VERSION") }
        }
    })
}

fn handle_tools_list(id: serde_json::Value) -> serde_json::Value {
    json!({"jsonrpc": "2.0", "id": id, "result": {"tools": tools::tools_list()}})
}

/// Serve tool calls over stdin/stdout until EOF.
pub fn serve(engine: &Engine) -> Result<()> {
    let stdin = std::io::stdin();
    let mut transport = Transport::new(BufReader::new(stdin.lock()), std::io::stdout());
    while let Some(msg) = transport.read_message()? {
        let Ok(req) = serde_json::from_value::<Request>(msg) else {
            // notifications and other non-request traffic
            dbg_log("[recv] non-request/ignored");
            continue;
        };
        dbg_log(&format!("[recv] method={} id={}", req.method, req.id));
        let resp = match req.method.as_str() {
            "initialize" => handle_initialize(req.id),
            "tools/list" => handle_tools_list(req.id),
            "tools/call" => handlers::handle_call(engine, req.id, &req.params),
            _ => json!({
                "jsonrpc": "2.0",
                "id": req.id,
                "error": {"code": -32601, "message": "Method not found"}
            }),
        };
        transport.write_message(&resp)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn transport(input: &[u8]) -> Transport<Cursor<Vec<u8>>, Vec<u8>> {
        Transport::new(Cursor::new(input.to_vec()), Vec::new())
    }

    #[test]
    fn reads_newline_delimited_json() {
        let mut t = transport(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n");
        let msg = t.read_message().unwrap().unwrap();
        assert_eq!(msg["method"], "tools/list");
        assert!(t.mode == FramingMode::Lines);
    }

    #[test]
    fn reads_lsp_framed_json() {
        let body = br#"{"jsonrpc":"2.0","id":2,"method":"initialize"}"#;
        let mut bytes = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
        bytes.extend_from_slice(body);
        let mut t = transport(&bytes);
        let msg = t.read_message().unwrap().unwrap();
        assert_eq!(msg["id"], 2);
        assert!(t.mode == FramingMode::Lsp);
    }

    #[test]
    fn lsp_headers_beyond_content_length_are_tolerated() {
        let body = br#"{"id":3}"#;
        let mut bytes = format!(
            "Content-Type: application/json\r\nContent-Length: {}\r\n\r\n",
            body.len()
        )
        .into_bytes();
        bytes.extend_from_slice(body);
        let mut t = transport(&bytes);
        let msg = t.read_message().unwrap().unwrap();
        assert_eq!(msg["id"], 3);
    }

    #[test]
    fn header_block_without_length_is_skipped_as_null() {
        let mut t = transport(b"X-Nothing: here\r\n\r\n");
        let msg = t.read_message().unwrap().unwrap();
        assert!(msg.is_null());
    }

    #[test]
    fn eof_ends_the_stream() {
        let mut t = transport(b"");
        assert!(t.read_message().unwrap().is_none());
    }

    #[test]
    fn replies_match_the_connection_framing() {
        let mut t = transport(b"{\"id\":1,\"method\":\"x\"}\n");
        t.read_message().unwrap();
        t.write_message(&json!({"ok": true})).unwrap();
        assert_eq!(t.writer, b"{\"ok\":true}\n");

        let body = br#"{"id":2}"#;
        let mut bytes = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
        bytes.extend_from_slice(body);
        let mut t = transport(&bytes);
        t.read_message().unwrap();
        t.write_message(&json!({"ok": true})).unwrap();
        let out = String::from_utf8(t.writer.clone()).unwrap();
        assert!(out.starts_with("Content-Length: 11\r\n\r\n"));
        assert!(out.ends_with("{\"ok\":true}"));
    }

    #[test]
    fn content_length_parsing_is_case_insensitive_and_strict() {
        assert_eq!(parse_content_length("content-length: 42\r\n"), Some(42));
        assert_eq!(parse_content_length("Content-Length:7"), Some(7));
        assert_eq!(parse_content_length("Content-Type: json"), None);
        assert_eq!(parse_content_length("no colon here"), None);
        assert_eq!(parse_content_length("Content-Length: nope"), None);
    }

    #[test]
    fn initialize_reports_server_info() {
        let resp = handle_initialize(serde_json::json!(7));
        assert_eq!(resp["id"], 7);
        assert_eq!(resp["result"]["serverInfo"]["name"], "xlq");
    }

    #[test]
    fn tools_list_declares_all_operations() {
        let resp = handle_tools_list(serde_json::json!(1));
        let tools = resp["result"]["tools"].as_array().unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        for expected in [
            "sheets", "info", "read", "head", "tail", "search", "cell",
            "write_cell", "append_rows", "create_file", "write_range",
            "create_sheet", "delete_sheet", "rename_sheet", "insert_rows",
            "delete_rows",
        ] {
            assert!(names.contains(&expected), "missing tool {expected}");
        }
        assert_eq!(names.len(), 16);
    }
}
