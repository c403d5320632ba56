//! JSON I/O handling for the CLI
//!
//! - Output: exactly one JSON object per command on stdout
//! - Success: `{"status":"ok","data":{...}}`
//! - Failure: `{"status":"error","code":...,"message":...}` plus details
//! - UTF-8 only

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde_json::{json, Map, Value};

use super::errors::{CliError, CliResult};

/// Success envelope
pub fn ok_envelope(data: Value) -> Value {
    json!({
        "status": "ok",
        "data": data
    })
}

/// Error envelope; `details` are merged at the top level.
pub fn error_envelope(code: &str, message: &str, details: Map<String, Value>) -> Value {
    let mut response = Map::new();
    response.insert("status".into(), json!("error"));
    response.insert("code".into(), json!(code));
    response.insert("message".into(), json!(message));
    for (key, value) in details {
        response.entry(key).or_insert(value);
    }
    Value::Object(response)
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_value(&ok_envelope(data))
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str, details: Map<String, Value>) -> CliResult<()> {
    write_value(&error_envelope(code, message, details))
}

fn write_value(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

/// Read a UTF-8 input file (operation batch or document).
pub fn read_input(path: &Path) -> CliResult<String> {
    fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("failed to read {}: {}", path.display(), e)))
}
