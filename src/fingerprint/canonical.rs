//! Canonical JSON encoding
//!
//! Canonicalization rules:
//! 1. Object keys are sorted lexicographically (byte order), at every depth
//! 2. No insignificant whitespace
//! 3. Strings use serde_json escaping
//! 4. Numbers use serde_json's shortest round-trip form
//!
//! The output does not depend on the key order of the input, so unordered
//! containers (glossary, custom fields) hash identically however they were
//! built.

use serde_json::Value;

/// Encodes a JSON value canonically.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut output = String::new();
    emit(value, &mut output);
    output
}

fn emit(value: &Value, output: &mut String) {
    match value {
        Value::Null => output.push_str("null"),
        Value::Bool(b) => output.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => output.push_str(&n.to_string()),
        Value::String(s) => emit_string(s, output),
        Value::Array(items) => {
            output.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    output.push(',');
                }
                emit(item, output);
            }
            output.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            output.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    output.push(',');
                }
                emit_string(key, output);
                output.push(':');
                emit(&map[key], output);
            }
            output.push('}');
        }
    }
}

fn emit_string(s: &str, output: &mut String) {
    // Serializing a &str cannot fail.
    match serde_json::to_string(s) {
        Ok(quoted) => output.push_str(&quoted),
        Err(_) => output.push_str("\"\""),
    }
}
