//! Type-aware value coercion
//!
//! Values arrive either as JSON from a batch file or as raw strings from the
//! command line. A string is converted to the declared type of the target
//! (int, status, JSON array, JSON object). For opaque targets it is trial
//! parsed in the order int, float, bool, JSON array, JSON object, falling back
//! to the string itself.

use serde_json::{Map, Number, Value};

use super::errors::{PatchError, PatchResult};
use crate::document::{FieldType, Status};

/// Converts `value` to the shape declared by `target`.
pub fn coerce(value: &Value, target: &FieldType, path: &str) -> PatchResult<Value> {
    match target {
        FieldType::String => match value {
            Value::String(_) => Ok(value.clone()),
            other => Err(mismatch(path, target, other)),
        },

        FieldType::Int => match value {
            Value::Number(n) if n.is_u64() => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<u64>()
                .map(Value::from)
                .map_err(|_| mismatch(path, target, value)),
            other => Err(mismatch(path, target, other)),
        },

        FieldType::Status => match value {
            Value::String(s) => s
                .parse::<Status>()
                .map(|status| Value::String(status.as_str().to_string()))
                .map_err(|_| PatchError::type_mismatch(path, "status", format!("'{}'", s))),
            other => Err(mismatch(path, target, other)),
        },

        FieldType::Array { element_type } => {
            let parsed = parse_container(value, path, target)?;
            let items = parsed
                .as_array()
                .ok_or_else(|| mismatch(path, target, &parsed))?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| coerce(item, element_type, &format!("{}[{}]", path, i)))
                .collect::<PatchResult<Vec<_>>>()
                .map(Value::Array)
        }

        FieldType::Object { fields } => {
            let parsed = parse_container(value, path, target)?;
            let obj = parsed
                .as_object()
                .ok_or_else(|| mismatch(path, target, &parsed))?;

            // Start from the empty shape so every declared child is present.
            let mut out = match target.empty_value() {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            for (key, child) in obj {
                let def = fields
                    .iter()
                    .find(|f| f.name.eq_ignore_ascii_case(key))
                    .ok_or_else(|| PatchError::path_not_found(format!("{}.{}", path, key)))?;
                let child_path = format!("{}.{}", path, def.name);
                out.insert(def.name.to_string(), coerce(child, &def.field_type, &child_path)?);
            }
            Ok(Value::Object(out))
        }

        FieldType::Map { value_type } => {
            let parsed = parse_container(value, path, target)?;
            let obj = parsed
                .as_object()
                .ok_or_else(|| mismatch(path, target, &parsed))?;
            let mut out = Map::new();
            for (key, child) in obj {
                out.insert(key.clone(), coerce(child, value_type, &format!("{}.{}", path, key))?);
            }
            Ok(Value::Object(out))
        }

        FieldType::Any => Ok(match value {
            Value::String(s) => infer_scalar(s),
            other => other.clone(),
        }),
    }
}

/// Trial-parses a raw string into the most specific JSON value it denotes.
pub fn infer_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();

    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
            if parsed.is_array() || parsed.is_object() {
                return parsed;
            }
        }
    }
    Value::String(raw.to_string())
}

/// Accepts a container value as-is, or a string holding JSON for one.
fn parse_container(value: &Value, path: &str, target: &FieldType) -> PatchResult<Value> {
    match value {
        Value::String(s) => {
            serde_json::from_str::<Value>(s.trim()).map_err(|_| mismatch(path, target, value))
        }
        other => Ok(other.clone()),
    }
}

fn mismatch(path: &str, expected: &FieldType, actual: &Value) -> PatchError {
    PatchError::type_mismatch(path, expected.type_name(), json_type_name(actual))
}

/// JSON type name of a value, for error messages
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FieldRegistry;
    use serde_json::json;

    #[test]
    fn test_string_target_keeps_numeric_text() {
        let v = coerce(&json!("42"), &FieldType::String, "title").unwrap();
        assert_eq!(v, json!("42"));
    }

    #[test]
    fn test_string_target_rejects_object() {
        let err = coerce(&json!({"a": 1}), &FieldType::String, "title").unwrap_err();
        assert!(matches!(err, PatchError::TypeMismatch { .. }));
    }

    #[test]
    fn test_status_normalized() {
        let v = coerce(&json!("Review"), &FieldType::Status, "status").unwrap();
        assert_eq!(v, json!("review"));
        assert!(coerce(&json!("done"), &FieldType::Status, "status").is_err());
    }

    #[test]
    fn test_array_from_json_text() {
        let target = FieldType::array_of(FieldType::String);
        let v = coerce(&json!(r#"["a","b"]"#), &target, "tags").unwrap();
        assert_eq!(v, json!(["a", "b"]));
    }

    #[test]
    fn test_object_where_array_expected() {
        let target = FieldType::array_of(FieldType::String);
        let err = coerce(&json!({"a": "b"}), &target, "tags").unwrap_err();
        assert_eq!(
            err,
            PatchError::type_mismatch("tags", "array", "object")
        );
    }

    #[test]
    fn test_object_fills_missing_children_and_canonicalizes_names() {
        let refs = &FieldRegistry::document().field("refs").unwrap().field_type;
        let v = coerce(&json!({"USES": ["x"]}), refs, "refs").unwrap();
        assert_eq!(v["uses"], json!(["x"]));
        assert_eq!(v["related"], json!([]));
    }

    #[test]
    fn test_object_unknown_child_is_path_not_found() {
        let refs = &FieldRegistry::document().field("refs").unwrap().field_type;
        let err = coerce(&json!({"owns": []}), refs, "refs").unwrap_err();
        assert!(matches!(err, PatchError::PathNotFound { .. }));
    }

    #[test]
    fn test_infer_scalar_order() {
        assert_eq!(infer_scalar("7"), json!(7));
        assert_eq!(infer_scalar("2.5"), json!(2.5));
        assert_eq!(infer_scalar("true"), json!(true));
        assert_eq!(infer_scalar("[1,2]"), json!([1, 2]));
        assert_eq!(infer_scalar(r#"{"k":1}"#), json!({"k": 1}));
        assert_eq!(infer_scalar("legendary"), json!("legendary"));
        assert_eq!(infer_scalar("[not json"), json!("[not json"));
    }
}
