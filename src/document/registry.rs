//! Schema-driven field registry
//!
//! The registry is the single description of which paths exist inside a
//! document and what shape each one has. It is built once per process and
//! consulted by the path resolver and the patch executor; nothing is
//! discovered from field names at call time.
//!
//! Supported types:
//! - string: UTF-8 string
//! - int: 64-bit unsigned counter
//! - status: lifecycle enum, stored as its lowercase name
//! - array: homogeneous list with an element type
//! - object: fixed set of named child fields
//! - map: arbitrary string keys with a value type
//! - any: opaque JSON

use std::sync::OnceLock;

use serde_json::{Map, Value};

/// Field types understood by the patch engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Int,
    Status,
    Array {
        element_type: Box<FieldType>,
    },
    Object {
        fields: Vec<FieldDef>,
    },
    Map {
        value_type: Box<FieldType>,
    },
    Any,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Status => "status",
            FieldType::Array { .. } => "array",
            FieldType::Object { .. } => "object",
            FieldType::Map { .. } => "map",
            FieldType::Any => "any",
        }
    }

    pub fn array_of(element_type: FieldType) -> Self {
        FieldType::Array {
            element_type: Box::new(element_type),
        }
    }

    pub fn map_of(value_type: FieldType) -> Self {
        FieldType::Map {
            value_type: Box::new(value_type),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, FieldType::Array { .. })
    }

    /// Element type if this is an array.
    pub fn element_type(&self) -> Option<&FieldType> {
        match self {
            FieldType::Array { element_type } => Some(element_type),
            _ => None,
        }
    }

    /// Looks up a declared child field of an object type, ignoring case.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        match self {
            FieldType::Object { fields } => {
                fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
            }
            _ => None,
        }
    }

    /// The value a field is reset to by `unset`.
    pub fn empty_value(&self) -> Value {
        match self {
            FieldType::String | FieldType::Status => Value::String(String::new()),
            FieldType::Int => Value::from(0u64),
            FieldType::Array { .. } => Value::Array(Vec::new()),
            FieldType::Object { fields } => {
                let mut obj = Map::new();
                for field in fields {
                    obj.insert(field.name.to_string(), field.field_type.empty_value());
                }
                Value::Object(obj)
            }
            FieldType::Map { .. } => Value::Object(Map::new()),
            FieldType::Any => Value::Null,
        }
    }
}

/// A declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Canonical field name as stored on disk
    pub name: &'static str,
    /// Field data type
    pub field_type: FieldType,
    /// Required fields can never be unset or emptied
    pub required: bool,
    /// Immutable fields may only be "set" to their current value
    pub immutable: bool,
}

impl FieldDef {
    pub fn optional(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
            immutable: false,
        }
    }

    pub fn required(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: true,
            immutable: false,
        }
    }

    /// Required and immutable.
    pub fn fixed(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: true,
            immutable: true,
        }
    }
}

/// The registry for one document type.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    root: FieldType,
}

impl FieldRegistry {
    /// The registry describing [`Document`](super::Document).
    pub fn document() -> &'static FieldRegistry {
        static REGISTRY: OnceLock<FieldRegistry> = OnceLock::new();
        REGISTRY.get_or_init(Self::build_document)
    }

    fn build_document() -> FieldRegistry {
        let string_list = || FieldType::array_of(FieldType::String);

        let refs = FieldType::Object {
            fields: vec![
                FieldDef::optional("uses", string_list()),
                FieldDef::optional("depends_on", string_list()),
                FieldDef::optional("implements", string_list()),
                FieldDef::optional("related", string_list()),
            ],
        };

        let content = FieldType::Object {
            fields: vec![
                FieldDef::optional("sections", FieldType::array_of(FieldType::Any)),
                FieldDef::optional("glossary", FieldType::map_of(FieldType::String)),
            ],
        };

        FieldRegistry {
            root: FieldType::Object {
                fields: vec![
                    FieldDef::fixed("id", FieldType::String),
                    FieldDef::required("kind", FieldType::String),
                    FieldDef::fixed("version", FieldType::Int),
                    FieldDef::required("status", FieldType::Status),
                    FieldDef::required("title", FieldType::String),
                    FieldDef::optional("summary", FieldType::String),
                    FieldDef::optional("tags", string_list()),
                    FieldDef::optional("refs", refs),
                    FieldDef::optional("content", content),
                    FieldDef::optional("issues", string_list()),
                    FieldDef::optional("constraints", string_list()),
                    FieldDef::optional("reviewers", string_list()),
                    FieldDef::optional("custom", FieldType::map_of(FieldType::Any)),
                ],
            },
        }
    }

    /// The root object type.
    pub fn root(&self) -> &FieldType {
        &self.root
    }

    /// Top-level field lookup, case-insensitive.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.root.field(name)
    }

    /// Top-level fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        match &self.root {
            FieldType::Object { fields } => fields,
            _ => &[],
        }
    }

    /// Names of the required top-level fields.
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields().iter().filter(|f| f.required).map(|f| f.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FieldRegistry::document();
        assert_eq!(registry.field("TITLE").unwrap().name, "title");
        assert_eq!(registry.field("Refs").unwrap().name, "refs");
        assert!(registry.field("colour").is_none());
    }

    #[test]
    fn test_required_fields() {
        let required: Vec<_> = FieldRegistry::document().required_fields().collect();
        assert_eq!(required, vec!["id", "kind", "version", "status", "title"]);
    }

    #[test]
    fn test_nested_lookup() {
        let refs = FieldRegistry::document().field("refs").unwrap();
        let uses = refs.field_type.field("USES").unwrap();
        assert_eq!(uses.name, "uses");
        assert!(uses.field_type.is_array());
    }

    #[test]
    fn test_registry_matches_serialized_document() {
        // Every serialized top-level key must be declared, and vice versa.
        let value = Document::new("a", "item", "A").to_value().unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        let registry = FieldRegistry::document();
        for key in &keys {
            assert!(registry.field(key).is_some(), "undeclared field {}", key);
        }
        assert_eq!(keys.len(), registry.fields().len());
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(FieldType::String.empty_value(), Value::String(String::new()));
        assert_eq!(
            FieldType::array_of(FieldType::String).empty_value(),
            Value::Array(vec![])
        );
        let refs = FieldRegistry::document().field("refs").unwrap();
        let empty = refs.field_type.empty_value();
        assert_eq!(empty["uses"], Value::Array(vec![]));
    }
}
