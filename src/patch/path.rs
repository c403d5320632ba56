//! Path expressions and resolution
//!
//! A path is a dotted sequence of field names, each optionally followed by a
//! zero-based index in brackets: `title`, `tags[1]`, `refs.uses[2]`,
//! `content.sections[0].heading`.
//!
//! A name is any run of characters other than `.`, `[` and `]`, without
//! leading or trailing whitespace, so map keys such as `2h` or
//! `steel ingot` are addressable. Keys containing `.`, `[` or `]` can be
//! stored through a whole-document rewrite but cannot be named in a path.
//!
//! Resolution walks the field registry and the JSON view of the document
//! side by side. Names are matched case-insensitively against declared
//! fields; unknown names are always an error.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::errors::{PatchError, PatchResult};
use crate::document::{FieldDef, FieldRegistry, FieldType};

/// Type used for children of opaque JSON.
static ANY: FieldType = FieldType::Any;

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([^.\[\]\s](?:[^.\[\]]*[^.\[\]\s])?)(?:\[(-?[0-9]+)\])?$")
            .expect("segment pattern is a valid regex")
    })
}

/// One `name` or `name[N]` component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub index: Option<i64>,
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPath {
    raw: String,
    segments: Vec<Segment>,
}

/// A resolved, writable location inside a document.
#[derive(Debug)]
pub enum Slot<'v, 'r> {
    /// A named field (possibly not yet present, for map keys)
    Field {
        parent: &'v mut Map<String, Value>,
        key: String,
        field_type: &'r FieldType,
        /// Declaration, when the field is part of the fixed schema
        def: Option<&'r FieldDef>,
    },
    /// One element of an array field
    Element {
        array: &'v mut Vec<Value>,
        index: usize,
        element_type: &'r FieldType,
    },
}

impl PatchPath {
    /// Parses a path expression.
    ///
    /// Malformed input (empty segments, unbalanced or non-numeric brackets)
    /// is reported as `PathNotFound`.
    pub fn parse(raw: &str) -> PatchResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PatchError::path_not_found(raw));
        }

        let mut segments = Vec::new();
        for part in trimmed.split('.') {
            let caps = segment_pattern()
                .captures(part)
                .ok_or_else(|| PatchError::path_not_found(trimmed))?;
            let index = match caps.get(2) {
                Some(m) => Some(
                    m.as_str()
                        .parse::<i64>()
                        .map_err(|_| PatchError::path_not_found(trimmed))?,
                ),
                None => None,
            };
            segments.push(Segment {
                name: caps[1].to_string(),
                index,
            });
        }

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the path ends in an element index.
    pub fn is_indexed(&self) -> bool {
        self.segments.last().map_or(false, |s| s.index.is_some())
    }

    /// Canonical name of the field this path touches: segments up to and
    /// including the first indexed one, with the index dropped. Used as the
    /// key for audit before/after snapshots.
    pub fn field_key(&self, registry: &FieldRegistry) -> String {
        let mut names = Vec::new();
        let mut current = Some(registry.root());
        for segment in &self.segments {
            let name = match current.and_then(|t| t.field(&segment.name)) {
                Some(def) => {
                    current = Some(&def.field_type);
                    def.name.to_string()
                }
                None => {
                    current = match current {
                        Some(FieldType::Map { value_type }) => Some(value_type.as_ref()),
                        _ => None,
                    };
                    segment.name.clone()
                }
            };
            names.push(name);
            if segment.index.is_some() {
                break;
            }
        }
        names.join(".")
    }

    /// Resolves this path against the JSON view of a document.
    pub fn resolve<'v, 'r>(
        &self,
        root: &'v mut Value,
        registry: &'r FieldRegistry,
    ) -> PatchResult<Slot<'v, 'r>> {
        let (last, parents) = self
            .segments
            .split_last()
            .ok_or_else(|| self.not_found())?;

        let mut current: &'v mut Value = root;
        let mut current_type: &'r FieldType = registry.root();

        for segment in parents {
            let (key, field_type, _) = self.child(current_type, &segment.name)?;
            let obj = current.as_object_mut().ok_or_else(|| self.not_found())?;
            current = obj.get_mut(&key).ok_or_else(|| self.not_found())?;
            current_type = field_type;

            if let Some(index) = segment.index {
                let (array, position, element_type) =
                    self.element_of(current, current_type, index)?;
                current = &mut array[position];
                current_type = element_type;
            }
        }

        let (key, field_type, def) = self.child(current_type, &last.name)?;
        let parent = current.as_object_mut().ok_or_else(|| self.not_found())?;

        match last.index {
            None => Ok(Slot::Field {
                parent,
                key,
                field_type,
                def,
            }),
            Some(index) => {
                let value = parent.get_mut(&key).ok_or_else(|| self.not_found())?;
                let (array, index, element_type) = self.element_of(value, field_type, index)?;
                Ok(Slot::Element {
                    array,
                    index,
                    element_type,
                })
            }
        }
    }

    /// Finds the named child of a container type.
    fn child<'r>(
        &self,
        container: &'r FieldType,
        name: &str,
    ) -> PatchResult<(String, &'r FieldType, Option<&'r FieldDef>)> {
        match container {
            FieldType::Object { .. } => {
                let def = container.field(name).ok_or_else(|| self.not_found())?;
                Ok((def.name.to_string(), &def.field_type, Some(def)))
            }
            FieldType::Map { value_type } => Ok((name.to_string(), value_type.as_ref(), None)),
            FieldType::Any => Ok((name.to_string(), &ANY, None)),
            _ => Err(self.not_found()),
        }
    }

    /// Checks that `value` is an array of `field_type` and that `index` is in range.
    fn element_of<'v, 'r>(
        &self,
        value: &'v mut Value,
        field_type: &'r FieldType,
        index: i64,
    ) -> PatchResult<(&'v mut Vec<Value>, usize, &'r FieldType)> {
        let element_type = match field_type {
            FieldType::Array { element_type } => element_type.as_ref(),
            FieldType::Any => &ANY,
            _ => return Err(PatchError::not_an_array(self.raw.clone())),
        };
        let array = value
            .as_array_mut()
            .ok_or_else(|| PatchError::not_an_array(self.raw.clone()))?;

        let len = array.len();
        if index < 0 || index as u64 >= len as u64 {
            return Err(PatchError::IndexOutOfRange {
                path: self.raw.clone(),
                index,
                len,
            });
        }
        Ok((array, index as usize, element_type))
    }

    fn not_found(&self) -> PatchError {
        PatchError::path_not_found(self.raw.clone())
    }
}

impl FromStr for PatchPath {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PatchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
