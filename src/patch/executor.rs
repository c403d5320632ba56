//! Patch executor
//!
//! Applies one operation to the JSON view of a document. The executor never
//! touches `version`; the version bump belongs to the pipeline and happens
//! once per command, not once per operation.

use serde_json::Value;

use super::coerce::coerce;
use super::errors::{PatchError, PatchResult};
use super::operation::PatchOp;
use super::path::{PatchPath, Slot};
use crate::document::{FieldRegistry, FieldType};

/// Executes patch operations against documents described by a registry.
#[derive(Debug, Clone, Copy)]
pub struct PatchExecutor<'r> {
    registry: &'r FieldRegistry,
}

impl PatchExecutor<'static> {
    /// Executor for [`Document`](crate::document::Document).
    pub fn for_documents() -> Self {
        Self::new(FieldRegistry::document())
    }
}

impl<'r> PatchExecutor<'r> {
    pub fn new(registry: &'r FieldRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r FieldRegistry {
        self.registry
    }

    /// Applies `op` in place. On error `doc` may be partially modified by
    /// this operation only; callers work on a copy.
    pub fn apply(&self, doc: &mut Value, op: &PatchOp) -> PatchResult<()> {
        let path = PatchPath::parse(op.path())?;
        match op {
            PatchOp::Set { value, .. } => self.set(doc, &path, value),
            PatchOp::Append { value, .. } => self.append(doc, &path, value),
            PatchOp::Unset { .. } => self.unset(doc, &path),
        }
    }

    fn set(&self, doc: &mut Value, path: &PatchPath, value: &Value) -> PatchResult<()> {
        match path.resolve(doc, self.registry)? {
            Slot::Field {
                parent,
                key,
                field_type,
                def,
            } => {
                let new_value = coerce(value, field_type, path.as_str())?;
                if let Some(def) = def {
                    if def.immutable && parent.get(&key) != Some(&new_value) {
                        return Err(PatchError::ImmutableField {
                            path: path.to_string(),
                        });
                    }
                    if def.required && is_blank(&new_value) {
                        return Err(PatchError::RequiredField {
                            path: path.to_string(),
                        });
                    }
                }
                parent.insert(key, new_value);
                Ok(())
            }
            Slot::Element {
                array,
                index,
                element_type,
            } => {
                array[index] = coerce(value, element_type, path.as_str())?;
                Ok(())
            }
        }
    }

    fn append(&self, doc: &mut Value, path: &PatchPath, value: &Value) -> PatchResult<()> {
        match path.resolve(doc, self.registry)? {
            Slot::Field {
                parent,
                key,
                field_type,
                ..
            } => {
                let target = parent
                    .get_mut(&key)
                    .ok_or_else(|| PatchError::path_not_found(path.as_str()))?;
                push(target, field_type, value, path)
            }
            Slot::Element {
                array,
                index,
                element_type,
            } => push(&mut array[index], element_type, value, path),
        }
    }

    fn unset(&self, doc: &mut Value, path: &PatchPath) -> PatchResult<()> {
        match path.resolve(doc, self.registry)? {
            Slot::Field {
                parent,
                key,
                field_type,
                def,
            } => match def {
                Some(def) if def.required => Err(PatchError::RequiredField {
                    path: path.to_string(),
                }),
                Some(_) => {
                    parent.insert(key, field_type.empty_value());
                    Ok(())
                }
                None => parent
                    .remove(&key)
                    .map(|_| ())
                    .ok_or_else(|| PatchError::path_not_found(path.as_str())),
            },
            Slot::Element { array, index, .. } => {
                array.remove(index);
                Ok(())
            }
        }
    }
}

fn push(target: &mut Value, field_type: &FieldType, value: &Value, path: &PatchPath) -> PatchResult<()> {
    let any = FieldType::Any;
    let element_type = match field_type {
        FieldType::Array { element_type } => element_type.as_ref(),
        FieldType::Any => &any,
        _ => return Err(PatchError::not_an_array(path.as_str())),
    };
    let items = target
        .as_array_mut()
        .ok_or_else(|| PatchError::not_an_array(path.as_str()))?;
    let element_path = format!("{}[{}]", path, items.len());
    items.push(coerce(value, element_type, &element_path)?);
    Ok(())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::String(s) => s.trim().is_empty(),
        Value::Null => true,
        _ => false,
    }
}
