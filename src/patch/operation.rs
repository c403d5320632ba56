//! Patch operations
//!
//! Operations are pure data; they know nothing about documents until the
//! executor applies them. Batch files use the same JSON shape:
//!
//! ```json
//! [
//!   {"op": "set", "path": "title", "value": "Steel Sword"},
//!   {"op": "append", "path": "tags", "value": "legendary"},
//!   {"op": "unset", "path": "refs.uses[0]"}
//! ]
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Set,
    Append,
    Unset,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Set => "set",
            OpKind::Append => "append",
            OpKind::Unset => "unset",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single patch instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase", deny_unknown_fields)]
pub enum PatchOp {
    /// Overwrite the addressed slot
    Set { path: String, value: Value },
    /// Push onto the addressed array
    Append { path: String, value: Value },
    /// Reset a field to empty, drop a map key, or remove one array element
    Unset { path: String },
}

impl PatchOp {
    pub fn set(path: impl Into<String>, value: impl Into<Value>) -> Self {
        PatchOp::Set {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn append(path: impl Into<String>, value: impl Into<Value>) -> Self {
        PatchOp::Append {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn unset(path: impl Into<String>) -> Self {
        PatchOp::Unset { path: path.into() }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            PatchOp::Set { .. } => OpKind::Set,
            PatchOp::Append { .. } => OpKind::Append,
            PatchOp::Unset { .. } => OpKind::Unset,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            PatchOp::Set { path, .. } | PatchOp::Append { path, .. } | PatchOp::Unset { path } => {
                path
            }
        }
    }

    /// Parses a batch file body.
    pub fn parse_batch(json: &str) -> serde_json::Result<Vec<PatchOp>> {
        serde_json::from_str(json)
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.path())
    }
}
