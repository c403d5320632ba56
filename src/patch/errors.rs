//! Patch error types
//!
//! Error codes:
//! - NODE_PATH_NOT_FOUND
//! - NODE_INDEX_OUT_OF_RANGE
//! - NODE_NOT_AN_ARRAY
//! - NODE_TYPE_MISMATCH
//! - NODE_REQUIRED_FIELD
//! - NODE_IMMUTABLE_FIELD

use thiserror::Error;

/// Result type for patch operations
pub type PatchResult<T> = Result<T, PatchError>;

/// A single patch operation could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("path not found: '{path}'")]
    PathNotFound { path: String },

    #[error("index {index} out of range for '{path}' (length {len})")]
    IndexOutOfRange { path: String, index: i64, len: usize },

    #[error("'{path}' is not an array")]
    NotAnArray { path: String },

    #[error("type mismatch at '{path}': expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("'{path}' is a required field and cannot be removed or emptied")]
    RequiredField { path: String },

    #[error("'{path}' is immutable")]
    ImmutableField { path: String },
}

impl PatchError {
    pub fn path_not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    pub fn not_an_array(path: impl Into<String>) -> Self {
        Self::NotAnArray { path: path.into() }
    }

    pub fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            PatchError::PathNotFound { .. } => "NODE_PATH_NOT_FOUND",
            PatchError::IndexOutOfRange { .. } => "NODE_INDEX_OUT_OF_RANGE",
            PatchError::NotAnArray { .. } => "NODE_NOT_AN_ARRAY",
            PatchError::TypeMismatch { .. } => "NODE_TYPE_MISMATCH",
            PatchError::RequiredField { .. } => "NODE_REQUIRED_FIELD",
            PatchError::ImmutableField { .. } => "NODE_IMMUTABLE_FIELD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            PatchError::path_not_found("a"),
            PatchError::IndexOutOfRange {
                path: "a".into(),
                index: 3,
                len: 1,
            },
            PatchError::not_an_array("a"),
            PatchError::type_mismatch("a", "int", "string"),
            PatchError::RequiredField { path: "a".into() },
            PatchError::ImmutableField { path: "a".into() },
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_includes_path() {
        let err = PatchError::IndexOutOfRange {
            path: "tags[5]".into(),
            index: 5,
            len: 2,
        };
        let display = err.to_string();
        assert!(display.contains("tags[5]"));
        assert!(display.contains("length 2"));
    }
}
