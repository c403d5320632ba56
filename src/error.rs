//! Top-level error type
//!
//! Subsystem errors roll up into [`NodeError`]. Every variant maps to a
//! stable string code and a process exit code:
//!
//! | exit | meaning                      |
//! |------|------------------------------|
//! | 0    | success                      |
//! | 1    | any other failure            |
//! | 2    | usage error (argument parse) |
//! | 3    | fingerprint conflict         |
//! | 4    | validation rejected          |
//!
//! Nothing is retried automatically.

use thiserror::Error;

use crate::audit::AuditError;
use crate::guard::ConflictError;
use crate::patch::{PatchError, PatchOp};
use crate::pipeline::TransitionError;
use crate::store::StoreError;
use crate::validator::ValidationIssue;

pub type NodeResult<T> = Result<T, NodeError>;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_CONFLICT: i32 = 3;
pub const EXIT_REJECTED: i32 = 4;

#[derive(Debug, Error)]
pub enum NodeError {
    /// Operation `index` (1-based) of a transaction failed; nothing was written
    #[error("operation {index} ({op}) failed: {source}")]
    Patch {
        index: usize,
        op: String,
        #[source]
        source: PatchError,
    },

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error("validation rejected: {}", summarize(.issues))]
    ValidationRejected { issues: Vec<ValidationIssue> },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    /// The document was persisted but its audit record was not written.
    /// `reconcile` repairs this.
    #[error("'{id}' persisted at version {version} but the audit append failed: {source}")]
    AuditPending {
        id: String,
        version: u64,
        #[source]
        source: AuditError,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl NodeError {
    pub fn patch(index: usize, op: &PatchOp, source: PatchError) -> Self {
        Self::Patch {
            index,
            op: op.to_string(),
            source,
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            NodeError::Patch { source, .. } => source.code(),
            NodeError::Conflict(_) => "NODE_CONFLICT",
            NodeError::ValidationRejected { .. } => "NODE_VALIDATION_REJECTED",
            NodeError::Store(e) => e.code(),
            NodeError::Audit(e) => e.code(),
            NodeError::AuditPending { .. } => "NODE_STORAGE_UNAVAILABLE",
            NodeError::InvalidRequest(_) => "NODE_INVALID_REQUEST",
            NodeError::Transition(_) => "NODE_INTERNAL",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            NodeError::Conflict(_) => EXIT_CONFLICT,
            NodeError::ValidationRejected { .. } => EXIT_REJECTED,
            _ => EXIT_FAILURE,
        }
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::fingerprint::fingerprint;

    #[test]
    fn test_patch_error_keeps_index_and_code() {
        let op = PatchOp::set("bogus.field", "x");
        let err = NodeError::patch(2, &op, PatchError::path_not_found("bogus.field"));
        assert_eq!(err.code(), "NODE_PATH_NOT_FOUND");
        assert_eq!(err.exit_code(), EXIT_FAILURE);
        assert!(err.to_string().starts_with("operation 2"));
    }

    #[test]
    fn test_conflict_exit_code() {
        let err = NodeError::from(ConflictError {
            id: "a".into(),
            expected: "0000000000000000".into(),
            actual: fingerprint(&Document::new("a", "item", "A")),
        });
        assert_eq!(err.code(), "NODE_CONFLICT");
        assert_eq!(err.exit_code(), EXIT_CONFLICT);
    }

    #[test]
    fn test_rejection_lists_issues() {
        let err = NodeError::ValidationRejected {
            issues: vec![
                ValidationIssue::new("title", "required", "must not be empty"),
                ValidationIssue::new("tags[1]", "duplicate_tag", "duplicate tag 'x'"),
            ],
        };
        assert_eq!(err.exit_code(), EXIT_REJECTED);
        let text = err.to_string();
        assert!(text.contains("title") && text.contains("tags[1]"));
    }

    #[test]
    fn test_store_codes_pass_through() {
        let err = NodeError::from(StoreError::NotFound("a".into()));
        assert_eq!(err.code(), "NODE_NOT_FOUND");
    }
}
