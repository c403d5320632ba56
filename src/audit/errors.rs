//! Audit trail errors
//!
//! Error codes:
//! - NODE_STORAGE_UNAVAILABLE (trail cannot be opened, read or appended)
//! - NODE_CORRUPT (a line fails to parse or its checksum mismatches)

use std::io;

use thiserror::Error;

pub type AuditResult<T> = Result<T, AuditError>;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit trail unavailable: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("corrupt audit record at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("audit record could not be encoded: {0}")]
    Encode(String),
}

impl AuditError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn corrupt(line: usize, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            line,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuditError::Io { .. } | AuditError::Encode(_) => "NODE_STORAGE_UNAVAILABLE",
            AuditError::Corrupt { .. } => "NODE_CORRUPT",
        }
    }
}
