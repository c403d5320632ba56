//! Store error types
//!
//! Error codes:
//! - NODE_NOT_FOUND
//! - NODE_ALREADY_EXISTS
//! - NODE_INVALID_ID
//! - NODE_CORRUPT
//! - NODE_STORAGE_UNAVAILABLE

use std::io;

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("document already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid document identifier: '{0}'")]
    InvalidId(String),

    #[error("corrupt document '{id}': {reason}")]
    Corrupt { id: String, reason: String },

    #[error("storage unavailable: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn corrupt(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "NODE_NOT_FOUND",
            StoreError::AlreadyExists(_) => "NODE_ALREADY_EXISTS",
            StoreError::InvalidId(_) => "NODE_INVALID_ID",
            StoreError::Corrupt { .. } => "NODE_CORRUPT",
            StoreError::Io { .. } => "NODE_STORAGE_UNAVAILABLE",
        }
    }
}
