//! CLI-specific error types
//!
//! Core failures pass through unchanged as [`CliError::Node`]; the CLI adds
//! only configuration and setup errors of its own.

use std::io;

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::audit::AuditError;
use crate::error::{NodeError, EXIT_FAILURE};
use crate::store::StoreError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (input files, stdout)
    IoError,
    /// Store already initialized
    AlreadyInitialized,
    /// Store not initialized
    NotInitialized,
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "NODE_CLI_CONFIG_ERROR",
            Self::IoError => "NODE_CLI_IO_ERROR",
            Self::AlreadyInitialized => "NODE_CLI_ALREADY_INITIALIZED",
            Self::NotInitialized => "NODE_CLI_NOT_INITIALIZED",
        }
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{message}")]
    Cli { code: CliErrorCode, message: String },

    #[error(transparent)]
    Node(#[from] NodeError),
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self::Cli {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn already_initialized() -> Self {
        Self::new(CliErrorCode::AlreadyInitialized, "store already initialized")
    }

    pub fn not_initialized() -> Self {
        Self::new(
            CliErrorCode::NotInitialized,
            "store not initialized; run 'nodeforge init' first",
        )
    }

    /// Stable error code string
    pub fn code_str(&self) -> &'static str {
        match self {
            Self::Cli { code, .. } => code.code(),
            Self::Node(e) => e.code(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Cli { .. } => EXIT_FAILURE,
            Self::Node(e) => e.exit_code(),
        }
    }

    /// Extra fields for the error response.
    pub fn details(&self) -> Map<String, Value> {
        let mut details = Map::new();
        match self {
            Self::Node(NodeError::Conflict(c)) => {
                details.insert("expected".into(), json!(c.expected));
                details.insert("actual".into(), json!(c.actual));
            }
            Self::Node(NodeError::ValidationRejected { issues }) => {
                details.insert("issues".into(), json!(issues));
            }
            Self::Node(NodeError::Patch { index, op, .. }) => {
                details.insert("operation".into(), json!(index));
                details.insert("op".into(), json!(op));
            }
            Self::Node(NodeError::AuditPending { id, version, .. }) => {
                details.insert("audit_pending".into(), json!(true));
                details.insert("id".into(), json!(id));
                details.insert("version".into(), json!(version));
            }
            _ => {}
        }
        details
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::Node(e.into())
    }
}

impl From<AuditError> for CliError {
    fn from(e: AuditError) -> Self {
        Self::Node(e.into())
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
