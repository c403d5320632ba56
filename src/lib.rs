//! nodeforge - versioned, audited, path-patchable documents on plain files
//!
//! Every change to a document goes through one pipeline:
//! fingerprint guard, patch, validate, commit, audit. A failed step leaves
//! the stored document byte-identical to what it was before.

pub mod audit;
pub mod cli;
pub mod document;
pub mod error;
pub mod fingerprint;
pub mod guard;
pub mod observability;
pub mod patch;
pub mod pipeline;
pub mod reconcile;
pub mod store;
pub mod validator;

pub use error::{NodeError, NodeResult};
