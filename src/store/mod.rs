//! Document storage for nodeforge
//!
//! # Design Principles
//!
//! - One file per document, keyed by identifier
//! - Whole-document atomic replacement (temp file, fsync, rename)
//! - Declared identifier must equal the storage key
//! - No locking; concurrent writers are out of scope

mod errors;
mod store;

pub use errors::{StoreError, StoreResult};
pub use store::{validate_id, DocumentStore, NODES_DIR};
