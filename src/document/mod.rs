//! Document model for nodeforge
//!
//! # Design Principles
//!
//! - Identifier is immutable and equals the storage key
//! - Version starts at 1 and grows by exactly one per committed command
//! - Required fields (id, kind, version, status, title) are never empty
//! - Field access goes through an explicit registry, never by name guessing

mod registry;
mod types;

pub use registry::{FieldDef, FieldRegistry, FieldType};
pub use types::{Content, Document, References, Status};
