//! Append-only audit trail
//!
//! Every committed mutation appends exactly one record carrying the
//! post-mutation fingerprint and version plus before/after snapshots of
//! the touched fields. The trail is the recovery source for the last known
//! fingerprint of a document.
//!
//! # Invariants
//!
//! - Records are only ever appended
//! - A record is durable before `append` returns
//! - Each line is checksummed; corruption is reported, never skipped

mod errors;
mod log;
mod query;
mod record;

pub use errors::{AuditError, AuditResult};
pub use log::{AuditLog, FileAuditLog, MemoryAuditLog, DEFAULT_AUDIT_FILE};
pub use query::AuditQuery;
pub use record::{AuditOp, AuditRecord, Snapshot};
