//! Transactional apply pipeline
//!
//! # Invariants
//!
//! - All operations of a command succeed or none are persisted
//! - The version increases by exactly one per committed command
//! - A rejected or rolled-back transaction leaves the stored file untouched
//! - One committed command produces one audit record

mod apply;
mod snapshot;
mod state;

pub use apply::{default_kind, ApplyOptions, ApplyOutcome, ApplyPipeline};
pub use snapshot::{capture, capture_all, diff_top_level, touched_keys};
pub use state::{PipelineState, Transaction, TransitionError};
