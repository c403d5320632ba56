//! Observability for nodeforge
//!
//! # Principles
//!
//! 1. Observability is read-only; it never changes an outcome
//! 2. Logs go to stderr so stdout stays machine-readable
//! 3. Event names are typed and stable

mod events;
mod logger;

pub use events::Event;
pub use logger::{init_logging, log_event, render_fields, LOG_ENV};
