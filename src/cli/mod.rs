//! CLI module for nodeforge
//!
//! Provides the command-line surface over the library:
//! - init: create the store layout under --root
//! - create / show / list / fingerprint: document access
//! - set / append / unset / apply / rewrite / delete: guarded mutation
//! - history / validate / reconcile: audit and consistency

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command, GuardArgs, MutateArgs};
pub use commands::{init, run, run_command};
pub use config::{resolve_actor, Config, RunContext, CONFIG_FILE};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{error_envelope, ok_envelope, read_input, write_error, write_response};
