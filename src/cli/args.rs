//! CLI argument definitions using clap
//!
//! Commands:
//! - nodeforge init
//! - nodeforge create <id> --kind <kind> --title <title>
//! - nodeforge show | fingerprint | validate | history <id>
//! - nodeforge list [--kind <kind>]
//! - nodeforge set | append <id> <path> <value>
//! - nodeforge unset <id> <path>
//! - nodeforge apply | rewrite <id> --file <path>
//! - nodeforge delete <id>
//! - nodeforge reconcile

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// nodeforge - versioned, audited, path-patchable documents on plain files
#[derive(Parser, Debug)]
#[command(name = "nodeforge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Store root directory
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file (default: <root>/nodeforge.json if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Actor recorded in audit records
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Optimistic concurrency flags.
#[derive(Args, Debug, Clone, Default)]
pub struct GuardArgs {
    /// Fingerprint the document is expected to have
    #[arg(long, value_name = "FINGERPRINT")]
    pub expect: Option<String>,

    /// Proceed even if the fingerprint does not match
    #[arg(long)]
    pub force: bool,
}

/// Flags shared by commands that change document content.
#[derive(Args, Debug, Clone, Default)]
pub struct MutateArgs {
    #[command(flatten)]
    pub guard: GuardArgs,

    /// Run the whole pipeline but persist nothing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a store under --root
    Init,

    /// Create a new document at version 1
    Create {
        id: String,
        #[arg(long)]
        kind: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        summary: Option<String>,
        /// Tag to add; repeatable
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },

    /// Print a document and its fingerprint
    Show { id: String },

    /// List documents
    List {
        /// Only documents of this kind
        #[arg(long)]
        kind: Option<String>,
    },

    /// Print the content fingerprint of a document
    Fingerprint { id: String },

    /// Set the value at a path
    Set {
        id: String,
        path: String,
        value: String,
        #[command(flatten)]
        opts: MutateArgs,
    },

    /// Append a value to the array at a path
    Append {
        id: String,
        path: String,
        value: String,
        #[command(flatten)]
        opts: MutateArgs,
    },

    /// Clear the field or remove the element at a path
    Unset {
        id: String,
        path: String,
        #[command(flatten)]
        opts: MutateArgs,
    },

    /// Apply a JSON array of operations as one transaction
    Apply {
        id: String,
        #[arg(long, value_name = "BATCH_JSON")]
        file: PathBuf,
        #[command(flatten)]
        opts: MutateArgs,
    },

    /// Replace a whole document from a JSON file
    Rewrite {
        id: String,
        #[arg(long, value_name = "DOCUMENT_JSON")]
        file: PathBuf,
        #[command(flatten)]
        opts: MutateArgs,
    },

    /// Delete a document
    Delete {
        id: String,
        #[command(flatten)]
        guard: GuardArgs,
    },

    /// Show the audit trail of a document
    History {
        id: String,
        /// Only records at or after this RFC 3339 timestamp
        #[arg(long)]
        since: Option<String>,
        /// Only the most recent N records
        #[arg(long)]
        last: Option<usize>,
    },

    /// Run the validator gate against a stored document
    Validate { id: String },

    /// Append baseline audit records for unaudited documents
    Reconcile,
}
