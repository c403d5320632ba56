//! Configuration and per-invocation context
//!
//! Config file (JSON, optional):
//!
//! ```json
//! {
//!   "actor": "alice",
//!   "fingerprint_check": false,
//!   "audit_file": "audit.jsonl"
//! }
//! ```
//!
//! Looked up at `--config`, else `<root>/nodeforge.json`; absent means
//! defaults. Everything a command needs is resolved once into a
//! [`RunContext`] and passed down explicitly.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::args::Cli;
use super::errors::{CliError, CliResult};
use crate::audit::{FileAuditLog, DEFAULT_AUDIT_FILE};
use crate::observability::{log_event, Event};
use crate::store::{DocumentStore, NODES_DIR};

/// Config file name looked up under the store root
pub const CONFIG_FILE: &str = "nodeforge.json";

const UNKNOWN_ACTOR: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Default actor for audit records
    #[serde(default)]
    pub actor: Option<String>,

    /// Require `--expect` (or `--force`) on every command that changes an
    /// existing document
    #[serde(default)]
    pub fingerprint_check: bool,

    /// Audit trail file name under the store root
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_audit_file() -> String {
    DEFAULT_AUDIT_FILE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            actor: None,
            fingerprint_check: false,
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("failed to read config {}: {}", path.display(), e))
        })?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Explicit path must exist; the default location is optional.
    pub fn resolve(explicit: Option<&Path>, root: &Path) -> CliResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default_path = root.join(CONFIG_FILE);
        if default_path.is_file() {
            Self::load(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> CliResult<()> {
        if let Some(actor) = &self.actor {
            if actor.trim().is_empty() {
                return Err(CliError::config_error("actor must not be empty"));
            }
        }

        let name = self.audit_file.as_str();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(CliError::config_error(format!(
                "invalid audit_file '{}': must be a plain file name",
                self.audit_file
            )));
        }
        if name == NODES_DIR || name == CONFIG_FILE {
            return Err(CliError::config_error(format!(
                "audit_file '{}' collides with a reserved name",
                self.audit_file
            )));
        }
        Ok(())
    }
}

/// Everything one command invocation needs.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: Config,
    pub root: PathBuf,
    pub actor: String,
}

impl RunContext {
    pub fn from_cli(cli: &Cli) -> CliResult<Self> {
        let config = Config::resolve(cli.config.as_deref(), &cli.root)?;
        let actor = resolve_actor(
            cli.actor.as_deref(),
            config.actor.as_deref(),
            env::var("USER").ok().as_deref(),
        );
        log_event(
            Event::ConfigLoaded,
            &[
                ("root", cli.root.display().to_string().as_str()),
                ("actor", actor.as_str()),
            ],
        );
        Ok(Self {
            config,
            root: cli.root.clone(),
            actor,
        })
    }

    pub fn nodes_dir(&self) -> PathBuf {
        self.root.join(NODES_DIR)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.root.join(&self.config.audit_file)
    }

    pub fn is_initialized(&self) -> bool {
        self.nodes_dir().is_dir()
    }

    /// Opens the store and the audit trail of an initialized root.
    pub fn open(&self) -> CliResult<(DocumentStore, FileAuditLog)> {
        if !self.is_initialized() {
            return Err(CliError::not_initialized());
        }
        let store = DocumentStore::open(&self.root)?;
        let audit = FileAuditLog::open(self.audit_path())?;
        Ok((store, audit))
    }
}

/// `--actor`, then config, then `$USER`, then "unknown". Blank values are
/// skipped.
pub fn resolve_actor(flag: Option<&str>, config: Option<&str>, user: Option<&str>) -> String {
    [flag, config, user]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_ACTOR)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_actor_precedence() {
        assert_eq!(resolve_actor(Some("flag"), Some("cfg"), Some("user")), "flag");
        assert_eq!(resolve_actor(None, Some("cfg"), Some("user")), "cfg");
        assert_eq!(resolve_actor(Some("  "), None, Some("user")), "user");
        assert_eq!(resolve_actor(None, None, None), "unknown");
    }

    #[test]
    fn test_missing_default_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::resolve(None, dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.audit_file, "audit.jsonl");
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(Config::resolve(Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn test_loads_root_config() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"actor": "alice", "fingerprint_check": true}"#,
        )
        .unwrap();
        let config = Config::resolve(None, dir.path()).unwrap();
        assert_eq!(config.actor.as_deref(), Some("alice"));
        assert!(config.fingerprint_check);
        assert_eq!(config.audit_file, "audit.jsonl");
    }

    #[test]
    fn test_rejects_bad_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.json");
        for body in [
            r#"{"audit_file": "../escape.jsonl"}"#,
            r#"{"audit_file": "nodes"}"#,
            r#"{"actor": ""}"#,
            r#"{"unknown_key": 1}"#,
        ] {
            fs::write(&path, body).unwrap();
            assert!(Config::load(&path).is_err(), "accepted {}", body);
        }
    }
}
