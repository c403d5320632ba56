//! Structured logging on top of `tracing`
//!
//! - Logs go to stderr; stdout carries command output only
//! - One log line per event
//! - Extra fields are rendered in sorted key order

use std::env;
use std::fmt::Write as _;

use tracing::Level;
use tracing_subscriber::EnvFilter;

use super::events::Event;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "NODEFORGE_LOG";

const DEFAULT_FILTER: &str = "warn";
const VERBOSE_FILTER: &str = "debug";

/// Installs the global subscriber. Safe to call more than once; only the
/// first call has an effect.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        env::var(LOG_ENV)
            .ok()
            .and_then(|directive| EnvFilter::try_new(directive).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Emits a named event at its configured level.
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let details = render_fields(fields);
    let name = event.as_str();
    let level = event.level();
    if level == Level::ERROR {
        tracing::error!(event = name, "{}", details);
    } else if level == Level::WARN {
        tracing::warn!(event = name, "{}", details);
    } else if level == Level::INFO {
        tracing::info!(event = name, "{}", details);
    } else if level == Level::DEBUG {
        tracing::debug!(event = name, "{}", details);
    } else {
        tracing::trace!(event = name, "{}", details);
    }
}

/// Renders `key=value` pairs sorted by key, quoting values with spaces.
pub fn render_fields(fields: &[(&str, &str)]) -> String {
    let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);

    let mut output = String::new();
    for (i, (key, value)) in sorted.into_iter().enumerate() {
        if i > 0 {
            output.push(' ');
        }
        if value.is_empty() || value.contains(char::is_whitespace) || value.contains('"') {
            let _ = write!(output, "{}={:?}", key, value);
        } else {
            let _ = write!(output, "{}={}", key, value);
        }
    }
    output
}
