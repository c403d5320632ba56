//! Optimistic conflict guard
//!
//! A caller that read a document may pass back the fingerprint it saw.
//! Before any patch operation runs, the guard compares it with the
//! fingerprint of the document as it is now:
//!
//! | expected | matches | force | outcome                |
//! |----------|---------|-------|------------------------|
//! | absent   | -       | -     | `Unchecked`            |
//! | given    | yes     | -     | `Matched`              |
//! | given    | no      | yes   | `Overridden`           |
//! | given    | no      | no    | `ConflictError`        |
//!
//! The guard only decides; callers report overrides.
//!
//! The check is not atomic with the later write. Two processes that both
//! pass the guard can still race; the later rename wins.

use serde::Serialize;
use thiserror::Error;

use crate::document::Document;
use crate::fingerprint::{fingerprint, Fingerprint};

/// Result of a successful guard check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "check", rename_all = "lowercase")]
pub enum GuardOutcome {
    /// No expected fingerprint was supplied
    Unchecked,
    Matched,
    /// Mismatch accepted because the caller forced it
    Overridden { expected: String, actual: Fingerprint },
}

impl GuardOutcome {
    pub fn is_forced(&self) -> bool {
        matches!(self, GuardOutcome::Overridden { .. })
    }
}

/// The document changed since the caller read it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("conflict on '{id}': expected fingerprint {expected}, found {actual}")]
pub struct ConflictError {
    pub id: String,
    pub expected: String,
    pub actual: Fingerprint,
}

/// Stateless fingerprint check.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictGuard;

impl ConflictGuard {
    pub fn check(
        doc: &Document,
        expected: Option<&str>,
        force: bool,
    ) -> Result<GuardOutcome, ConflictError> {
        let expected = match expected.map(str::trim) {
            None | Some("") => return Ok(GuardOutcome::Unchecked),
            Some(e) => e,
        };

        let actual = fingerprint(doc);
        if actual.matches(expected) {
            return Ok(GuardOutcome::Matched);
        }

        if force {
            return Ok(GuardOutcome::Overridden {
                expected: expected.to_string(),
                actual,
            });
        }

        Err(ConflictError {
            id: doc.id.clone(),
            expected: expected.to_string(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new("sword-001", "item", "Iron Sword")
    }

    #[test]
    fn test_absent_or_empty_expectation_is_unchecked() {
        assert_eq!(ConflictGuard::check(&doc(), None, false).unwrap(), GuardOutcome::Unchecked);
        assert_eq!(
            ConflictGuard::check(&doc(), Some("  "), false).unwrap(),
            GuardOutcome::Unchecked
        );
    }

    #[test]
    fn test_matching_fingerprint() {
        let fp = fingerprint(&doc());
        let outcome = ConflictGuard::check(&doc(), Some(fp.as_str()), false).unwrap();
        assert_eq!(outcome, GuardOutcome::Matched);
        assert!(!outcome.is_forced());
    }

    #[test]
    fn test_stale_fingerprint_conflicts() {
        let stale = fingerprint(&doc());
        let mut current = doc();
        current.title = "Steel Sword".into();

        let err = ConflictGuard::check(&current, Some(stale.as_str()), false).unwrap_err();
        assert_eq!(err.expected, stale.as_str());
        assert_eq!(err.actual, fingerprint(&current));
    }

    #[test]
    fn test_force_overrides_mismatch() {
        let outcome = ConflictGuard::check(&doc(), Some("deadbeefdeadbeef"), true).unwrap();
        assert!(outcome.is_forced());
        assert_eq!(
            outcome,
            GuardOutcome::Overridden {
                expected: "deadbeefdeadbeef".into(),
                actual: fingerprint(&doc()),
            }
        );
    }
}
