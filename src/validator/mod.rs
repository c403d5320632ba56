//! Validator gate
//!
//! Runs on the post-patch document before anything is persisted. Any issue
//! rejects the whole transaction; the stored document is left untouched.
//!
//! Validation is deterministic and never mutates the document.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::document::Document;
use crate::store::{DocumentStore, StoreResult};

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Canonical field name the issue is about
    pub field: String,
    /// Stable machine-readable rule name
    pub rule: &'static str,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.field, self.message, self.rule)
    }
}

/// Identifiers that references may resolve to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownIds(BTreeSet<String>);

impl KnownIds {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }

    /// Every identifier currently in the store.
    pub fn from_store(store: &DocumentStore) -> StoreResult<Self> {
        Ok(Self::new(store.list()?))
    }

    pub fn insert(&mut self, id: impl Into<String>) {
        self.0.insert(id.into());
    }

    pub fn remove(&mut self, id: &str) {
        self.0.remove(id);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }
}

/// A validation gate. An empty result means the document is accepted.
pub trait Validator: Send + Sync {
    fn validate(&self, doc: &Document, known: &KnownIds) -> Vec<ValidationIssue>;
}

/// Structural rules every document must satisfy.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl Validator for StructuralValidator {
    fn validate(&self, doc: &Document, known: &KnownIds) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for field in doc.missing_required() {
            if field == "version" {
                continue;
            }
            issues.push(ValidationIssue::new(field, "required", "must not be empty"));
        }

        if doc.version < 1 {
            issues.push(ValidationIssue::new(
                "version",
                "version",
                format!("must be at least 1, found {}", doc.version),
            ));
        }

        let mut seen = BTreeSet::new();
        for (i, tag) in doc.tags.iter().enumerate() {
            if tag.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    format!("tags[{}]", i),
                    "blank_tag",
                    "tag must not be blank",
                ));
            } else if !seen.insert(tag.as_str()) {
                issues.push(ValidationIssue::new(
                    format!("tags[{}]", i),
                    "duplicate_tag",
                    format!("duplicate tag '{}'", tag),
                ));
            }
        }

        for (field, targets) in [
            ("refs.uses", &doc.refs.uses),
            ("refs.depends_on", &doc.refs.depends_on),
            ("refs.implements", &doc.refs.implements),
            ("refs.related", &doc.refs.related),
        ] {
            for target in targets {
                if target == &doc.id {
                    issues.push(ValidationIssue::new(
                        field,
                        "self_reference",
                        "document references itself",
                    ));
                } else if !known.contains(target) {
                    issues.push(ValidationIssue::new(
                        field,
                        "dangling_reference",
                        format!("unknown document '{}'", target),
                    ));
                }
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> KnownIds {
        KnownIds::new(["sword-001", "iron", "smithing"])
    }

    fn sword() -> Document {
        Document::new("sword-001", "item", "Iron Sword").with_tags(["weapon"])
    }

    fn rules(issues: &[ValidationIssue]) -> Vec<&'static str> {
        issues.iter().map(|i| i.rule).collect()
    }

    #[test]
    fn test_valid_document_has_no_issues() {
        let mut doc = sword();
        doc.refs.uses = vec!["iron".into()];
        doc.refs.depends_on = vec!["smithing".into()];
        assert!(StructuralValidator.validate(&doc, &known()).is_empty());
    }

    #[test]
    fn test_blank_title_and_kind() {
        let mut doc = sword();
        doc.title = "".into();
        doc.kind = " ".into();
        let issues = StructuralValidator.validate(&doc, &known());
        assert_eq!(rules(&issues), vec!["required", "required"]);
        assert_eq!(issues[0].field, "kind");
        assert_eq!(issues[1].field, "title");
    }

    #[test]
    fn test_version_zero() {
        let mut doc = sword();
        doc.version = 0;
        assert_eq!(rules(&StructuralValidator.validate(&doc, &known())), vec!["version"]);
    }

    #[test]
    fn test_blank_and_duplicate_tags() {
        let doc = sword().with_tags(["weapon", "", "weapon"]);
        let issues = StructuralValidator.validate(&doc, &known());
        assert_eq!(rules(&issues), vec!["blank_tag", "duplicate_tag"]);
        assert_eq!(issues[1].field, "tags[2]");
    }

    #[test]
    fn test_self_and_dangling_references() {
        let mut doc = sword();
        doc.refs.related = vec!["sword-001".into(), "ghost".into()];
        let issues = StructuralValidator.validate(&doc, &known());
        assert_eq!(rules(&issues), vec!["self_reference", "dangling_reference"]);
        assert!(issues[1].message.contains("ghost"));
    }
}
