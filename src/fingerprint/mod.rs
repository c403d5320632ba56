//! Content fingerprinting
//!
//! A fingerprint is a short, fixed-length digest of the content-relevant
//! fields of a document: title, summary, tags, refs, issues, content,
//! constraints and custom fields. Version, status and reviewers are
//! lifecycle metadata and are excluded, so a status transition or
//! re-approval never looks like a content change.
//!
//! # Determinism
//!
//! Fields are hashed in a fixed order, each as canonical JSON with object
//! keys sorted. The digest is SHA-256, rendered as the first
//! [`FINGERPRINT_LEN`] lowercase hex characters.

mod canonical;

pub use canonical::canonical_json;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::document::Document;

/// Length of a rendered fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 16;

/// Content fields in hashing order.
pub const CONTENT_FIELDS: [&str; 8] = [
    "title",
    "summary",
    "tags",
    "refs",
    "issues",
    "content",
    "constraints",
    "custom",
];

/// A rendered content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `candidate` names this fingerprint, ignoring surrounding
    /// whitespace and ASCII case.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.eq_ignore_ascii_case(candidate.trim())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Computes the content fingerprint of a document.
pub fn fingerprint(doc: &Document) -> Fingerprint {
    let content: [(&str, Value); 8] = [
        ("title", Value::String(doc.title.clone())),
        ("summary", Value::String(doc.summary.clone())),
        ("tags", to_value(&doc.tags)),
        ("refs", to_value(&doc.refs)),
        ("issues", to_value(&doc.issues)),
        ("content", to_value(&doc.content)),
        ("constraints", to_value(&doc.constraints)),
        ("custom", to_value(&doc.custom)),
    ];
    debug_assert!(content.iter().map(|(k, _)| *k).eq(CONTENT_FIELDS));

    let mut hasher = Sha256::new();
    for (name, value) in &content {
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(canonical_json(value).as_bytes());
        hasher.update(b"\n");
    }
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(FINGERPRINT_LEN);
    Fingerprint(hex)
}

// Plain data types; serialization into a Value does not fail.
fn to_value<T: Serialize>(data: &T) -> Value {
    serde_json::to_value(data).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Status;
    use serde_json::json;

    fn sword() -> Document {
        let mut doc = Document::new("sword-001", "item", "Iron Sword").with_tags(["weapon", "combat"]);
        doc.summary = "A plain sword".into();
        doc.refs.uses = vec!["iron".into()];
        doc
    }

    #[test]
    fn test_fixed_length_hex() {
        let fp = fingerprint(&sword());
        assert_eq!(fp.as_str().len(), FINGERPRINT_LEN);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(fingerprint(&sword()), fingerprint(&sword()));
    }

    #[test]
    fn test_ignores_lifecycle_metadata() {
        let base = fingerprint(&sword());
        let mut doc = sword();
        doc.version = 7;
        doc.status = Status::Approved;
        doc.reviewers = vec!["alice".into()];
        assert_eq!(fingerprint(&doc), base);
    }

    #[test]
    fn test_every_content_field_changes_fingerprint() {
        let base = fingerprint(&sword());
        let edits: Vec<Box<dyn Fn(&mut Document)>> = vec![
            Box::new(|d: &mut Document| d.title = "Steel Sword".into()),
            Box::new(|d: &mut Document| d.summary.push('!')),
            Box::new(|d: &mut Document| d.tags.push("legendary".into())),
            Box::new(|d: &mut Document| d.tags.reverse()),
            Box::new(|d: &mut Document| d.refs.related.push("shield".into())),
            Box::new(|d: &mut Document| d.issues.push("balance".into())),
            Box::new(|d: &mut Document| d.content.sections.push(json!({"heading": "Lore"}))),
            Box::new(|d: &mut Document| {
                d.content.glossary.insert("edge".into(), "sharp side".into());
            }),
            Box::new(|d: &mut Document| d.constraints.push("damage > 0".into())),
            Box::new(|d: &mut Document| {
                d.custom.insert("damage".into(), json!(12));
            }),
        ];
        for (i, edit) in edits.iter().enumerate() {
            let mut doc = sword();
            edit(&mut doc);
            assert_ne!(fingerprint(&doc), base, "edit {} did not change fingerprint", i);
        }
    }

    #[test]
    fn test_glossary_insertion_order_irrelevant() {
        let mut a = sword();
        a.content.glossary.insert("b".into(), "2".into());
        a.content.glossary.insert("a".into(), "1".into());
        let mut b = sword();
        b.content.glossary.insert("a".into(), "1".into());
        b.content.glossary.insert("b".into(), "2".into());
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_section_key_order_irrelevant() {
        let mut a = sword();
        a.content.sections = vec![serde_json::from_str(r#"{"x":1,"y":2}"#).unwrap()];
        let mut b = sword();
        b.content.sections = vec![serde_json::from_str(r#"{"y":2,"x":1}"#).unwrap()];
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_field_boundaries_matter() {
        let mut a = sword();
        a.title = "ab".into();
        a.summary = "c".into();
        let mut b = sword();
        b.title = "a".into();
        b.summary = "bc".into();
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_matches_ignores_case_and_whitespace() {
        let fp = fingerprint(&sword());
        assert!(fp.matches(&format!(" {} ", fp.as_str().to_uppercase())));
        assert!(!fp.matches("0000000000000000"));
    }
}
