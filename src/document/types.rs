//! Document type definitions
//!
//! A document ("node") is the unit of storage. Supported field shapes:
//! - scalar identity and lifecycle fields (id, kind, version, status, title)
//! - free text (summary)
//! - ordered string lists (tags, issues, constraints, reviewers)
//! - typed reference lists (refs)
//! - structured content (opaque sections + glossary)
//! - an open-ended custom field map

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a document.
///
/// Status is lifecycle metadata: it is excluded from the content fingerprint
/// and the mutation core never changes it on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    Review,
    Approved,
    Deprecated,
    Archived,
}

impl Status {
    /// All statuses in lifecycle order.
    pub const ALL: [Status; 5] = [
        Status::Draft,
        Status::Review,
        Status::Approved,
        Status::Deprecated,
        Status::Archived,
    ];

    /// Returns the wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Draft => "draft",
            Status::Review => "review",
            Status::Approved => "approved",
            Status::Deprecated => "deprecated",
            Status::Archived => "archived",
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Draft
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Status::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown status '{}'", s))
    }
}

/// Typed outgoing links to other documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct References {
    /// Documents this one makes use of
    pub uses: Vec<String>,
    /// Documents that must exist before this one makes sense
    pub depends_on: Vec<String>,
    /// Contracts or interfaces this document implements
    pub implements: Vec<String>,
    /// Loosely related documents
    pub related: Vec<String>,
}

impl References {
    /// Iterates over every referenced identifier, in field order.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.uses
            .iter()
            .chain(self.depends_on.iter())
            .chain(self.implements.iter())
            .chain(self.related.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Structured content. Sections are opaque to the mutation core beyond
/// being deep-copyable JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Content {
    /// Ordered content sections, each a JSON object of typed blocks
    pub sections: Vec<Value>,
    /// Term -> definition. Kept in a BTreeMap so iteration order is stable.
    pub glossary: BTreeMap<String, String>,
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    /// Identifier; equals the storage key and never changes
    pub id: String,
    /// Kind tag (e.g. "item", "system", "mechanic")
    pub kind: String,
    /// Monotonic version, starts at 1
    pub version: u64,
    /// Lifecycle status
    #[serde(default)]
    pub status: Status,
    /// Required, non-empty title
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub refs: References,
    #[serde(default)]
    pub content: Content,
    /// Open issues, free text
    #[serde(default)]
    pub issues: Vec<String>,
    /// Constraint expressions, evaluated by the external validator
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Reviewer identities; lifecycle metadata
    #[serde(default)]
    pub reviewers: Vec<String>,
    #[serde(default)]
    pub custom: BTreeMap<String, Value>,
}

impl Document {
    /// Creates a version 1 draft with the required fields filled in.
    pub fn new(id: impl Into<String>, kind: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            version: 1,
            status: Status::Draft,
            title: title.into(),
            summary: String::new(),
            tags: Vec::new(),
            refs: References::default(),
            content: Content::default(),
            issues: Vec::new(),
            constraints: Vec::new(),
            reviewers: Vec::new(),
            custom: BTreeMap::new(),
        }
    }

    /// Builder: set summary
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Builder: set tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Names of required fields that are currently empty.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.id.trim().is_empty() {
            missing.push("id");
        }
        if self.kind.trim().is_empty() {
            missing.push("kind");
        }
        if self.version == 0 {
            missing.push("version");
        }
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        missing
    }

    pub fn required_fields_present(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// Every document this one links to, deduplicated.
    pub fn references(&self) -> BTreeSet<&str> {
        self.refs.iter().map(String::as_str).collect()
    }

    /// JSON view used by the patch engine.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Rebuilds a typed document from its JSON view.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_defaults() {
        let doc = Document::new("sword-001", "item", "Iron Sword");
        assert_eq!(doc.version, 1);
        assert_eq!(doc.status, Status::Draft);
        assert!(doc.missing_required().is_empty());
    }

    #[test]
    fn test_missing_required_reports_blank_title() {
        let mut doc = Document::new("sword-001", "item", "Iron Sword");
        doc.title = "   ".into();
        assert_eq!(doc.missing_required(), vec!["title"]);
        assert!(!doc.required_fields_present());
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("Approved".parse::<Status>().unwrap(), Status::Approved);
        assert!("finished".parse::<Status>().is_err());
    }

    #[test]
    fn test_minimal_json_fills_defaults() {
        let json = r#"{"id":"a","kind":"item","version":3,"title":"A"}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.version, 3);
        assert!(doc.tags.is_empty());
        assert_eq!(doc.status, Status::Draft);
    }

    #[test]
    fn test_unknown_top_level_field_rejected() {
        let json = r#"{"id":"a","kind":"item","version":1,"title":"A","colour":"red"}"#;
        assert!(serde_json::from_str::<Document>(json).is_err());
    }

    #[test]
    fn test_references_deduplicated() {
        let mut doc = Document::new("a", "item", "A");
        doc.refs.uses = vec!["b".into(), "c".into()];
        doc.refs.related = vec!["b".into()];
        let refs: Vec<_> = doc.references().into_iter().collect();
        assert_eq!(refs, vec!["b", "c"]);
    }

    #[test]
    fn test_value_round_trip_preserves_document() {
        let mut doc = Document::new("a", "item", "A").with_tags(["x", "y"]);
        doc.content.glossary.insert("hp".into(), "hit points".into());
        let back = Document::from_value(doc.to_value().unwrap()).unwrap();
        assert_eq!(back, doc);
    }
}
