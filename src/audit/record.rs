//! Audit record and its line encoding
//!
//! Each record is one JSON object on one line. The `checksum` field is the
//! CRC32 of the canonical JSON of every other field, so a torn or edited
//! line is detected on read.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::errors::{AuditError, AuditResult};
use crate::fingerprint::{canonical_json, Fingerprint};
use crate::patch::OpKind;

/// Touched fields keyed by canonical field name.
pub type Snapshot = BTreeMap<String, Value>;

const CHECKSUM_FIELD: &str = "checksum";

/// Kind of mutation a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOp {
    Create,
    /// Multi-operation batch
    Update,
    Set,
    Append,
    Unset,
    Move,
    Delete,
    /// Whole-document replacement
    Rewrite,
    Sync,
    /// Fingerprint recorded by reconciliation, no content change
    Baseline,
}

impl AuditOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOp::Create => "create",
            AuditOp::Update => "update",
            AuditOp::Set => "set",
            AuditOp::Append => "append",
            AuditOp::Unset => "unset",
            AuditOp::Move => "move",
            AuditOp::Delete => "delete",
            AuditOp::Rewrite => "rewrite",
            AuditOp::Sync => "sync",
            AuditOp::Baseline => "baseline",
        }
    }
}

impl From<OpKind> for AuditOp {
    fn from(kind: OpKind) -> Self {
        match kind {
            OpKind::Set => AuditOp::Set,
            OpKind::Append => AuditOp::Append,
            OpKind::Unset => AuditOp::Unset,
        }
    }
}

impl fmt::Display for AuditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditRecord {
    pub id: Uuid,
    /// Serialized as RFC 3339, UTC
    pub timestamp: DateTime<Utc>,
    pub node_id: String,
    pub op: AuditOp,
    pub actor: String,
    /// Content fingerprint after the mutation
    pub fingerprint: Fingerprint,
    /// Document version after the mutation
    pub version: u64,
    #[serde(default)]
    pub before: Snapshot,
    #[serde(default)]
    pub after: Snapshot,
    /// CRC32 over the other fields; 0 until sealed
    #[serde(default)]
    pub checksum: u32,
}

impl AuditRecord {
    pub fn new(
        node_id: impl Into<String>,
        op: AuditOp,
        actor: impl Into<String>,
        fingerprint: Fingerprint,
        version: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            node_id: node_id.into(),
            op,
            actor: actor.into(),
            fingerprint,
            version,
            before: Snapshot::new(),
            after: Snapshot::new(),
            checksum: 0,
        }
    }

    pub fn with_before(mut self, before: Snapshot) -> Self {
        self.before = before;
        self
    }

    pub fn with_after(mut self, after: Snapshot) -> Self {
        self.after = after;
        self
    }

    /// Computes the checksum of the record body.
    pub fn compute_checksum(&self) -> AuditResult<u32> {
        let body = self.body()?;
        Ok(crc32fast::hash(canonical_json(&body).as_bytes()))
    }

    /// Returns the record with its checksum filled in.
    pub fn sealed(mut self) -> AuditResult<Self> {
        self.checksum = self.compute_checksum()?;
        Ok(self)
    }

    /// Encodes the record as a single sealed JSON line, without the newline.
    pub fn to_line(&self) -> AuditResult<String> {
        let checksum = self.compute_checksum()?;
        let mut body = self.body()?;
        if let Value::Object(map) = &mut body {
            map.insert(CHECKSUM_FIELD.to_string(), Value::from(checksum));
        }
        serde_json::to_string(&body).map_err(|e| AuditError::Encode(e.to_string()))
    }

    /// Decodes and verifies one line. `line_no` is 1-based, for error reports.
    pub fn from_line(line: &str, line_no: usize) -> AuditResult<Self> {
        let mut value: Value = serde_json::from_str(line)
            .map_err(|e| AuditError::corrupt(line_no, format!("invalid JSON: {}", e)))?;

        let stored = match &mut value {
            Value::Object(map) => map.remove(CHECKSUM_FIELD),
            _ => return Err(AuditError::corrupt(line_no, "record is not an object")),
        };
        let stored = stored
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| AuditError::corrupt(line_no, "missing checksum"))?;

        let computed = crc32fast::hash(canonical_json(&value).as_bytes());
        if computed != stored {
            return Err(AuditError::corrupt(
                line_no,
                format!("checksum mismatch: stored {:08x}, computed {:08x}", stored, computed),
            ));
        }

        let mut record: AuditRecord = serde_json::from_value(value)
            .map_err(|e| AuditError::corrupt(line_no, e.to_string()))?;
        record.checksum = stored;
        Ok(record)
    }

    // JSON view without the checksum field
    fn body(&self) -> AuditResult<Value> {
        let mut value =
            serde_json::to_value(self).map_err(|e| AuditError::Encode(e.to_string()))?;
        if let Value::Object(map) = &mut value {
            map.remove(CHECKSUM_FIELD);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::fingerprint::fingerprint;
    use serde_json::json;

    fn record() -> AuditRecord {
        let doc = Document::new("sword-001", "item", "Iron Sword");
        let mut after = Snapshot::new();
        after.insert("tags".into(), json!(["weapon", "legendary"]));
        AuditRecord::new("sword-001", AuditOp::Append, "alice", fingerprint(&doc), 4)
            .with_before(Snapshot::from([("tags".to_string(), json!(["weapon"]))]))
            .with_after(after)
    }

    #[test]
    fn test_line_is_single_line_with_checksum() {
        let line = record().to_line().unwrap();
        assert!(!line.contains('\n'));
        let value: Value = serde_json::from_str(&line).unwrap();
        assert!(value["checksum"].is_u64());
        assert_eq!(value["op"], "append");
        assert_eq!(value["node_id"], "sword-001");
    }

    #[test]
    fn test_line_decodes_to_sealed_record() {
        let original = record();
        let decoded = AuditRecord::from_line(&original.to_line().unwrap(), 1).unwrap();
        assert_eq!(decoded, original.sealed().unwrap());
    }

    #[test]
    fn test_edited_line_is_corrupt() {
        let line = record().to_line().unwrap().replace("alice", "mallory");
        let err = AuditRecord::from_line(&line, 7).unwrap_err();
        assert!(matches!(err, AuditError::Corrupt { line: 7, .. }));
    }

    #[test]
    fn test_torn_line_is_corrupt() {
        let line = record().to_line().unwrap();
        let torn = &line[..line.len() / 2];
        assert!(matches!(
            AuditRecord::from_line(torn, 2),
            Err(AuditError::Corrupt { line: 2, .. })
        ));
    }

    #[test]
    fn test_missing_checksum_is_corrupt() {
        let mut value: Value = serde_json::from_str(&record().to_line().unwrap()).unwrap();
        value.as_object_mut().unwrap().remove("checksum");
        let line = serde_json::to_string(&value).unwrap();
        assert!(AuditRecord::from_line(&line, 1).is_err());
    }

    #[test]
    fn test_op_kind_maps_to_audit_op() {
        assert_eq!(AuditOp::from(OpKind::Set), AuditOp::Set);
        assert_eq!(AuditOp::from(OpKind::Unset).as_str(), "unset");
    }
}
