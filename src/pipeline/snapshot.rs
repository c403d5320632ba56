//! Before/after capture for audit records
//!
//! Snapshots hold only the touched fields, keyed by canonical field name
//! (`tags`, `refs.uses`, `custom.rarity`). A field absent on one side is
//! recorded as `null`.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::audit::Snapshot;
use crate::document::FieldRegistry;
use crate::patch::{PatchOp, PatchPath};

/// Field keys touched by a batch of operations.
pub fn touched_keys(ops: &[PatchOp], registry: &FieldRegistry) -> BTreeSet<String> {
    ops.iter()
        .filter_map(|op| PatchPath::parse(op.path()).ok())
        .map(|path| path.field_key(registry))
        .collect()
}

/// Values of `keys` in a document's JSON view.
pub fn capture(doc: &Value, keys: &BTreeSet<String>) -> Snapshot {
    keys.iter()
        .map(|key| (key.clone(), lookup(doc, key).cloned().unwrap_or(Value::Null)))
        .collect()
}

/// Every top-level field of a document.
pub fn capture_all(doc: &Value) -> Snapshot {
    match doc {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        _ => Snapshot::new(),
    }
}

/// Top-level fields whose values differ, as (before, after).
pub fn diff_top_level(before: &Value, after: &Value) -> (Snapshot, Snapshot) {
    let mut keys = BTreeSet::new();
    for doc in [before, after] {
        if let Value::Object(map) = doc {
            keys.extend(map.keys().cloned());
        }
    }
    keys.retain(|k| before.get(k) != after.get(k));
    (capture(before, &keys), capture(after, &keys))
}

fn lookup<'v>(doc: &'v Value, key: &str) -> Option<&'v Value> {
    key.split('.').try_fold(doc, |current, name| current.get(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_touched_keys_use_field_portion() {
        let registry = FieldRegistry::document();
        let ops = [
            PatchOp::set("Tags[0]", "x"),
            PatchOp::append("refs.USES", "iron"),
            PatchOp::set("custom.rarity", "rare"),
            PatchOp::set("content.sections[1].heading", "Lore"),
        ];
        let keys: Vec<String> = touched_keys(&ops, registry).into_iter().collect();
        assert_eq!(
            keys,
            vec!["content.sections", "custom.rarity", "refs.uses", "tags"]
        );
    }

    #[test]
    fn test_capture_missing_is_null() {
        let doc = json!({"tags": ["a"], "custom": {}});
        let keys = BTreeSet::from(["tags".to_string(), "custom.rarity".to_string()]);
        let snap = capture(&doc, &keys);
        assert_eq!(snap["tags"], json!(["a"]));
        assert_eq!(snap["custom.rarity"], Value::Null);
    }

    #[test]
    fn test_diff_reports_only_changed_fields() {
        let before = json!({"title": "A", "tags": ["x"], "version": 1});
        let after = json!({"title": "A", "tags": ["x", "y"], "version": 2});
        let (b, a) = diff_top_level(&before, &after);
        assert_eq!(b.keys().collect::<Vec<_>>(), vec!["tags", "version"]);
        assert_eq!(a["tags"], json!(["x", "y"]));
    }
}
