//! Reconciliation Tests
//!
//! Documents whose current fingerprint is missing from the audit trail
//! (hand edits, an audit append that failed after the write) get exactly
//! one baseline record. Running it again changes nothing.

use nodeforge::audit::{
    AuditError, AuditLog, AuditOp, AuditRecord, AuditResult, FileAuditLog, DEFAULT_AUDIT_FILE,
};
use nodeforge::document::Document;
use nodeforge::error::NodeError;
use nodeforge::patch::PatchOp;
use nodeforge::pipeline::{ApplyOptions, ApplyPipeline};
use nodeforge::reconcile::reconcile;
use nodeforge::store::DocumentStore;
use nodeforge::validator::StructuralValidator;
use std::io;
use tempfile::TempDir;

/// Audit trail whose disk is full.
struct FullDisk;

impl AuditLog for FullDisk {
    fn append(&self, _record: &AuditRecord) -> AuditResult<()> {
        Err(AuditError::io(
            "append audit.jsonl",
            io::Error::new(io::ErrorKind::Other, "no space left on device"),
        ))
    }

    fn records(&self) -> AuditResult<Vec<AuditRecord>> {
        Ok(Vec::new())
    }
}

fn setup() -> (TempDir, DocumentStore, FileAuditLog) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = DocumentStore::open(dir.path()).unwrap();
    let audit = FileAuditLog::open(dir.path().join(DEFAULT_AUDIT_FILE)).unwrap();
    (dir, store, audit)
}

/// A write whose audit append failed is picked up by reconcile.
#[test]
fn test_pending_audit_is_baselined() {
    let (_dir, store, audit) = setup();
    ApplyPipeline::new(&store, &audit, &StructuralValidator, "seed")
        .create(Document::new("sword-001", "item", "Iron Sword"))
        .unwrap();

    let err = ApplyPipeline::new(&store, &FullDisk, &StructuralValidator, "alice")
        .apply("sword-001", &[PatchOp::set("title", "Steel Sword")], &ApplyOptions::default())
        .unwrap_err();
    match &err {
        NodeError::AuditPending { version, .. } => assert_eq!(*version, 2),
        other => panic!("expected pending audit, got {other:?}"),
    }
    assert_eq!(store.load("sword-001").unwrap().title, "Steel Sword");

    let report = reconcile(&store, &audit, "ops").unwrap();
    assert_eq!(report.checked, 1);
    assert_eq!(report.baselined.len(), 1);
    assert_eq!(report.baselined[0].version, 2);

    let last = audit.records().unwrap().pop().unwrap();
    assert_eq!(last.op, AuditOp::Baseline);
    assert_eq!(last.actor, "ops");
}

/// Files dropped into the store by hand are baselined once.
#[test]
fn test_reconcile_is_idempotent() {
    let (_dir, store, audit) = setup();
    store.save(&Document::new("a", "item", "A")).unwrap();
    store.save(&Document::new("b", "item", "B")).unwrap();

    let first = reconcile(&store, &audit, "ops").unwrap();
    assert_eq!(first.baselined.len(), 2);
    assert!(!first.is_clean());

    let second = reconcile(&store, &audit, "ops").unwrap();
    assert!(second.is_clean());
    assert_eq!(second.consistent, 2);
    assert_eq!(audit.records().unwrap().len(), 2);
}

/// Documents committed through the pipeline are already consistent.
#[test]
fn test_pipeline_commits_need_no_baseline() {
    let (_dir, store, audit) = setup();
    let pipeline = ApplyPipeline::new(&store, &audit, &StructuralValidator, "seed");
    pipeline.create(Document::new("a", "item", "A")).unwrap();
    pipeline
        .apply("a", &[PatchOp::append("tags", "x")], &ApplyOptions::default())
        .unwrap();

    let report = reconcile(&store, &audit, "ops").unwrap();
    assert!(report.is_clean());
    assert_eq!(report.checked, 1);
}
