//! Transactional apply pipeline
//!
//! Every mutating command runs as one transaction:
//!
//! 1. Load the document
//! 2. Guard: compare the caller's expected fingerprint
//! 3. Deep-copy and run every operation in order
//! 4. Bump the version once
//! 5. Validator gate
//! 6. Persist (atomic replace)
//! 7. Append one audit record
//!
//! Any failure before step 6 leaves the stored document byte-identical.
//! If step 7 fails after step 6, the document is committed without its audit
//! record and the caller gets [`NodeError::AuditPending`]; `reconcile`
//! closes that gap.

use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::snapshot::{capture, capture_all, diff_top_level, touched_keys};
use super::state::{PipelineState, Transaction};
use crate::audit::{AuditLog, AuditOp, AuditRecord, Snapshot};
use crate::document::Document;
use crate::error::{NodeError, NodeResult};
use crate::fingerprint::{fingerprint, Fingerprint};
use crate::guard::{ConflictGuard, GuardOutcome};
use crate::observability::{log_event, Event};
use crate::patch::{PatchExecutor, PatchOp};
use crate::store::{DocumentStore, StoreError};
use crate::validator::{KnownIds, Validator};

/// Per-command options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Fingerprint the caller last saw
    pub expected: Option<String>,
    /// Proceed on fingerprint mismatch
    pub force: bool,
    /// Stop after validation; persist nothing
    pub dry_run: bool,
    /// Audit kind override; defaults from the operations
    pub kind: Option<AuditOp>,
}

impl ApplyOptions {
    pub fn expecting(expected: impl Into<String>) -> Self {
        Self {
            expected: Some(expected.into()),
            ..Self::default()
        }
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Result of a successful (or dry-run) command.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutcome {
    pub id: String,
    pub state: PipelineState,
    pub op: AuditOp,
    pub version: u64,
    pub fingerprint: Fingerprint,
    /// Fingerprint before the command; absent for creates
    pub previous_fingerprint: Option<Fingerprint>,
    pub guard: GuardOutcome,
    pub operations: usize,
    /// Audit record id; absent for dry runs
    pub audit_id: Option<Uuid>,
    pub document: Option<Document>,
}

impl ApplyOutcome {
    pub fn forced(&self) -> bool {
        self.guard.is_forced()
    }

    /// JSON payload for command output.
    pub fn to_json(&self) -> Value {
        let mut out = json!({
            "id": self.id,
            "state": self.state,
            "op": self.op,
            "version": self.version,
            "fingerprint": self.fingerprint,
            "operations": self.operations,
            "forced": self.forced(),
            "dry_run": self.state == PipelineState::DryRun,
        });
        if let Some(prev) = &self.previous_fingerprint {
            out["previous_fingerprint"] = json!(prev);
        }
        if let GuardOutcome::Overridden { expected, actual } = &self.guard {
            out["expected"] = json!(expected);
            out["actual"] = json!(actual);
        }
        if let Some(audit_id) = &self.audit_id {
            out["audit_id"] = json!(audit_id);
        }
        if let Some(doc) = &self.document {
            out["document"] = json!(doc);
        }
        out
    }
}

/// The mutation pipeline over a store, an audit trail and a validator gate.
pub struct ApplyPipeline<'a> {
    store: &'a DocumentStore,
    audit: &'a dyn AuditLog,
    validator: &'a dyn Validator,
    actor: String,
    executor: PatchExecutor<'static>,
}

impl<'a> ApplyPipeline<'a> {
    pub fn new(
        store: &'a DocumentStore,
        audit: &'a dyn AuditLog,
        validator: &'a dyn Validator,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            store,
            audit,
            validator,
            actor: actor.into(),
            executor: PatchExecutor::for_documents(),
        }
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Applies a batch of operations as one transaction.
    pub fn apply(&self, id: &str, ops: &[PatchOp], options: &ApplyOptions) -> NodeResult<ApplyOutcome> {
        if ops.is_empty() {
            return Err(NodeError::invalid_request("no operations to apply"));
        }

        let original = self.store.load(id)?;
        log_event(
            Event::PipelineLoaded,
            &[("node", id), ("operations", ops.len().to_string().as_str())],
        );
        let guard = self.guard(&original, options)?;
        let previous = fingerprint(&original);

        let mut txn = Transaction::begin(original)?;
        if let Err(e) = txn.apply_all(&self.executor, ops) {
            log_event(
                Event::PipelineRolledBack,
                &[("node", id), ("error", e.to_string().as_str())],
            );
            return Err(e);
        }
        let candidate = txn.candidate()?;
        self.gate(&mut txn, &candidate)?;

        let op = options.kind.unwrap_or_else(|| default_kind(ops));
        let keys = touched_keys(ops, self.executor.registry());
        let before = capture(txn.original_value(), &keys);

        if options.dry_run {
            txn.stop_dry_run()?;
            return Ok(self.dry_run_outcome(candidate, op, guard, previous, ops.len()));
        }

        let after_value = candidate
            .to_value()
            .map_err(|e| NodeError::invalid_request(e.to_string()))?;
        let after = capture(&after_value, &keys);

        self.commit(&mut txn, candidate, op, guard, Some(previous), ops.len(), before, after)
    }

    /// Stores a new document at version 1.
    pub fn create(&self, mut doc: Document) -> NodeResult<ApplyOutcome> {
        if self.store.exists(&doc.id)? {
            return Err(StoreError::AlreadyExists(doc.id.clone()).into());
        }
        doc.version = 1;

        let issues = self.validator.validate(&doc, &self.known_ids(&doc.id)?);
        if !issues.is_empty() {
            log_event(Event::PipelineRejected, &[("node", doc.id.as_str())]);
            return Err(NodeError::ValidationRejected { issues });
        }

        let after = capture_all(
            &doc.to_value()
                .map_err(|e| NodeError::invalid_request(e.to_string()))?,
        );
        self.store.insert(&doc)?;
        let fp = fingerprint(&doc);
        let record = AuditRecord::new(&doc.id, AuditOp::Create, &self.actor, fp.clone(), doc.version)
            .with_after(after);
        let audit_id = self.append_audit(&record, &doc.id, doc.version)?;

        log_event(
            Event::PipelineCommitted,
            &[("node", doc.id.as_str()), ("op", "create"), ("version", "1")],
        );
        Ok(ApplyOutcome {
            id: doc.id.clone(),
            state: PipelineState::Committed,
            op: AuditOp::Create,
            version: doc.version,
            fingerprint: fp,
            previous_fingerprint: None,
            guard: GuardOutcome::Unchecked,
            operations: 0,
            audit_id: Some(audit_id),
            document: Some(doc),
        })
    }

    /// Replaces a whole document. The identifier must match; the version
    /// becomes current + 1 regardless of what the replacement carries.
    pub fn rewrite(&self, id: &str, replacement: Document, options: &ApplyOptions) -> NodeResult<ApplyOutcome> {
        if replacement.id != id {
            return Err(NodeError::invalid_request(format!(
                "replacement declares identifier '{}', expected '{}'",
                replacement.id, id
            )));
        }

        let original = self.store.load(id)?;
        let guard = self.guard(&original, options)?;
        let previous = fingerprint(&original);

        let mut txn = Transaction::begin(original)?;
        let candidate = txn.replace(replacement)?;
        self.gate(&mut txn, &candidate)?;

        let op = options.kind.unwrap_or(AuditOp::Rewrite);
        if options.dry_run {
            txn.stop_dry_run()?;
            return Ok(self.dry_run_outcome(candidate, op, guard, previous, 0));
        }

        let after_value = candidate
            .to_value()
            .map_err(|e| NodeError::invalid_request(e.to_string()))?;
        let (before, after) = diff_top_level(txn.original_value(), &after_value);

        self.commit(&mut txn, candidate, op, guard, Some(previous), 0, before, after)
    }

    /// Removes a document. The audit record keeps its full last state.
    pub fn delete(&self, id: &str, options: &ApplyOptions) -> NodeResult<ApplyOutcome> {
        let doc = self.store.load(id)?;
        let guard = self.guard(&doc, options)?;
        let fp = fingerprint(&doc);

        let before = capture_all(
            &doc.to_value()
                .map_err(|e| NodeError::invalid_request(e.to_string()))?,
        );
        self.store.delete(id)?;

        let record = AuditRecord::new(id, AuditOp::Delete, &self.actor, fp.clone(), doc.version)
            .with_before(before);
        let audit_id = self.append_audit(&record, id, doc.version)?;

        log_event(
            Event::PipelineCommitted,
            &[("node", id), ("op", "delete"), ("version", doc.version.to_string().as_str())],
        );
        Ok(ApplyOutcome {
            id: id.to_string(),
            state: PipelineState::Committed,
            op: AuditOp::Delete,
            version: doc.version,
            fingerprint: fp.clone(),
            previous_fingerprint: Some(fp),
            guard,
            operations: 0,
            audit_id: Some(audit_id),
            document: None,
        })
    }

    fn guard(&self, doc: &Document, options: &ApplyOptions) -> NodeResult<GuardOutcome> {
        let outcome = ConflictGuard::check(doc, options.expected.as_deref(), options.force)?;
        if let GuardOutcome::Overridden { expected, actual } = &outcome {
            log_event(
                Event::GuardOverridden,
                &[("node", doc.id.as_str()), ("expected", expected.as_str()), ("actual", actual.as_str())],
            );
        }
        Ok(outcome)
    }

    fn known_ids(&self, id: &str) -> NodeResult<KnownIds> {
        let mut known = KnownIds::from_store(self.store)?;
        known.insert(id);
        Ok(known)
    }

    // Validator gate: any issue rejects the whole transaction.
    fn gate(&self, txn: &mut Transaction, candidate: &Document) -> NodeResult<()> {
        let issues = self.validator.validate(candidate, &self.known_ids(&candidate.id)?);
        if issues.is_empty() {
            return Ok(());
        }
        txn.reject()?;
        log_event(
            Event::PipelineRejected,
            &[("node", candidate.id.as_str()), ("issues", issues.len().to_string().as_str())],
        );
        Err(NodeError::ValidationRejected { issues })
    }

    fn dry_run_outcome(
        &self,
        candidate: Document,
        op: AuditOp,
        guard: GuardOutcome,
        previous: Fingerprint,
        operations: usize,
    ) -> ApplyOutcome {
        log_event(Event::PipelineDryRun, &[("node", candidate.id.as_str())]);
        ApplyOutcome {
            id: candidate.id.clone(),
            state: PipelineState::DryRun,
            op,
            version: candidate.version,
            fingerprint: fingerprint(&candidate),
            previous_fingerprint: Some(previous),
            guard,
            operations,
            audit_id: None,
            document: Some(candidate),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn commit(
        &self,
        txn: &mut Transaction,
        candidate: Document,
        op: AuditOp,
        guard: GuardOutcome,
        previous: Option<Fingerprint>,
        operations: usize,
        before: Snapshot,
        after: Snapshot,
    ) -> NodeResult<ApplyOutcome> {
        self.store.save(&candidate)?;
        txn.commit()?;

        let fp = fingerprint(&candidate);
        let record = AuditRecord::new(&candidate.id, op, &self.actor, fp.clone(), candidate.version)
            .with_before(before)
            .with_after(after);
        let audit_id = self.append_audit(&record, &candidate.id, candidate.version)?;

        log_event(
            Event::PipelineCommitted,
            &[
                ("node", candidate.id.as_str()),
                ("op", op.as_str()),
                ("version", candidate.version.to_string().as_str()),
                ("fingerprint", fp.as_str()),
            ],
        );
        Ok(ApplyOutcome {
            id: candidate.id.clone(),
            state: PipelineState::Committed,
            op,
            version: candidate.version,
            fingerprint: fp,
            previous_fingerprint: previous,
            guard,
            operations,
            audit_id: Some(audit_id),
            document: Some(candidate),
        })
    }

    fn append_audit(&self, record: &AuditRecord, id: &str, version: u64) -> NodeResult<Uuid> {
        match self.audit.append(record) {
            Ok(()) => Ok(record.id),
            Err(source) => {
                log_event(
                    Event::AuditPending,
                    &[("node", id), ("version", version.to_string().as_str()), ("error", source.to_string().as_str())],
                );
                Err(NodeError::AuditPending {
                    id: id.to_string(),
                    version,
                    source,
                })
            }
        }
    }
}

/// Audit kind for a batch: the operation's own kind when there is exactly
/// one, `update` otherwise.
pub fn default_kind(ops: &[PatchOp]) -> AuditOp {
    match ops {
        [single] => single.kind().into(),
        _ => AuditOp::Update,
    }
}
