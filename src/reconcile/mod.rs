//! Audit reconciliation
//!
//! Closes the window between "document persisted" and "audit record
//! appended". For every stored document whose current fingerprint appears
//! nowhere in its trail, one `baseline` record is appended.
//!
//! Reconciliation is idempotent: a second run appends nothing.

use serde::Serialize;

use crate::audit::{AuditLog, AuditOp, AuditRecord};
use crate::error::NodeResult;
use crate::fingerprint::{fingerprint, Fingerprint};
use crate::observability::{log_event, Event};
use crate::store::DocumentStore;

/// A document that received a baseline record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaselineEntry {
    pub id: String,
    pub version: u64,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Documents examined
    pub checked: usize,
    /// Documents whose fingerprint was already in the trail
    pub consistent: usize,
    pub baselined: Vec<BaselineEntry>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.baselined.is_empty()
    }
}

/// Appends a baseline record for every document missing from the trail.
pub fn reconcile(
    store: &DocumentStore,
    audit: &dyn AuditLog,
    actor: &str,
) -> NodeResult<ReconcileReport> {
    let records = audit.records()?;
    let mut report = ReconcileReport::default();

    for doc in store.load_all()? {
        report.checked += 1;
        let fp = fingerprint(&doc);
        let known = records
            .iter()
            .any(|r| r.node_id == doc.id && r.fingerprint == fp);
        if known {
            report.consistent += 1;
            continue;
        }

        let record = AuditRecord::new(&doc.id, AuditOp::Baseline, actor, fp.clone(), doc.version);
        audit.append(&record)?;
        log_event(
            Event::ReconcileBaseline,
            &[
                ("node", doc.id.as_str()),
                ("version", doc.version.to_string().as_str()),
                ("fingerprint", fp.as_str()),
            ],
        );
        report.baselined.push(BaselineEntry {
            id: doc.id,
            version: doc.version,
            fingerprint: fp,
        });
    }

    log_event(
        Event::ReconcileComplete,
        &[
            ("checked", report.checked.to_string().as_str()),
            ("baselined", report.baselined.len().to_string().as_str()),
        ],
    );
    Ok(report)
}
