//! Observable events for nodeforge
//!
//! Event names are stable strings so log consumers can match on them.

use std::fmt;

use tracing::Level;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    ConfigLoaded,
    StoreInitialized,

    // Pipeline
    /// Document loaded, transaction begins
    PipelineLoaded,
    /// Fingerprint mismatch accepted because of --force
    GuardOverridden,
    /// Patch operation failed, working copy discarded
    PipelineRolledBack,
    /// Validator gate rejected the candidate
    PipelineRejected,
    /// Dry run stopped before commit
    PipelineDryRun,
    /// Candidate persisted and audited
    PipelineCommitted,

    // Audit
    /// Document persisted but its audit record was not written
    AuditPending,
    ReconcileBaseline,
    ReconcileComplete,

    // Command
    CommandFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::StoreInitialized => "STORE_INITIALIZED",
            Event::PipelineLoaded => "PIPELINE_LOADED",
            Event::GuardOverridden => "GUARD_OVERRIDDEN",
            Event::PipelineRolledBack => "PIPELINE_ROLLED_BACK",
            Event::PipelineRejected => "PIPELINE_REJECTED",
            Event::PipelineDryRun => "PIPELINE_DRY_RUN",
            Event::PipelineCommitted => "PIPELINE_COMMITTED",
            Event::AuditPending => "AUDIT_PENDING",
            Event::ReconcileBaseline => "RECONCILE_BASELINE",
            Event::ReconcileComplete => "RECONCILE_COMPLETE",
            Event::CommandFailed => "COMMAND_FAILED",
        }
    }

    /// Level the event is emitted at
    pub fn level(&self) -> Level {
        match self {
            Event::PipelineLoaded | Event::PipelineDryRun => Level::DEBUG,
            Event::ConfigLoaded
            | Event::StoreInitialized
            | Event::PipelineCommitted
            | Event::ReconcileBaseline
            | Event::ReconcileComplete => Level::INFO,
            Event::GuardOverridden | Event::PipelineRolledBack | Event::PipelineRejected => {
                Level::WARN
            }
            Event::AuditPending | Event::CommandFailed => Level::ERROR,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
