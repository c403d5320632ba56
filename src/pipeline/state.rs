//! Pipeline state machine
//!
//! ```text
//! Loaded -> Patching -> Validating -> Committed
//!              |            |-------> Rejected
//!              |            '-------> DryRun
//!              '--> RolledBack
//! ```
//!
//! - Transitions are explicit; nothing is inferred
//! - Committed, RolledBack, Rejected and DryRun are terminal
//! - Only Committed has a durable effect

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::document::Document;
use crate::error::{NodeError, NodeResult};
use crate::patch::{PatchExecutor, PatchOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Loaded,
    Patching,
    Validating,
    Committed,
    RolledBack,
    Rejected,
    DryRun,
}

/// A transition the state machine does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("forbidden pipeline transition {from} -> {to}")]
pub struct TransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

impl PipelineState {
    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Loaded => "Loaded",
            Self::Patching => "Patching",
            Self::Validating => "Validating",
            Self::Committed => "Committed",
            Self::RolledBack => "RolledBack",
            Self::Rejected => "Rejected",
            Self::DryRun => "DryRun",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Committed | Self::RolledBack | Self::Rejected | Self::DryRun
        )
    }

    /// Moves to `next` if the transition is allowed.
    pub fn advance(self, next: PipelineState) -> Result<Self, TransitionError> {
        let allowed = matches!(
            (self, next),
            (Self::Loaded, Self::Patching)
                | (Self::Patching, Self::Validating)
                | (Self::Patching, Self::RolledBack)
                | (Self::Validating, Self::Committed)
                | (Self::Validating, Self::Rejected)
                | (Self::Validating, Self::DryRun)
        );
        if allowed {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self.state_name(),
                to: next.state_name(),
            })
        }
    }
}

/// Working state of one apply.
///
/// The stored document is never touched; all operations run against a deep
/// copy of its JSON view, and the typed candidate is only rebuilt once every
/// operation has succeeded.
#[derive(Debug)]
pub struct Transaction {
    state: PipelineState,
    original: Document,
    original_value: Value,
    working: Value,
}

impl Transaction {
    pub fn begin(original: Document) -> NodeResult<Self> {
        let working = original
            .to_value()
            .map_err(|e| NodeError::invalid_request(format!("document not representable: {}", e)))?;
        Ok(Self {
            state: PipelineState::Loaded,
            original,
            original_value: working.clone(),
            working,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn original(&self) -> &Document {
        &self.original
    }

    /// JSON view of the document as loaded.
    pub fn original_value(&self) -> &Value {
        &self.original_value
    }

    pub fn working(&self) -> &Value {
        &self.working
    }

    fn advance(&mut self, next: PipelineState) -> NodeResult<()> {
        self.state = self.state.advance(next)?;
        Ok(())
    }

    /// Runs every operation in order. The first failure discards the
    /// working copy and reports the 1-based index of the failing operation.
    pub fn apply_all(&mut self, executor: &PatchExecutor<'_>, ops: &[PatchOp]) -> NodeResult<()> {
        self.advance(PipelineState::Patching)?;
        for (i, op) in ops.iter().enumerate() {
            if let Err(source) = executor.apply(&mut self.working, op) {
                self.working = Value::Null;
                self.advance(PipelineState::RolledBack)?;
                return Err(NodeError::patch(i + 1, op, source));
            }
        }
        Ok(())
    }

    /// Ends patching: rebuilds the typed candidate and bumps its version
    /// exactly once.
    pub fn candidate(&mut self) -> NodeResult<Document> {
        let rebuilt = Document::from_value(self.working.clone());
        let mut candidate = match rebuilt {
            Ok(doc) => doc,
            Err(e) => {
                self.advance(PipelineState::RolledBack)?;
                return Err(NodeError::invalid_request(format!(
                    "patched document is malformed: {}",
                    e
                )));
            }
        };
        candidate.version = self.original.version + 1;
        self.advance(PipelineState::Validating)?;
        Ok(candidate)
    }

    /// Whole-document replacement in place of the operation loop. The
    /// replacement's own version is ignored.
    pub fn replace(&mut self, mut replacement: Document) -> NodeResult<Document> {
        self.advance(PipelineState::Patching)?;
        replacement.version = self.original.version + 1;
        self.working = replacement
            .to_value()
            .map_err(|e| NodeError::invalid_request(format!("document not representable: {}", e)))?;
        self.advance(PipelineState::Validating)?;
        Ok(replacement)
    }

    pub fn reject(&mut self) -> NodeResult<()> {
        self.advance(PipelineState::Rejected)
    }

    pub fn stop_dry_run(&mut self) -> NodeResult<()> {
        self.advance(PipelineState::DryRun)
    }

    pub fn commit(&mut self) -> NodeResult<()> {
        self.advance(PipelineState::Committed)
    }
}
