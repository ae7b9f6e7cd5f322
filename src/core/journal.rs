//! Transition journal for one publishing operation
//!
//! Records the stages a publish / unpublish passes through on its way from
//! the in-memory decision to the finalization signal, and refuses edges that
//! would let finalization run ahead of the commit.

use crate::core::error::PublishingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Publishing operation a journal belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionOperation {
    Publish,
    PublishWithDescendants,
    RepublishAll,
    Unpublish,
    UnpublishMany,
}

impl TransitionOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionOperation::Publish => "publish",
            TransitionOperation::PublishWithDescendants => "publish-with-descendants",
            TransitionOperation::RepublishAll => "republish-all",
            TransitionOperation::Unpublish => "unpublish",
            TransitionOperation::UnpublishMany => "unpublish-many",
        }
    }

    /// Whether the operation makes content visible
    pub fn is_publish(&self) -> bool {
        matches!(
            self,
            TransitionOperation::Publish
                | TransitionOperation::PublishWithDescendants
                | TransitionOperation::RepublishAll
        )
    }
}

impl fmt::Display for TransitionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage of a publishing operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionStage {
    Initial,
    Transitioning,
    Rejected,
    Transitioned,
    Committing,
    Committed,
    Finalized,
    Failed,
}

impl TransitionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionStage::Initial => "INITIAL",
            TransitionStage::Transitioning => "TRANSITIONING",
            TransitionStage::Rejected => "REJECTED",
            TransitionStage::Transitioned => "TRANSITIONED",
            TransitionStage::Committing => "COMMITTING",
            TransitionStage::Committed => "COMMITTED",
            TransitionStage::Finalized => "FINALIZED",
            TransitionStage::Failed => "FAILED",
        }
    }

    /// Terminal stages accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransitionStage::Rejected | TransitionStage::Finalized | TransitionStage::Failed
        )
    }

    fn allows(&self, to: TransitionStage) -> bool {
        use TransitionStage::*;

        match (self, to) {
            (Initial, Transitioning) => true,
            (Transitioning, Rejected | Transitioned) => true,
            (Transitioned, Committing) => true,
            (Committing, Committed) => true,
            (Committed, Finalized) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for TransitionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageTransition {
    pub from: TransitionStage,
    pub to: TransitionStage,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Serializable view of a journal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalSnapshot {
    pub operation: TransitionOperation,

    #[serde(rename = "currentStage")]
    pub current_stage: TransitionStage,

    pub transitions: Vec<StageTransition>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Journal tracking one publishing operation
#[derive(Debug, Clone)]
pub struct TransitionJournal {
    operation: TransitionOperation,
    current_stage: TransitionStage,
    transitions: Vec<StageTransition>,
    error: Option<String>,
}

impl TransitionJournal {
    pub fn new(operation: TransitionOperation) -> Self {
        Self {
            operation,
            current_stage: TransitionStage::Initial,
            transitions: Vec::new(),
            error: None,
        }
    }

    /// Move to a new stage
    ///
    /// An `error` string in the metadata is kept as the journal's last error.
    pub fn transition(
        &mut self,
        to: TransitionStage,
        metadata: Option<HashMap<String, serde_json::Value>>,
    ) -> Result<(), PublishingError> {
        if !self.current_stage.allows(to) {
            return Err(PublishingError::InvalidTransition {
                from: self.current_stage,
                to,
            });
        }

        if let Some(serde_json::Value::String(error)) =
            metadata.as_ref().and_then(|meta| meta.get("error"))
        {
            self.error = Some(error.clone());
        }

        self.transitions.push(StageTransition {
            from: self.current_stage,
            to,
            timestamp: Utc::now(),
            metadata,
        });
        self.current_stage = to;

        Ok(())
    }

    /// Mark the operation failed, recording the error message
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), PublishingError> {
        let mut metadata = HashMap::new();
        metadata.insert(
            "error".to_string(),
            serde_json::Value::String(message.into()),
        );
        self.transition(TransitionStage::Failed, Some(metadata))
    }

    pub fn get_stage(&self) -> TransitionStage {
        self.current_stage
    }

    pub fn get_operation(&self) -> TransitionOperation {
        self.operation
    }

    /// Finalization is only legal once the commit has been recorded
    pub fn can_finalize(&self) -> bool {
        self.current_stage == TransitionStage::Committed
    }

    /// Return an error unless the journal is in the committed stage
    pub fn ensure_committed(&self) -> Result<(), PublishingError> {
        if self.can_finalize() {
            Ok(())
        } else {
            Err(PublishingError::FinalizeBeforeCommit {
                operation: self.operation,
                stage: self.current_stage,
            })
        }
    }

    pub fn snapshot(&self) -> JournalSnapshot {
        JournalSnapshot {
            operation: self.operation,
            current_stage: self.current_stage,
            transitions: self.transitions.clone(),
            error: self.error.clone(),
        }
    }

    pub fn get_last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Milliseconds between the first and last recorded transition
    pub fn get_elapsed_time(&self) -> i64 {
        match (self.transitions.first(), self.transitions.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_milliseconds(),
            _ => 0,
        }
    }

    /// Get transition history as human-readable string
    pub fn get_history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| {
                let time = t.timestamp.to_rfc3339();
                let meta = if let Some(metadata) = &t.metadata {
                    format!(" ({})", serde_json::to_string(metadata).unwrap_or_default())
                } else {
                    String::new()
                };
                format!("{}: {} → {}{}", time, t.from, t.to, meta)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
