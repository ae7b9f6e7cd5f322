//! Error handling for content publishing
//!
//! Observer faults, commit failures and ordering misuse all surface through
//! [`PublishingError`]. Vetoes are not errors: they travel on the event
//! payload and end up as an `Ok(false)` from the strategy.

use crate::core::events::NotificationKind;
use crate::core::journal::{TransitionOperation, TransitionStage};
use thiserror::Error;

/// Main error type for publishing operations
#[derive(Error, Debug)]
pub enum PublishingError {
    /// An observer returned an error while a notification was dispatched.
    /// Observers registered after it were not invoked for that emission.
    #[error("[{kind}] observer #{subscription} failed: {source}")]
    ObserverFailed {
        kind: NotificationKind,
        subscription: u64,
        #[source]
        source: anyhow::Error,
    },

    /// A finalization hook failed; the finalization signal was not raised
    #[error("finalization hook '{hook}' failed: {source}")]
    HookFailed {
        hook: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("[{operation}] commit failed: {message}")]
    CommitFailed {
        operation: TransitionOperation,
        message: String,
    },

    #[error("[{operation}] finalization requested in stage {stage} before commit")]
    FinalizeBeforeCommit {
        operation: TransitionOperation,
        stage: TransitionStage,
    },

    #[error("invalid journal transition: {from} -> {to}")]
    InvalidTransition {
        from: TransitionStage,
        to: TransitionStage,
    },

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl PublishingError {
    /// Check if this error is recoverable by retrying the operation
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::CommitFailed { .. })
    }

    /// Notification kind associated with this error, if any
    pub fn notification_kind(&self) -> Option<NotificationKind> {
        match self {
            Self::ObserverFailed { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::ObserverFailed { .. } => vec![
                "Inspect the failing observer's error",
                "Observers registered after the failing one were not notified",
            ],
            Self::HookFailed { .. } => vec![
                "Inspect the failing hook's error",
                "The commit already succeeded; rerun finalization once the hook recovers",
            ],
            Self::CommitFailed { .. } => vec![
                "Check the storage backend",
                "Retry the operation once the backend is available",
            ],
            Self::FinalizeBeforeCommit { .. } => {
                vec!["Only finalize after the unit of work has committed"]
            }
            Self::InvalidTransition { .. } => {
                vec!["Start a new journal for each publishing operation"]
            }
            Self::ConfigError(_) => vec![
                "Check .publishing.yaml / .publishing.toml",
                "Check PUBLISHING_* environment variables",
            ],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::ObserverFailed { .. } => "OBSERVER_FAILED",
            Self::HookFailed { .. } => "HOOK_FAILED",
            Self::CommitFailed { .. } => "COMMIT_FAILED",
            Self::FinalizeBeforeCommit { .. } => "FINALIZE_BEFORE_COMMIT",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_observer_failed_error() {
        let error = PublishingError::ObserverFailed {
            kind: NotificationKind::PrePublish,
            subscription: 7,
            source: anyhow::anyhow!("index offline"),
        };

        assert_eq!(error.code(), "OBSERVER_FAILED");
        assert!(!error.is_recoverable());
        assert_eq!(error.notification_kind(), Some(NotificationKind::PrePublish));

        let display = error.to_string();
        assert!(display.contains("pre-publish"));
        assert!(display.contains("#7"));
        assert!(display.contains("index offline"));
    }

    #[test]
    fn test_observer_failed_exposes_source() {
        let error = PublishingError::ObserverFailed {
            kind: NotificationKind::PostUnpublish,
            subscription: 1,
            source: anyhow::anyhow!("boom"),
        };

        let source = error.source().unwrap();
        assert_eq!(source.to_string(), "boom");
    }

    #[test]
    fn test_hook_failed_error() {
        let error = PublishingError::HookFailed {
            hook: "published-cache".to_string(),
            source: anyhow::anyhow!("poisoned"),
        };

        assert_eq!(error.code(), "HOOK_FAILED");
        assert!(!error.is_recoverable());
        assert!(error.to_string().contains("published-cache"));
    }

    #[test]
    fn test_commit_failed_is_recoverable() {
        let error = PublishingError::CommitFailed {
            operation: TransitionOperation::Publish,
            message: "deadlock detected".to_string(),
        };

        assert!(error.is_recoverable());
        assert_eq!(error.code(), "COMMIT_FAILED");
        assert!(error.to_string().contains("deadlock detected"));
        assert!(error.notification_kind().is_none());
    }

    #[test]
    fn test_finalize_before_commit_error() {
        let error = PublishingError::FinalizeBeforeCommit {
            operation: TransitionOperation::Unpublish,
            stage: TransitionStage::Transitioned,
        };

        assert!(!error.is_recoverable());
        assert_eq!(error.code(), "FINALIZE_BEFORE_COMMIT");
        let display = error.to_string();
        assert!(display.contains("unpublish"));
        assert!(display.contains("TRANSITIONED"));
    }

    #[test]
    fn test_config_error() {
        let error = PublishingError::ConfigError("bad yaml".to_string());

        assert_eq!(error.code(), "CONFIG_ERROR");
        assert!(error.suggested_actions().len() >= 2);
    }
}
