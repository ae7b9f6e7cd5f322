//! Notification kinds and the event payload passed to observers

use crate::core::traits::ActorId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Kind of notification raised around a publishing transition
///
/// The first four fire around the in-memory transition. The two finalized
/// kinds fire only after the caller's unit of work has committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    PrePublish,
    PostPublish,
    PreUnpublish,
    PostUnpublish,
    PublishFinalized,
    UnpublishFinalized,
}

impl NotificationKind {
    /// All kinds, in hub slot order
    pub const ALL: [NotificationKind; 6] = [
        NotificationKind::PrePublish,
        NotificationKind::PostPublish,
        NotificationKind::PreUnpublish,
        NotificationKind::PostUnpublish,
        NotificationKind::PublishFinalized,
        NotificationKind::UnpublishFinalized,
    ];

    /// Get string representation of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::PrePublish => "pre-publish",
            NotificationKind::PostPublish => "post-publish",
            NotificationKind::PreUnpublish => "pre-unpublish",
            NotificationKind::PostUnpublish => "post-unpublish",
            NotificationKind::PublishFinalized => "publish-finalized",
            NotificationKind::UnpublishFinalized => "unpublish-finalized",
        }
    }

    /// Whether this kind signals a durable commit
    pub fn is_finalization(&self) -> bool {
        matches!(
            self,
            NotificationKind::PublishFinalized | NotificationKind::UnpublishFinalized
        )
    }

    pub(crate) fn slot(&self) -> usize {
        match self {
            NotificationKind::PrePublish => 0,
            NotificationKind::PostPublish => 1,
            NotificationKind::PreUnpublish => 2,
            NotificationKind::PostUnpublish => 3,
            NotificationKind::PublishFinalized => 4,
            NotificationKind::UnpublishFinalized => 5,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event payload shared by every observer of one emission
///
/// Observers veto a pre notification by calling [`cancel`](Self::cancel).
/// Nothing in the dispatch path reads the flag; the strategy that raised the
/// notification checks it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishingEventArgs {
    /// Shared by all payloads raised within one strategy call
    #[serde(rename = "correlationId")]
    pub correlation_id: Uuid,

    /// Who initiated the transition (absent for finalization signals)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<ActorId>,

    /// Veto flag
    pub cancel: bool,

    /// Set on batch finalization when every content item was republished
    #[serde(rename = "isAllRepublished")]
    pub is_all_republished: bool,

    /// Implementation-defined metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Default for PublishingEventArgs {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishingEventArgs {
    /// Create a payload with a fresh correlation id
    pub fn new() -> Self {
        Self::with_correlation(Uuid::new_v4())
    }

    /// Create a payload bound to an existing correlation id
    pub fn with_correlation(correlation_id: Uuid) -> Self {
        Self {
            correlation_id,
            actor: None,
            cancel: false,
            is_all_republished: false,
            metadata: HashMap::new(),
        }
    }

    pub fn actor(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn all_republished(mut self, is_all_republished: bool) -> Self {
        self.is_all_republished = is_all_republished;
        self
    }

    /// Copy metadata entries into the payload, keeping existing keys
    pub fn stamp_metadata(&mut self, entries: &HashMap<String, serde_json::Value>) {
        for (key, value) in entries {
            self.metadata
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// Request that the pending transition be aborted
    pub fn cancel(&mut self) {
        self.cancel = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
    }
}

/// What a notification is about: one item or an ordered batch
#[derive(Debug)]
pub enum Subject<'a, C> {
    One(&'a C),
    Many(&'a [&'a C]),
}

impl<C> Clone for Subject<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Subject<'_, C> {}

impl<'a, C> Subject<'a, C> {
    /// Items in caller order
    pub fn items(self) -> impl Iterator<Item = &'a C> {
        let (one, many): (Option<&'a C>, &'a [&'a C]) = match self {
            Subject::One(item) => (Some(item), &[]),
            Subject::Many(items) => (None, items),
        };
        one.into_iter().chain(many.iter().copied())
    }

    pub fn len(&self) -> usize {
        match self {
            Subject::One(_) => 1,
            Subject::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Subject::Many(_))
    }
}
