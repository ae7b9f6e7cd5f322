//! Publishable content model used by the default strategy

use crate::core::traits::{ActorId, ContentItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Visibility state of a content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PublishedState {
    Published,
    #[default]
    Unpublished,
}

impl PublishedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishedState::Published => "published",
            PublishedState::Unpublished => "unpublished",
        }
    }
}

impl fmt::Display for PublishedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an item was not allowed to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishBlocker {
    Trashed,
    AwaitingRelease(DateTime<Utc>),
    Expired(DateTime<Utc>),
    AncestorFailed,
}

impl fmt::Display for PublishBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishBlocker::Trashed => f.write_str("item is in the recycle bin"),
            PublishBlocker::AwaitingRelease(at) => write!(f, "release date {} not reached", at),
            PublishBlocker::Expired(at) => write!(f, "expired at {}", at),
            PublishBlocker::AncestorFailed => f.write_str("an ancestor failed to publish"),
        }
    }
}

/// Content the default strategy knows how to transition
///
/// Beyond identity it needs the parent link (for descendant batches), the
/// current state, and the scheduling window.
pub trait PublishableContent: ContentItem {
    fn parent_id(&self) -> Option<Self::Id>;

    fn published_state(&self) -> PublishedState;

    /// Record the new state and who caused it
    fn set_published_state(&mut self, state: PublishedState, actor: ActorId);

    fn is_trashed(&self) -> bool {
        false
    }

    fn release_date(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn expire_date(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn is_published(&self) -> bool {
        self.published_state() == PublishedState::Published
    }

    /// Schedule check against `now`; trash and ancestry are the strategy's concern
    fn schedule_blocker(&self, now: DateTime<Utc>) -> Option<PublishBlocker> {
        if let Some(expire) = self.expire_date()
            && expire <= now
        {
            return Some(PublishBlocker::Expired(expire));
        }
        match self.release_date() {
            Some(release) if release > now => Some(PublishBlocker::AwaitingRelease(release)),
            _ => None,
        }
    }
}

/// Plain content document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub id: u64,
    pub name: String,

    #[serde(rename = "parentId", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,

    #[serde(default)]
    pub state: PublishedState,

    #[serde(default)]
    pub trashed: bool,

    #[serde(rename = "releaseDate", skip_serializing_if = "Option::is_none")]
    pub release_date: Option<DateTime<Utc>>,

    #[serde(rename = "expireDate", skip_serializing_if = "Option::is_none")]
    pub expire_date: Option<DateTime<Utc>>,

    #[serde(rename = "updatedBy", skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<ActorId>,

    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Content {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id: None,
            state: PublishedState::Unpublished,
            trashed: false,
            release_date: None,
            expire_date: None,
            updated_by: None,
            updated_at: None,
        }
    }

    pub fn child_of(mut self, parent_id: u64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn published(mut self) -> Self {
        self.state = PublishedState::Published;
        self
    }

    pub fn trashed(mut self) -> Self {
        self.trashed = true;
        self
    }

    pub fn release_at(mut self, at: DateTime<Utc>) -> Self {
        self.release_date = Some(at);
        self
    }

    pub fn expire_at(mut self, at: DateTime<Utc>) -> Self {
        self.expire_date = Some(at);
        self
    }
}

impl ContentItem for Content {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }
}

impl PublishableContent for Content {
    fn parent_id(&self) -> Option<u64> {
        self.parent_id
    }

    fn published_state(&self) -> PublishedState {
        self.state
    }

    fn set_published_state(&mut self, state: PublishedState, actor: ActorId) {
        self.state = state;
        self.updated_by = Some(actor);
        self.updated_at = Some(Utc::now());
    }

    fn is_trashed(&self) -> bool {
        self.trashed
    }

    fn release_date(&self) -> Option<DateTime<Utc>> {
        self.release_date
    }

    fn expire_date(&self) -> Option<DateTime<Utc>> {
        self.expire_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_content_is_unpublished() {
        let content = Content::new(1, "Home");

        assert_eq!(content.published_state(), PublishedState::Unpublished);
        assert!(!content.is_published());
        assert!(!content.is_trashed());
        assert!(content.parent_id().is_none());
    }

    #[test]
    fn test_set_published_state_records_actor() {
        let mut content = Content::new(2, "About");
        content.set_published_state(PublishedState::Published, ActorId::new(7));

        assert!(content.is_published());
        assert_eq!(content.updated_by, Some(ActorId::new(7)));
        assert!(content.updated_at.is_some());
    }

    #[test]
    fn test_schedule_blocker() {
        let now = Utc::now();

        let pending = Content::new(3, "Launch").release_at(now + Duration::hours(1));
        assert!(matches!(
            pending.schedule_blocker(now),
            Some(PublishBlocker::AwaitingRelease(_))
        ));

        let expired = Content::new(4, "Old news").expire_at(now - Duration::minutes(5));
        assert!(matches!(
            expired.schedule_blocker(now),
            Some(PublishBlocker::Expired(_))
        ));

        let live = Content::new(5, "Live")
            .release_at(now - Duration::hours(1))
            .expire_at(now + Duration::hours(1));
        assert!(live.schedule_blocker(now).is_none());
    }

    #[test]
    fn test_content_serialization() {
        let content = Content::new(10, "Products").child_of(1).published();
        let json = serde_json::to_string(&content).unwrap();

        assert!(json.contains(r#""parentId":1"#));
        assert!(json.contains(r#""state":"published""#));
        assert!(!json.contains("releaseDate"));

        let restored: Content = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, content);
    }
}
