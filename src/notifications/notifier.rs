//! Emission operations used by publishing strategies
//!
//! A strategy holds a [`PublishingNotifier`] and calls it explicitly around
//! its transitions: pre notifications before any mutation, post
//! notifications once the in-memory decision is made, finalization signals
//! once the caller reports a durable commit.

use crate::core::error::PublishingError;
use crate::core::events::{NotificationKind, PublishingEventArgs, Subject};
use crate::notifications::hub::NotificationHub;
use std::collections::HashMap;
use std::sync::Arc;

/// Dispatch helper bound to a [`NotificationHub`]
pub struct PublishingNotifier<C> {
    hub: Arc<NotificationHub<C>>,
    metadata: HashMap<String, serde_json::Value>,
}

impl<C> Clone for PublishingNotifier<C> {
    fn clone(&self) -> Self {
        Self {
            hub: Arc::clone(&self.hub),
            metadata: self.metadata.clone(),
        }
    }
}

impl<C> PublishingNotifier<C> {
    pub fn new(hub: Arc<NotificationHub<C>>) -> Self {
        Self {
            hub,
            metadata: HashMap::new(),
        }
    }

    /// Stamp these entries onto every payload this notifier dispatches
    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn hub(&self) -> &Arc<NotificationHub<C>> {
        &self.hub
    }

    fn emit(
        &self,
        kind: NotificationKind,
        subject: Subject<'_, C>,
        args: &mut PublishingEventArgs,
    ) -> Result<(), PublishingError> {
        args.stamp_metadata(&self.metadata);
        self.hub.dispatch(kind, subject, args)
    }

    /// Raise PrePublish; check `args.is_cancelled()` afterwards
    pub fn emit_pre_publish(
        &self,
        item: &C,
        args: &mut PublishingEventArgs,
    ) -> Result<(), PublishingError> {
        self.emit(NotificationKind::PrePublish, Subject::One(item), args)
    }

    pub fn emit_post_publish_one(
        &self,
        item: &C,
        args: &mut PublishingEventArgs,
    ) -> Result<(), PublishingError> {
        self.emit(NotificationKind::PostPublish, Subject::One(item), args)
    }

    pub fn emit_post_publish_many(
        &self,
        items: &[&C],
        args: &mut PublishingEventArgs,
    ) -> Result<(), PublishingError> {
        self.emit(NotificationKind::PostPublish, Subject::Many(items), args)
    }

    /// Raise PreUnpublish; check `args.is_cancelled()` afterwards
    pub fn emit_pre_unpublish(
        &self,
        item: &C,
        args: &mut PublishingEventArgs,
    ) -> Result<(), PublishingError> {
        self.emit(NotificationKind::PreUnpublish, Subject::One(item), args)
    }

    pub fn emit_post_unpublish_one(
        &self,
        item: &C,
        args: &mut PublishingEventArgs,
    ) -> Result<(), PublishingError> {
        self.emit(NotificationKind::PostUnpublish, Subject::One(item), args)
    }

    pub fn emit_post_unpublish_many(
        &self,
        items: &[&C],
        args: &mut PublishingEventArgs,
    ) -> Result<(), PublishingError> {
        self.emit(NotificationKind::PostUnpublish, Subject::Many(items), args)
    }

    /// Raise PublishFinalized; only after the item's commit succeeded
    pub fn emit_publishing_finalized_one(&self, item: &C) -> Result<(), PublishingError> {
        let mut args = PublishingEventArgs::new();
        self.emit(NotificationKind::PublishFinalized, Subject::One(item), &mut args)
    }

    /// Raise PublishFinalized for a batch; only after the batch's commit succeeded
    pub fn emit_publishing_finalized_many(
        &self,
        items: &[&C],
        is_all_republished: bool,
    ) -> Result<(), PublishingError> {
        let mut args = PublishingEventArgs::new().all_republished(is_all_republished);
        self.emit(NotificationKind::PublishFinalized, Subject::Many(items), &mut args)
    }

    pub fn emit_unpublishing_finalized_one(&self, item: &C) -> Result<(), PublishingError> {
        let mut args = PublishingEventArgs::new();
        self.emit(NotificationKind::UnpublishFinalized, Subject::One(item), &mut args)
    }

    pub fn emit_unpublishing_finalized_many(&self, items: &[&C]) -> Result<(), PublishingError> {
        let mut args = PublishingEventArgs::new();
        self.emit(NotificationKind::UnpublishFinalized, Subject::Many(items), &mut args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Seen {
        kind: &'static str,
        items: Vec<u32>,
        is_all_republished: bool,
        batch: bool,
    }

    fn record_all(hub: &NotificationHub<u32>) -> Arc<Mutex<Vec<Seen>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in NotificationKind::ALL {
            let seen = seen.clone();
            hub.subscribe(kind, move |subject, args| {
                seen.lock().push(Seen {
                    kind: kind.as_str(),
                    items: subject.items().copied().collect(),
                    is_all_republished: args.is_all_republished,
                    batch: subject.is_batch(),
                });
                Ok(())
            });
        }
        seen
    }

    #[test]
    fn test_each_emit_targets_its_kind() {
        let hub: Arc<NotificationHub<u32>> = Arc::new(NotificationHub::new());
        let seen = record_all(&hub);
        let notifier = PublishingNotifier::new(hub);
        let mut args = PublishingEventArgs::new();
        let (a, b) = (1u32, 2u32);

        notifier.emit_pre_publish(&a, &mut args).unwrap();
        notifier.emit_post_publish_one(&a, &mut args).unwrap();
        notifier.emit_post_publish_many(&[&a, &b], &mut args).unwrap();
        notifier.emit_pre_unpublish(&b, &mut args).unwrap();
        notifier.emit_post_unpublish_one(&b, &mut args).unwrap();
        notifier.emit_post_unpublish_many(&[&b, &a], &mut args).unwrap();
        notifier.emit_publishing_finalized_one(&a).unwrap();
        notifier.emit_publishing_finalized_many(&[&a, &b], true).unwrap();
        notifier.emit_unpublishing_finalized_one(&b).unwrap();
        notifier.emit_unpublishing_finalized_many(&[&b]).unwrap();

        let kinds: Vec<_> = seen.lock().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                "pre-publish",
                "post-publish",
                "post-publish",
                "pre-unpublish",
                "post-unpublish",
                "post-unpublish",
                "publish-finalized",
                "publish-finalized",
                "unpublish-finalized",
                "unpublish-finalized",
            ]
        );

        let seen = seen.lock();
        assert_eq!(seen[2].items, vec![1, 2]);
        assert!(seen[2].batch);
        assert_eq!(seen[5].items, vec![2, 1]);
        assert!(!seen[6].is_all_republished);
        assert!(seen[7].is_all_republished);
        assert!(!seen[8].batch);
    }

    #[test]
    fn test_batch_keeps_duplicates_and_order() {
        let hub: Arc<NotificationHub<u32>> = Arc::new(NotificationHub::new());
        let seen = record_all(&hub);
        let notifier = PublishingNotifier::new(hub);
        let (x, y) = (5u32, 6u32);

        let mut args = PublishingEventArgs::new();
        notifier
            .emit_post_publish_many(&[&y, &x, &y], &mut args)
            .unwrap();

        assert_eq!(seen.lock()[0].items, vec![6, 5, 6]);
    }

    #[test]
    fn test_metadata_is_stamped() {
        let hub: Arc<NotificationHub<u32>> = Arc::new(NotificationHub::new());
        let captured = Arc::new(Mutex::new(None));
        let captured_clone = captured.clone();
        hub.on_publish_finalized(move |_, args| {
            *captured_clone.lock() = Some(args.metadata.clone());
            Ok(())
        });

        let mut metadata = HashMap::new();
        metadata.insert("site".to_string(), serde_json::json!("intranet"));
        let notifier = PublishingNotifier::new(hub).with_metadata(metadata);

        notifier.emit_publishing_finalized_one(&1).unwrap();

        let captured = captured.lock().clone().unwrap();
        assert_eq!(captured["site"], serde_json::json!("intranet"));
    }

    #[test]
    fn test_veto_is_carried_not_enforced() {
        let hub: Arc<NotificationHub<u32>> = Arc::new(NotificationHub::new());
        hub.on_pre_unpublish(|_, args| {
            args.cancel();
            Ok(())
        });
        let notifier = PublishingNotifier::new(hub);

        let mut args = PublishingEventArgs::new();
        let result = notifier.emit_pre_unpublish(&9, &mut args);

        assert!(result.is_ok());
        assert!(args.is_cancelled());
    }
}
