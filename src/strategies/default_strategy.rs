//! Default publishing strategy
//!
//! Transitions [`PublishableContent`] items in memory and raises the
//! notifications around each transition through a [`PublishingNotifier`].
//!
//! Per item the order is: pre notification, veto check, eligibility checks
//! (trash, schedule, failed ancestor), state change. The post notification
//! follows once for the call and carries only the items that transitioned.

use crate::core::config::{PublishingConfig, StrategyConfig};
use crate::core::error::PublishingError;
use crate::core::events::PublishingEventArgs;
use crate::core::traits::{ActorId, BatchOutcome, ContentItem, PublishingStrategy};
use crate::notifications::{NotificationHub, PublishingNotifier};
use crate::strategies::content::{PublishBlocker, PublishableContent, PublishedState};
use crate::strategies::hooks::FinalizationHook;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Strategy honoring vetoes, trash and scheduling rules
pub struct DefaultPublishingStrategy<C: ContentItem> {
    notifier: PublishingNotifier<C>,
    config: StrategyConfig,
    hooks: Vec<Arc<dyn FinalizationHook<C>>>,
}

impl<C: PublishableContent + 'static> DefaultPublishingStrategy<C> {
    pub fn new(hub: Arc<NotificationHub<C>>) -> Self {
        Self {
            notifier: PublishingNotifier::new(hub),
            config: StrategyConfig::default(),
            hooks: Vec::new(),
        }
    }

    /// Build from loaded configuration: strategy rules plus event metadata
    pub fn from_config(hub: Arc<NotificationHub<C>>, config: &PublishingConfig) -> Self {
        Self {
            notifier: PublishingNotifier::new(hub).with_metadata(config.event_metadata_values()),
            config: config.strategy.clone(),
            hooks: Vec::new(),
        }
    }

    pub fn with_strategy_config(mut self, config: StrategyConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a hook; hooks run in registration order before every finalization signal
    pub fn with_hook(mut self, hook: Arc<dyn FinalizationHook<C>>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn notifier(&self) -> &PublishingNotifier<C> {
        &self.notifier
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn publish_blocker(&self, item: &C, now: DateTime<Utc>) -> Option<PublishBlocker> {
        if self.config.skip_trashed && item.is_trashed() {
            return Some(PublishBlocker::Trashed);
        }
        if self.config.enforce_schedule {
            return item.schedule_blocker(now);
        }
        None
    }

    fn event_args(&self, correlation_id: Uuid, actor: ActorId) -> PublishingEventArgs {
        PublishingEventArgs::with_correlation(correlation_id).actor(actor)
    }

    /// Pre notification, veto and eligibility checks, then the state change
    fn try_publish(
        &self,
        item: &mut C,
        actor: ActorId,
        correlation_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, PublishingError> {
        let mut args = self.event_args(correlation_id, actor);
        self.notifier.emit_pre_publish(item, &mut args)?;

        if args.is_cancelled() {
            info!(item = %item.id(), %actor, %correlation_id, "publish vetoed by observer");
            return Ok(false);
        }
        if let Some(blocker) = self.publish_blocker(item, now) {
            info!(item = %item.id(), reason = %blocker, %correlation_id, "publish refused");
            return Ok(false);
        }

        item.set_published_state(PublishedState::Published, actor);
        debug!(item = %item.id(), %actor, "item published in memory");
        Ok(true)
    }

    fn try_unpublish(
        &self,
        item: &mut C,
        actor: ActorId,
        correlation_id: Uuid,
    ) -> Result<bool, PublishingError> {
        let mut args = self.event_args(correlation_id, actor);
        self.notifier.emit_pre_unpublish(item, &mut args)?;

        if args.is_cancelled() {
            info!(item = %item.id(), %actor, %correlation_id, "unpublish vetoed by observer");
            return Ok(false);
        }

        item.set_published_state(PublishedState::Unpublished, actor);
        debug!(item = %item.id(), %actor, "item unpublished in memory");
        Ok(true)
    }

    fn run_published_hooks(
        &self,
        items: &[&C],
        is_all_republished: bool,
    ) -> Result<(), PublishingError> {
        for hook in &self.hooks {
            hook.on_published(items, is_all_republished)
                .map_err(|source| PublishingError::HookFailed {
                    hook: hook.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    fn run_unpublished_hooks(&self, items: &[&C]) -> Result<(), PublishingError> {
        for hook in &self.hooks {
            hook.on_unpublished(items)
                .map_err(|source| PublishingError::HookFailed {
                    hook: hook.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }
}

impl<C: PublishableContent + 'static> PublishingStrategy<C> for DefaultPublishingStrategy<C> {
    fn publish(&self, item: &mut C, actor: ActorId) -> Result<bool, PublishingError> {
        let correlation_id = Uuid::new_v4();
        if !self.try_publish(item, actor, correlation_id, Utc::now())? {
            return Ok(false);
        }

        let mut args = self.event_args(correlation_id, actor);
        self.notifier.emit_post_publish_one(item, &mut args)?;
        Ok(true)
    }

    fn publish_with_descendants(
        &self,
        items: &mut [C],
        actor: ActorId,
    ) -> Result<bool, PublishingError> {
        Ok(self
            .publish_with_descendants_outcome(items, actor)?
            .is_complete())
    }

    fn publish_with_descendants_outcome(
        &self,
        items: &mut [C],
        actor: ActorId,
    ) -> Result<BatchOutcome, PublishingError> {
        let correlation_id = Uuid::new_v4();
        let now = Utc::now();
        let mut failed: HashSet<C::Id> = HashSet::new();
        let mut outcome = BatchOutcome::new(items.len());

        for (index, item) in items.iter_mut().enumerate() {
            let ancestor_failed = self.config.cascade_descendant_failures
                && item.parent_id().is_some_and(|parent| failed.contains(&parent));

            if ancestor_failed {
                info!(
                    item = %item.id(),
                    reason = %PublishBlocker::AncestorFailed,
                    %correlation_id,
                    "publish refused"
                );
            } else if self.try_publish(item, actor, correlation_id, now)? {
                outcome.record(index);
                continue;
            }
            failed.insert(item.id());
        }

        let published = outcome.select(&*items);
        if !published.is_empty() {
            let mut args = self.event_args(correlation_id, actor);
            self.notifier.emit_post_publish_many(&published, &mut args)?;
        }

        debug!(
            published = published.len(),
            refused = outcome.refused(),
            %correlation_id,
            "batch publish complete"
        );
        Ok(outcome)
    }

    fn unpublish(&self, item: &mut C, actor: ActorId) -> Result<bool, PublishingError> {
        let correlation_id = Uuid::new_v4();
        if !self.try_unpublish(item, actor, correlation_id)? {
            return Ok(false);
        }

        let mut args = self.event_args(correlation_id, actor);
        self.notifier.emit_post_unpublish_one(item, &mut args)?;
        Ok(true)
    }

    fn unpublish_many(&self, items: &mut [C], actor: ActorId) -> Result<bool, PublishingError> {
        Ok(self.unpublish_many_outcome(items, actor)?.is_complete())
    }

    fn unpublish_many_outcome(
        &self,
        items: &mut [C],
        actor: ActorId,
    ) -> Result<BatchOutcome, PublishingError> {
        let correlation_id = Uuid::new_v4();
        let mut outcome = BatchOutcome::new(items.len());

        for (index, item) in items.iter_mut().enumerate() {
            if self.try_unpublish(item, actor, correlation_id)? {
                outcome.record(index);
            }
        }

        let unpublished = outcome.select(&*items);
        if !unpublished.is_empty() {
            let mut args = self.event_args(correlation_id, actor);
            self.notifier
                .emit_post_unpublish_many(&unpublished, &mut args)?;
        }
        Ok(outcome)
    }

    fn publishing_finalized(&self, item: &C) -> Result<(), PublishingError> {
        self.run_published_hooks(&[item], false)?;
        self.notifier.emit_publishing_finalized_one(item)
    }

    fn publishing_finalized_many(
        &self,
        items: &[&C],
        is_all_republished: bool,
    ) -> Result<(), PublishingError> {
        self.run_published_hooks(items, is_all_republished)?;
        self.notifier
            .emit_publishing_finalized_many(items, is_all_republished)
    }

    fn unpublishing_finalized(&self, item: &C) -> Result<(), PublishingError> {
        self.run_unpublished_hooks(&[item])?;
        self.notifier.emit_unpublishing_finalized_one(item)
    }

    fn unpublishing_finalized_many(&self, items: &[&C]) -> Result<(), PublishingError> {
        self.run_unpublished_hooks(items)?;
        self.notifier.emit_unpublishing_finalized_many(items)
    }
}
