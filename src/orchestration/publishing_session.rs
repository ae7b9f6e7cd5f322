//! Publishing Session - drives one transition from decision to finalization
//!
//! Manages the complete workflow for a publishing operation:
//! - In-memory transition through the strategy (pre / post notifications)
//! - Durable commit through the unit of work, retried on transient errors
//! - Finalization signal, only once the commit succeeded
//! - Journal of the stages passed, returned in the report

use crate::core::config::PublishingConfig;
use crate::core::error::PublishingError;
use crate::core::journal::{JournalSnapshot, TransitionJournal, TransitionOperation, TransitionStage};
use crate::core::retry::{RetryManager, RetryOptions};
use crate::core::traits::{ActorId, BatchOutcome, ContentItem, PublishingStrategy};
use crate::orchestration::unit_of_work::UnitOfWork;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::Instant;
use tracing::{info, warn};

/// Report returned after a session operation
#[derive(Debug, Clone, Serialize)]
pub struct TransitionReport {
    pub operation: TransitionOperation,

    /// Strategy accepted every item
    pub accepted: bool,

    /// Commit and finalization both ran
    pub finalized: bool,

    #[serde(rename = "itemCount")]
    pub item_count: usize,

    /// Items that transitioned and were committed
    #[serde(rename = "committedCount")]
    pub committed_count: usize,

    pub stage: TransitionStage,

    /// Duration in milliseconds
    pub duration: u64,

    pub journal: JournalSnapshot,
}

/// Couples a strategy with the unit of work that persists its result
///
/// Only the items the strategy actually transitioned are committed and
/// finalized; refused items of a batch are left out, input order is kept.
pub struct PublishingSession<C, S, U>
where
    C: ContentItem,
    S: PublishingStrategy<C>,
    U: UnitOfWork<C>,
{
    strategy: S,
    unit_of_work: U,
    retry: RetryManager,
    _content: PhantomData<fn() -> C>,
}

impl<C, S, U> PublishingSession<C, S, U>
where
    C: ContentItem,
    S: PublishingStrategy<C>,
    U: UnitOfWork<C>,
{
    pub fn new(strategy: S, unit_of_work: U) -> Self {
        Self {
            strategy,
            unit_of_work,
            retry: RetryManager::default(),
            _content: PhantomData,
        }
    }

    /// Build with the commit retry settings from configuration
    pub fn from_config(strategy: S, unit_of_work: U, config: &PublishingConfig) -> Self {
        Self::new(strategy, unit_of_work).with_retry(config.commit.retry_options())
    }

    pub fn with_retry(mut self, options: RetryOptions) -> Self {
        self.retry = RetryManager::new(options);
        self
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn unit_of_work(&self) -> &U {
        &self.unit_of_work
    }

    /// Publish a single item
    pub async fn publish(
        &self,
        item: &mut C,
        actor: ActorId,
    ) -> Result<TransitionReport, PublishingError> {
        let (journal, started) = Self::begin(TransitionOperation::Publish)?;
        let accepted = self
            .strategy
            .publish(item, actor)
            .inspect_err(|e| Self::log_transition_error(TransitionOperation::Publish, e))?;

        let item: &C = item;
        let outcome = Self::single_outcome(accepted);
        self.complete(journal, started, &outcome, std::slice::from_ref(item), |_| {
            self.strategy.publishing_finalized(item)
        })
        .await
    }

    /// Publish roots followed by their descendants
    pub async fn publish_with_descendants(
        &self,
        items: &mut [C],
        actor: ActorId,
    ) -> Result<TransitionReport, PublishingError> {
        self.publish_batch(TransitionOperation::PublishWithDescendants, items, actor, false)
            .await
    }

    /// Publish the entire content set; finalization tells observers to rebuild
    pub async fn republish_all(
        &self,
        items: &mut [C],
        actor: ActorId,
    ) -> Result<TransitionReport, PublishingError> {
        self.publish_batch(TransitionOperation::RepublishAll, items, actor, true)
            .await
    }

    /// Unpublish a single item
    pub async fn unpublish(
        &self,
        item: &mut C,
        actor: ActorId,
    ) -> Result<TransitionReport, PublishingError> {
        let (journal, started) = Self::begin(TransitionOperation::Unpublish)?;
        let accepted = self
            .strategy
            .unpublish(item, actor)
            .inspect_err(|e| Self::log_transition_error(TransitionOperation::Unpublish, e))?;

        let item: &C = item;
        let outcome = Self::single_outcome(accepted);
        self.complete(journal, started, &outcome, std::slice::from_ref(item), |_| {
            self.strategy.unpublishing_finalized(item)
        })
        .await
    }

    /// Unpublish a batch of items
    pub async fn unpublish_many(
        &self,
        items: &mut [C],
        actor: ActorId,
    ) -> Result<TransitionReport, PublishingError> {
        let (journal, started) = Self::begin(TransitionOperation::UnpublishMany)?;
        let outcome = self
            .strategy
            .unpublish_many_outcome(items, actor)
            .inspect_err(|e| Self::log_transition_error(TransitionOperation::UnpublishMany, e))?;

        let items: &[C] = items;
        self.complete(journal, started, &outcome, items, |committed| {
            self.strategy.unpublishing_finalized_many(committed)
        })
        .await
    }

    async fn publish_batch(
        &self,
        operation: TransitionOperation,
        items: &mut [C],
        actor: ActorId,
        is_all_republished: bool,
    ) -> Result<TransitionReport, PublishingError> {
        let (journal, started) = Self::begin(operation)?;
        let outcome = self
            .strategy
            .publish_with_descendants_outcome(items, actor)
            .inspect_err(|e| Self::log_transition_error(operation, e))?;

        let items: &[C] = items;
        self.complete(journal, started, &outcome, items, |committed| {
            self.strategy
                .publishing_finalized_many(committed, is_all_republished)
        })
        .await
    }

    fn begin(operation: TransitionOperation) -> Result<(TransitionJournal, Instant), PublishingError> {
        let mut journal = TransitionJournal::new(operation);
        journal.transition(TransitionStage::Transitioning, None)?;
        Ok((journal, Instant::now()))
    }

    fn single_outcome(accepted: bool) -> BatchOutcome {
        if accepted {
            BatchOutcome::all(1)
        } else {
            BatchOutcome::new(1)
        }
    }

    fn log_transition_error(operation: TransitionOperation, error: &PublishingError) {
        warn!(%operation, code = error.code(), error = %error, "transition aborted");
    }

    /// Commit the transitioned items, then finalize them
    ///
    /// Nothing is committed when the strategy refused every item of a
    /// non-empty call.
    async fn complete<F>(
        &self,
        mut journal: TransitionJournal,
        started: Instant,
        outcome: &BatchOutcome,
        items: &[C],
        finalize: F,
    ) -> Result<TransitionReport, PublishingError>
    where
        F: FnOnce(&[&C]) -> Result<(), PublishingError>,
    {
        let operation = journal.get_operation();

        if outcome.is_none() && !outcome.is_complete() {
            journal.transition(TransitionStage::Rejected, None)?;
            info!(%operation, items = items.len(), "transition rejected; nothing committed");
            return Ok(Self::report(&journal, started, outcome));
        }

        let committed = outcome.select(items);
        let mut metadata = HashMap::new();
        metadata.insert("transitioned".to_string(), json!(committed.len()));
        metadata.insert("refused".to_string(), json!(outcome.refused()));
        journal.transition(TransitionStage::Transitioned, Some(metadata))?;
        if outcome.refused() > 0 {
            info!(
                %operation,
                transitioned = committed.len(),
                refused = outcome.refused(),
                "committing the transitioned part of the batch"
            );
        }

        journal.transition(TransitionStage::Committing, None)?;
        let unit_of_work = &self.unit_of_work;
        if let Err(e) = self.retry.retry(|| unit_of_work.commit(&committed)).await {
            let message = format!("{:#}", e);
            journal.fail(message.clone())?;
            warn!(%operation, error = %message, "commit failed; finalization skipped");
            return Err(PublishingError::CommitFailed { operation, message });
        }
        journal.transition(TransitionStage::Committed, None)?;

        Self::run_finalization(&mut journal, &committed, finalize)?;

        let report = Self::report(&journal, started, outcome);
        info!(
            %operation,
            items = report.item_count,
            committed = report.committed_count,
            duration_ms = report.duration,
            "transition finalized"
        );
        Ok(report)
    }

    /// Raise finalization for committed items
    ///
    /// Refuses to run `finalize` unless the journal has recorded the commit.
    fn run_finalization<F>(
        journal: &mut TransitionJournal,
        committed: &[&C],
        finalize: F,
    ) -> Result<(), PublishingError>
    where
        F: FnOnce(&[&C]) -> Result<(), PublishingError>,
    {
        journal.ensure_committed()?;

        if let Err(e) = finalize(committed) {
            let operation = journal.get_operation();
            journal.fail(e.to_string())?;
            warn!(%operation, code = e.code(), error = %e, "finalization failed after commit");
            return Err(e);
        }
        journal.transition(TransitionStage::Finalized, None)
    }

    fn report(
        journal: &TransitionJournal,
        started: Instant,
        outcome: &BatchOutcome,
    ) -> TransitionReport {
        let stage = journal.get_stage();
        let finalized = stage == TransitionStage::Finalized;
        TransitionReport {
            operation: journal.get_operation(),
            accepted: outcome.is_complete(),
            finalized,
            item_count: outcome.total(),
            committed_count: if finalized {
                outcome.transitioned().len()
            } else {
                0
            },
            stage,
            duration: started.elapsed().as_millis() as u64,
            journal: journal.snapshot(),
        }
    }
}
