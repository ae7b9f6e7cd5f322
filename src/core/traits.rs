//! Core traits and types for content publishing
//!
//! This module defines the content item abstraction and the strategy
//! contract every concrete publish / unpublish implementation provides.

use crate::core::error::PublishingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

// ============================================================================
// Actor
// ============================================================================

/// Identifier of whoever initiated a transition
///
/// The coordinator never interprets it; it is carried on event payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(i64);

impl ActorId {
    /// Actor used for system-initiated transitions (scheduled releases, full republish)
    pub const SYSTEM: ActorId = ActorId(0);

    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor:{}", self.0)
    }
}

// ============================================================================
// Content
// ============================================================================

/// An identity-bearing unit of content undergoing a transition
///
/// Only identity is required; everything else about the item belongs to the
/// strategy that transitions it.
pub trait ContentItem: Send + Sync {
    type Id: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync;

    fn id(&self) -> Self::Id;
}

// ============================================================================
// Batch outcome
// ============================================================================

/// Which items of a batch the strategy actually transitioned
///
/// Indices refer to the input slice and are kept in input order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    transitioned: Vec<usize>,
    total: usize,
}

impl BatchOutcome {
    /// Outcome for a batch of `total` items, none transitioned yet
    pub fn new(total: usize) -> Self {
        Self {
            transitioned: Vec::new(),
            total,
        }
    }

    /// Every item transitioned
    pub fn all(total: usize) -> Self {
        Self {
            transitioned: (0..total).collect(),
            total,
        }
    }

    /// Record the item at `index` as transitioned
    ///
    /// Indices must be recorded in ascending order; out of range or repeated
    /// indices are ignored.
    pub fn record(&mut self, index: usize) {
        if index < self.total && self.transitioned.last().is_none_or(|last| *last < index) {
            self.transitioned.push(index);
        }
    }

    pub fn transitioned(&self) -> &[usize] {
        &self.transitioned
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of items left untouched
    pub fn refused(&self) -> usize {
        self.total - self.transitioned.len()
    }

    /// Every item transitioned (true for an empty batch)
    pub fn is_complete(&self) -> bool {
        self.transitioned.len() == self.total
    }

    /// No item transitioned
    pub fn is_none(&self) -> bool {
        self.transitioned.is_empty()
    }

    /// The transitioned items, in input order
    pub fn select<'a, C>(&self, items: &'a [C]) -> Vec<&'a C> {
        self.transitioned
            .iter()
            .filter_map(|index| items.get(*index))
            .collect()
    }
}

// ============================================================================
// Strategy
// ============================================================================

/// Contract for publish / unpublish transitions
///
/// Every `bool` result reports whether the in-memory transition was
/// accepted. It says nothing about persistence: the caller commits, then calls
/// the matching `*_finalized` operation exactly once per commit.
///
/// Implementations must honor a veto set on a pre notification payload by
/// skipping the mutation and returning `Ok(false)` for that item.
///
/// An `Err` means an observer failed (or the implementation's own
/// bookkeeping did); the rest of that dispatch did not run.
pub trait PublishingStrategy<C: ContentItem>: Send + Sync {
    /// Publish a single item
    fn publish(&self, item: &mut C, actor: ActorId) -> Result<bool, PublishingError>;

    /// Publish a batch made of root items each followed by their descendants
    ///
    /// What counts as a descendant, and whether a failed ancestor stops its
    /// descendants, is up to the implementation.
    fn publish_with_descendants(
        &self,
        items: &mut [C],
        actor: ActorId,
    ) -> Result<bool, PublishingError>;

    /// Same as [`publish_with_descendants`](Self::publish_with_descendants),
    /// reporting which items transitioned
    ///
    /// The default can only tell "all" from "none"; strategies that may
    /// transition part of a batch must override it.
    fn publish_with_descendants_outcome(
        &self,
        items: &mut [C],
        actor: ActorId,
    ) -> Result<BatchOutcome, PublishingError> {
        let total = items.len();
        if self.publish_with_descendants(items, actor)? {
            Ok(BatchOutcome::all(total))
        } else {
            Ok(BatchOutcome::new(total))
        }
    }

    /// Unpublish a single item
    fn unpublish(&self, item: &mut C, actor: ActorId) -> Result<bool, PublishingError>;

    /// Unpublish a batch of items
    fn unpublish_many(&self, items: &mut [C], actor: ActorId) -> Result<bool, PublishingError>;

    /// Same as [`unpublish_many`](Self::unpublish_many), reporting which items
    /// transitioned; override when part of a batch may be refused
    fn unpublish_many_outcome(
        &self,
        items: &mut [C],
        actor: ActorId,
    ) -> Result<BatchOutcome, PublishingError> {
        let total = items.len();
        if self.unpublish_many(items, actor)? {
            Ok(BatchOutcome::all(total))
        } else {
            Ok(BatchOutcome::new(total))
        }
    }

    /// Signal that a published item has been durably committed
    fn publishing_finalized(&self, item: &C) -> Result<(), PublishingError>;

    /// Signal that a published batch has been durably committed
    ///
    /// `is_all_republished` tells observers the batch is the entire content
    /// set, so per-item cache updates can be replaced with a rebuild.
    fn publishing_finalized_many(
        &self,
        items: &[&C],
        is_all_republished: bool,
    ) -> Result<(), PublishingError>;

    /// Signal that an unpublished item has been durably committed
    fn unpublishing_finalized(&self, item: &C) -> Result<(), PublishingError>;

    /// Signal that an unpublished batch has been durably committed
    fn unpublishing_finalized_many(&self, items: &[&C]) -> Result<(), PublishingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_display() {
        assert_eq!(ActorId::new(42).to_string(), "actor:42");
        assert_eq!(ActorId::SYSTEM.value(), 0);
    }

    #[test]
    fn test_batch_outcome_selects_in_input_order() {
        let items = ["home", "drafts", "about"];
        let mut outcome = BatchOutcome::new(items.len());
        outcome.record(0);
        outcome.record(2);
        outcome.record(2);
        outcome.record(7);

        assert_eq!(outcome.transitioned(), &[0, 2]);
        assert_eq!(outcome.refused(), 1);
        assert!(!outcome.is_complete());
        assert_eq!(outcome.select(&items), vec![&"home", &"about"]);
    }

    #[test]
    fn test_batch_outcome_all_and_empty() {
        assert!(BatchOutcome::all(3).is_complete());
        assert!(BatchOutcome::new(2).is_none());
        assert!(BatchOutcome::new(0).is_complete());
    }

    #[test]
    fn test_actor_id_serialization() {
        let json = serde_json::to_string(&ActorId::new(5)).unwrap();
        assert_eq!(json, "5");

        let deserialized: ActorId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, ActorId::new(5));
    }
}
