//! Unit of work - the durable commit a session waits for before finalizing

use crate::core::traits::ContentItem;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Persists transitioned items
///
/// `Ok(())` means the items are durable; only then may finalization run.
/// Errors whose message names a transient condition (deadlock, timeout,
/// database busy) are retried by the session. `items` holds only what the
/// strategy transitioned, in input order.
#[async_trait]
pub trait UnitOfWork<C: ContentItem>: Send + Sync {
    async fn commit(&self, items: &[&C]) -> anyhow::Result<()>;
}

/// Unit of work backed by an in-process map
///
/// Keeps the latest committed copy of every item.
pub struct InMemoryUnitOfWork<C: ContentItem> {
    store: RwLock<HashMap<C::Id, C>>,
    commits: AtomicU64,
}

impl<C: ContentItem> Default for InMemoryUnitOfWork<C> {
    fn default() -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
            commits: AtomicU64::new(0),
        }
    }
}

impl<C: ContentItem + Clone> InMemoryUnitOfWork<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &C::Id) -> Option<C> {
        self.store.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<C: ContentItem + Clone> UnitOfWork<C> for InMemoryUnitOfWork<C> {
    async fn commit(&self, items: &[&C]) -> anyhow::Result<()> {
        let mut store = self.store.write();
        for &item in items {
            store.insert(item.id(), item.clone());
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
