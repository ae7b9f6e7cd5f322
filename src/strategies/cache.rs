//! In-process cache of published content

use crate::core::traits::ContentItem;
use crate::strategies::hooks::FinalizationHook;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Published content keyed by id
///
/// Updated from finalization hooks, so it only ever reflects committed
/// transitions. A full republish rebuilds it from scratch.
pub struct PublishedCache<C: ContentItem> {
    entries: RwLock<HashMap<C::Id, C>>,
    rebuilds: AtomicU64,
}

impl<C: ContentItem> Default for PublishedCache<C> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            rebuilds: AtomicU64::new(0),
        }
    }
}

impl<C: ContentItem + Clone> PublishedCache<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &C::Id) -> Option<C> {
        self.entries.read().get(id).cloned()
    }

    pub fn contains(&self, id: &C::Id) -> bool {
        self.entries.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Number of full rebuilds triggered by republish-all
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds.load(Ordering::Relaxed)
    }
}

impl<C: ContentItem + Clone> FinalizationHook<C> for PublishedCache<C> {
    fn name(&self) -> &str {
        "published-cache"
    }

    fn on_published(&self, items: &[&C], is_all_republished: bool) -> anyhow::Result<()> {
        let mut entries = self.entries.write();
        if is_all_republished {
            entries.clear();
            self.rebuilds.fetch_add(1, Ordering::Relaxed);
        }
        for item in items {
            entries.insert(item.id(), (*item).clone());
        }
        debug!(
            items = items.len(),
            rebuild = is_all_republished,
            cached = entries.len(),
            "published cache updated"
        );
        Ok(())
    }

    fn on_unpublished(&self, items: &[&C]) -> anyhow::Result<()> {
        let mut entries = self.entries.write();
        for item in items {
            entries.remove(&item.id());
        }
        debug!(items = items.len(), cached = entries.len(), "published cache pruned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::content::Content;

    #[test]
    fn test_upsert_and_remove() {
        let cache: PublishedCache<Content> = PublishedCache::new();
        let home = Content::new(1, "Home");
        let about = Content::new(2, "About");

        cache.on_published(&[&home, &about], false).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&2).unwrap().name, "About");

        let renamed = Content::new(2, "About us");
        cache.on_published(&[&renamed], false).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&2).unwrap().name, "About us");

        cache.on_unpublished(&[&home]).unwrap();
        assert!(!cache.contains(&1));
        assert_eq!(cache.rebuild_count(), 0);
    }

    #[test]
    fn test_republish_all_rebuilds() {
        let cache: PublishedCache<Content> = PublishedCache::new();
        let stale = Content::new(99, "Stale");
        cache.on_published(&[&stale], false).unwrap();

        let home = Content::new(1, "Home");
        cache.on_published(&[&home], true).unwrap();

        assert!(!cache.contains(&99));
        assert!(cache.contains(&1));
        assert_eq!(cache.rebuild_count(), 1);
    }
}
