//! Bookkeeping run by a strategy before it raises a finalization signal

use crate::core::traits::ContentItem;

/// Work that must complete before observers hear about a durable commit
///
/// Typical hooks refresh a published-content cache or an index. A hook error
/// stops the finalization: later hooks and the finalized notification are
/// skipped.
pub trait FinalizationHook<C: ContentItem>: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    fn on_published(&self, items: &[&C], is_all_republished: bool) -> anyhow::Result<()>;

    fn on_unpublished(&self, items: &[&C]) -> anyhow::Result<()>;
}
