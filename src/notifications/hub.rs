//! Notification hub - observer registrations per notification kind
//!
//! Each kind owns a copy-on-write list of subscribers. Dispatch loads a
//! snapshot of the list and walks it without holding any lock, so observers
//! may subscribe or unsubscribe from inside a callback; the change applies
//! from the next emission on.
//!
//! # Example
//!
//! ```
//! use content_publishing::notifications::NotificationHub;
//! use content_publishing::core::NotificationKind;
//!
//! let hub: NotificationHub<String> = NotificationHub::new();
//! let handle = hub.on_post_publish(|subject, _args| {
//!     for item in subject.items() {
//!         println!("published {}", item);
//!     }
//!     Ok(())
//! });
//!
//! assert_eq!(hub.subscriber_count(NotificationKind::PostPublish), 1);
//! assert!(hub.unsubscribe(handle));
//! ```

use crate::core::error::PublishingError;
use crate::core::events::{NotificationKind, PublishingEventArgs, Subject};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

/// Observer callback
///
/// Returning an error aborts the rest of the dispatch for that emission.
pub type Handler<C> =
    Arc<dyn Fn(Subject<'_, C>, &mut PublishingEventArgs) -> anyhow::Result<()> + Send + Sync>;

/// Handle returned by [`NotificationHub::subscribe`], used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
    kind: NotificationKind,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> NotificationKind {
        self.kind
    }
}

struct Subscriber<C> {
    id: u64,
    handler: Handler<C>,
}

impl<C> Clone for Subscriber<C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
        }
    }
}

/// Registry of observers for every notification kind
pub struct NotificationHub<C> {
    channels: [ArcSwap<Vec<Subscriber<C>>>; 6],
    write_lock: Mutex<()>,
    next_id: AtomicU64,
}

impl<C> Default for NotificationHub<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for NotificationHub<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in NotificationKind::ALL {
            map.entry(&kind.as_str(), &self.subscriber_count(kind));
        }
        map.finish()
    }
}

impl<C> NotificationHub<C> {
    pub fn new() -> Self {
        Self {
            channels: std::array::from_fn(|_| ArcSwap::from_pointee(Vec::new())),
            write_lock: Mutex::new(()),
            next_id: AtomicU64::new(1),
        }
    }

    fn channel(&self, kind: NotificationKind) -> &ArcSwap<Vec<Subscriber<C>>> {
        &self.channels[kind.slot()]
    }

    /// Register an observer; it runs after every observer registered before it
    pub fn subscribe<F>(&self, kind: NotificationKind, handler: F) -> SubscriptionHandle
    where
        F: Fn(Subject<'_, C>, &mut PublishingEventArgs) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        let _guard = self.write_lock.lock();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let channel = self.channel(kind);
        let mut subscribers: Vec<Subscriber<C>> = channel.load().iter().cloned().collect();
        subscribers.push(Subscriber {
            id,
            handler: Arc::new(handler),
        });
        let count = subscribers.len();
        channel.store(Arc::new(subscribers));

        debug!(kind = %kind, subscription = id, subscribers = count, "observer subscribed");
        SubscriptionHandle { id, kind }
    }

    /// Remove an observer
    ///
    /// Returns `false` if the handle was already removed.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let _guard = self.write_lock.lock();

        let channel = self.channel(handle.kind);
        let current = channel.load();
        if !current.iter().any(|s| s.id == handle.id) {
            return false;
        }

        let remaining: Vec<Subscriber<C>> = current
            .iter()
            .filter(|s| s.id != handle.id)
            .cloned()
            .collect();
        channel.store(Arc::new(remaining));

        debug!(kind = %handle.kind, subscription = handle.id, "observer unsubscribed");
        true
    }

    pub fn subscriber_count(&self, kind: NotificationKind) -> usize {
        self.channel(kind).load().len()
    }

    pub fn is_empty(&self) -> bool {
        NotificationKind::ALL
            .iter()
            .all(|kind| self.subscriber_count(*kind) == 0)
    }

    /// Remove every observer of one kind
    pub fn clear(&self, kind: NotificationKind) {
        let _guard = self.write_lock.lock();
        self.channel(kind).store(Arc::new(Vec::new()));
    }

    /// Remove every observer (teardown)
    pub fn clear_all(&self) {
        let _guard = self.write_lock.lock();
        for channel in &self.channels {
            channel.store(Arc::new(Vec::new()));
        }
    }

    /// Invoke the observers of `kind` in registration order
    ///
    /// The first observer error stops the walk and is returned. A panicking
    /// observer unwinds through this call.
    pub(crate) fn dispatch(
        &self,
        kind: NotificationKind,
        subject: Subject<'_, C>,
        args: &mut PublishingEventArgs,
    ) -> Result<(), PublishingError> {
        let subscribers = self.channel(kind).load_full();

        if subscribers.is_empty() {
            trace!(kind = %kind, "no observers registered");
            return Ok(());
        }

        debug!(
            kind = %kind,
            subscribers = subscribers.len(),
            items = subject.len(),
            correlation_id = %args.correlation_id,
            "dispatching notification"
        );

        for subscriber in subscribers.iter() {
            if let Err(source) = (subscriber.handler)(subject, &mut *args) {
                warn!(
                    kind = %kind,
                    subscription = subscriber.id,
                    error = %source,
                    "observer failed, aborting dispatch"
                );
                return Err(PublishingError::ObserverFailed {
                    kind,
                    subscription: subscriber.id,
                    source,
                });
            }
        }

        Ok(())
    }

    pub fn on_pre_publish<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(Subject<'_, C>, &mut PublishingEventArgs) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.subscribe(NotificationKind::PrePublish, handler)
    }

    pub fn on_post_publish<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(Subject<'_, C>, &mut PublishingEventArgs) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.subscribe(NotificationKind::PostPublish, handler)
    }

    pub fn on_pre_unpublish<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(Subject<'_, C>, &mut PublishingEventArgs) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.subscribe(NotificationKind::PreUnpublish, handler)
    }

    pub fn on_post_unpublish<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(Subject<'_, C>, &mut PublishingEventArgs) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.subscribe(NotificationKind::PostUnpublish, handler)
    }

    pub fn on_publish_finalized<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(Subject<'_, C>, &mut PublishingEventArgs) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.subscribe(NotificationKind::PublishFinalized, handler)
    }

    pub fn on_unpublish_finalized<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(Subject<'_, C>, &mut PublishingEventArgs) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.subscribe(NotificationKind::UnpublishFinalized, handler)
    }
}
