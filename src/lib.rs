//! Content publishing coordinator
//!
//! Sequences the notifications raised around publish / unpublish transitions
//! and the finalization signal that follows a durable commit.
//!
//! ```
//! use content_publishing::{
//!     ActorId, Content, DefaultPublishingStrategy, NotificationHub, PublishingStrategy,
//! };
//! use std::sync::Arc;
//!
//! let hub: Arc<NotificationHub<Content>> = Arc::new(NotificationHub::new());
//! hub.on_pre_publish(|subject, args| {
//!     if subject.items().any(|c: &Content| c.name == "Draft") {
//!         args.cancel();
//!     }
//!     Ok(())
//! });
//!
//! let strategy = DefaultPublishingStrategy::new(hub);
//! let mut draft = Content::new(1, "Draft");
//! assert!(!strategy.publish(&mut draft, ActorId::SYSTEM).unwrap());
//! ```

pub mod core;
pub mod notifications;
pub mod orchestration;
pub mod strategies;

pub use crate::core::*;
pub use notifications::{NotificationHub, PublishingNotifier, SubscriptionHandle};
pub use orchestration::{InMemoryUnitOfWork, PublishingSession, TransitionReport, UnitOfWork};
pub use strategies::{
    Content, DefaultPublishingStrategy, FinalizationHook, PublishableContent, PublishedCache,
    PublishedState,
};
