//! Observer registration and notification dispatch
//!
//! [`NotificationHub`] is where observers register; [`PublishingNotifier`] is
//! what strategies call to raise notifications.

pub mod hub;
pub mod notifier;

pub use hub::{Handler, NotificationHub, SubscriptionHandle};
pub use notifier::PublishingNotifier;
