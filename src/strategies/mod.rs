//! Concrete publishing strategy and its collaborators

pub mod cache;
pub mod content;
pub mod default_strategy;
pub mod hooks;

pub use cache::PublishedCache;
pub use content::{Content, PublishBlocker, PublishableContent, PublishedState};
pub use default_strategy::DefaultPublishingStrategy;
pub use hooks::FinalizationHook;
