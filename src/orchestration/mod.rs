//! Orchestration layer for publishing transitions
//!
//! Couples a strategy with the unit of work that persists its result, and
//! sequences commit and finalization.

pub mod publishing_session;
pub mod unit_of_work;

pub use publishing_session::{PublishingSession, TransitionReport};
pub use unit_of_work::{InMemoryUnitOfWork, UnitOfWork};
