//! Scheduler engine for deferred remote actions.
//!
//! This module provides the reconciliation loop that replays pending
//! actions when connectivity returns and re-attempts delivery on a fixed
//! interval while online.

mod engine;

pub use engine::{ActionScheduler, SchedulerError};
