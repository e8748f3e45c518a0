//! Lifecycle events and event handling.
//!
//! The scheduler emits events as actions are queued, delivered, discarded or
//! deferred, enabling observability into the replay machinery without
//! coupling it to any particular sink.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::keys::ActionKey;
use crate::types::TargetParams;

/// Lifecycle events emitted by the scheduler.
#[derive(Debug, Clone)]
pub enum Event {
    /// A pending action was persisted for later delivery.
    ActionQueued { key: ActionKey, timestamp: Instant },

    /// A pending action reached the remote; its stored state was cleaned up.
    ActionCompleted {
        params: TargetParams,
        timestamp: Instant,
    },

    /// A pending action was dropped because its instance snapshot no longer
    /// exists. It was never invoked.
    ActionDiscarded { key: ActionKey, timestamp: Instant },

    /// A delivery attempt failed; the action stays queued for the next cycle.
    ActionDeferred {
        key: ActionKey,
        error: String,
        timestamp: Instant,
    },

    /// A reconciliation pass finished.
    PassCompleted {
        /// Pending actions found at the start of the pass.
        attempted: usize,
        /// Actions whose network exchange succeeded during the pass.
        completed: usize,
        timestamp: Instant,
    },
}

impl Event {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> Instant {
        match self {
            Event::ActionQueued { timestamp, .. } => *timestamp,
            Event::ActionCompleted { timestamp, .. } => *timestamp,
            Event::ActionDiscarded { timestamp, .. } => *timestamp,
            Event::ActionDeferred { timestamp, .. } => *timestamp,
            Event::PassCompleted { timestamp, .. } => *timestamp,
        }
    }

    /// Create an ActionQueued event.
    pub fn action_queued(key: ActionKey) -> Self {
        Event::ActionQueued {
            key,
            timestamp: Instant::now(),
        }
    }

    /// Create an ActionCompleted event.
    pub fn action_completed(params: TargetParams) -> Self {
        Event::ActionCompleted {
            params,
            timestamp: Instant::now(),
        }
    }

    /// Create an ActionDiscarded event.
    pub fn action_discarded(key: ActionKey) -> Self {
        Event::ActionDiscarded {
            key,
            timestamp: Instant::now(),
        }
    }

    /// Create an ActionDeferred event.
    pub fn action_deferred(key: ActionKey, error: impl Into<String>) -> Self {
        Event::ActionDeferred {
            key,
            error: error.into(),
            timestamp: Instant::now(),
        }
    }

    /// Create a PassCompleted event.
    pub fn pass_completed(attempted: usize, completed: usize) -> Self {
        Event::PassCompleted {
            attempted,
            completed,
            timestamp: Instant::now(),
        }
    }
}

/// Handler for receiving lifecycle events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: &Event);
}

/// Event bus for distributing events to registered handlers.
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    /// Create a new event bus with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register an event handler.
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        handlers.push(handler);
    }

    /// Emit an event to all registered handlers.
    pub async fn emit(&self, event: Event) {
        let handlers = self.handlers.read().await;
        for handler in handlers.iter() {
            handler.handle(&event).await;
        }
    }

    /// Get the number of registered handlers.
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
