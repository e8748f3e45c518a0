//! Testing utilities for users of the outbox library.
//!
//! This module provides helpers for testing offline replay:
//!
//! - [`MockInvoker`]: a remote invoker that records every call and fails a
//!   configurable number of times before succeeding
//! - [`RecordingCache`]: a result cache that captures invalidation batches
//!
//! These are safe for concurrent use; counters are mutex-guarded so behavior
//! stays deterministic under the scheduler's fan-out.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::cache::ResultCache;
use crate::invoker::{Invocation, InvokeError, InvokeOptions, RemoteInvoker};
use crate::types::{ActionDescriptor, TargetParams};

/// One recorded call to [`MockInvoker::invoke`].
#[derive(Debug, Clone)]
pub struct RecordedInvocation {
    /// The action descriptor the scheduler passed.
    pub action: ActionDescriptor,
    /// Request parameters from the pending-action record.
    pub http_params: Value,
    /// The instance snapshot loaded from storage.
    pub instance: Value,
    /// Invocation options (the scheduler always sets `http_only`).
    pub options: InvokeOptions,
}

/// Internal state for MockInvoker, protected by a mutex.
struct MockInvokerState {
    invocations: Vec<RecordedInvocation>,
    network_failures_remaining: u32,
}

/// A remote invoker that records invocations and fails the network phase a
/// configurable number of times before succeeding.
///
/// # Example
///
/// ```
/// use outbox::testing::MockInvoker;
///
/// // Network phase fails twice, then succeeds on the 3rd attempt
/// let invoker = MockInvoker::failing(2);
/// ```
pub struct MockInvoker {
    state: Mutex<MockInvokerState>,
    delay: Option<Duration>,
    fail_storage_phase: bool,
}

impl MockInvoker {
    /// Create an invoker whose phases always succeed.
    pub fn new() -> Self {
        Self::failing(0)
    }

    /// Create an invoker whose network phase fails `times` times, then
    /// succeeds.
    pub fn failing(times: u32) -> Self {
        Self {
            state: Mutex::new(MockInvokerState {
                invocations: Vec::new(),
                network_failures_remaining: times,
            }),
            delay: None,
            fail_storage_phase: false,
        }
    }

    /// Builder: delay both phases by `delay` after each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Builder: make the storage phase always fail.
    ///
    /// The scheduler discards storage-phase outcomes, so delivery should
    /// proceed unaffected; tests use this to assert exactly that.
    pub fn with_storage_failure(mut self) -> Self {
        self.fail_storage_phase = true;
        self
    }

    /// Number of calls made so far.
    pub async fn invocation_count(&self) -> usize {
        self.state.lock().await.invocations.len()
    }

    /// All recorded calls, in order.
    pub async fn invocations(&self) -> Vec<RecordedInvocation> {
        self.state.lock().await.invocations.clone()
    }
}

impl Default for MockInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteInvoker for MockInvoker {
    async fn invoke(
        &self,
        action: &ActionDescriptor,
        params: &Value,
        instance: &Value,
        options: InvokeOptions,
    ) -> Invocation {
        let fail_network = {
            let mut state = self.state.lock().await;
            state.invocations.push(RecordedInvocation {
                action: action.clone(),
                http_params: params.clone(),
                instance: instance.clone(),
                options,
            });
            if state.network_failures_remaining > 0 {
                state.network_failures_remaining -= 1;
                true
            } else {
                false
            }
        };

        let (invocation, mut sender) = Invocation::channel();
        let delay = self.delay;
        let fail_storage = self.fail_storage_phase;

        tokio::spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            sender.storage_done(if fail_storage {
                Err(InvokeError::Transport("local commit unavailable".into()))
            } else {
                Ok(())
            });

            sender.network_done(if fail_network {
                Err(InvokeError::Transport("connection reset".into()))
            } else {
                Ok(())
            });
        });

        invocation
    }
}

/// A result cache that records every invalidation batch it receives.
pub struct RecordingCache {
    batches: Mutex<Vec<Vec<TargetParams>>>,
}

impl RecordingCache {
    /// Create an empty recording cache.
    pub fn new() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Every invalidation batch received so far, in order.
    pub async fn batches(&self) -> Vec<Vec<TargetParams>> {
        self.batches.lock().await.clone()
    }

    /// All invalidated targets, flattened across batches.
    pub async fn invalidated(&self) -> Vec<TargetParams> {
        self.batches.lock().await.iter().flatten().cloned().collect()
    }
}

impl Default for RecordingCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultCache for RecordingCache {
    async fn invalidate(&self, targets: &[TargetParams]) {
        self.batches.lock().await.push(targets.to_vec());
    }
}
