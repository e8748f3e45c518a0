//! Remote invocation seam.
//!
//! A [`RemoteInvoker`] performs the actual network call for an action. Each
//! invocation completes in two independent phases: a local storage commit and
//! the HTTP exchange. Callers choose which phases to await; in HTTP-only mode
//! the storage phase is a best-effort side channel whose outcome is
//! deliberately discarded via [`Invocation::detach_storage_phase`].

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::trace;

use crate::types::ActionDescriptor;

/// Errors produced by either invocation phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    /// The request never completed (connection reset, DNS failure, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with a non-success status.
    #[error("remote returned status {0}")]
    Status(u16),

    /// The invoker dropped the phase without resolving it.
    #[error("invocation aborted before completion")]
    Aborted,
}

/// Options for a single invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvokeOptions {
    /// Await only the network exchange; the storage phase is fire-and-forget.
    pub http_only: bool,
}

impl InvokeOptions {
    /// Options for an HTTP-only invocation.
    pub fn http_only() -> Self {
        Self { http_only: true }
    }
}

/// One phase of an invocation, resolved exactly once by the invoker.
pub struct CompletionSignal(oneshot::Receiver<Result<(), InvokeError>>);

impl CompletionSignal {
    /// Wait for the phase to finish. A dropped sender counts as aborted.
    pub async fn wait(self) -> Result<(), InvokeError> {
        self.0.await.unwrap_or(Err(InvokeError::Aborted))
    }
}

/// Sender half handed to invoker implementations; resolves the two phases
/// independently. Resolving a phase twice is a no-op.
pub struct InvocationSender {
    storage: Option<oneshot::Sender<Result<(), InvokeError>>>,
    network: Option<oneshot::Sender<Result<(), InvokeError>>>,
}

impl InvocationSender {
    /// Resolve the storage phase.
    pub fn storage_done(&mut self, result: Result<(), InvokeError>) {
        if let Some(tx) = self.storage.take() {
            let _ = tx.send(result);
        }
    }

    /// Resolve the network phase.
    pub fn network_done(&mut self, result: Result<(), InvokeError>) {
        if let Some(tx) = self.network.take() {
            let _ = tx.send(result);
        }
    }
}

/// An in-flight invocation with its two completion signals.
pub struct Invocation {
    storage: Option<CompletionSignal>,
    network: CompletionSignal,
}

impl Invocation {
    /// Create an invocation and the sender half that resolves its phases.
    pub fn channel() -> (Self, InvocationSender) {
        let (storage_tx, storage_rx) = oneshot::channel();
        let (network_tx, network_rx) = oneshot::channel();
        (
            Self {
                storage: Some(CompletionSignal(storage_rx)),
                network: CompletionSignal(network_rx),
            },
            InvocationSender {
                storage: Some(storage_tx),
                network: Some(network_tx),
            },
        )
    }

    /// An invocation whose phases have both already succeeded.
    pub fn resolved() -> Self {
        let (invocation, mut sender) = Self::channel();
        sender.storage_done(Ok(()));
        sender.network_done(Ok(()));
        invocation
    }

    /// Detach the storage phase: drain it in the background and discard the
    /// outcome. After this, only the network phase remains awaitable.
    pub fn detach_storage_phase(&mut self) {
        if let Some(signal) = self.storage.take() {
            tokio::spawn(async move {
                if let Err(error) = signal.wait().await {
                    trace!(%error, "storage phase failed; outcome intentionally discarded");
                }
            });
        }
    }

    /// Take the storage-phase signal for awaiting, if still attached.
    pub fn storage_phase(&mut self) -> Option<CompletionSignal> {
        self.storage.take()
    }

    /// Wait for the network exchange to finish.
    pub async fn network(self) -> Result<(), InvokeError> {
        self.network.wait().await
    }
}

/// Performs remote calls for pending actions.
#[async_trait]
pub trait RemoteInvoker: Send + Sync {
    /// Start the remote call for `action` against the loaded `instance`.
    ///
    /// The returned [`Invocation`] resolves its phases as the call progresses;
    /// either phase may fail without affecting the other.
    async fn invoke(
        &self,
        action: &ActionDescriptor,
        params: &Value,
        instance: &Value,
        options: InvokeOptions,
    ) -> Invocation;
}
