//! Scheduler engine implementation.
//!
//! The scheduler is responsible for:
//! - Persisting deferred actions while the client is offline
//! - Replaying every pending action when connectivity returns
//! - Re-attempting delivery on a fixed interval while online
//! - Cleaning up stored state for delivered and stale actions
//! - Event emission

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::config::SchedulerConfig;
use crate::events::{Event, EventBus};
use crate::invoker::{InvokeOptions, RemoteInvoker};
use crate::keys::{ActionKey, action_key, instance_key, is_action_key};
use crate::network::NetworkMonitor;
use crate::store::{ActionStore, StoreError};
use crate::types::{PendingAction, TargetParams};

/// Errors surfaced by the queue-management API.
///
/// Reconciliation itself never fails outward; failures inside a pass are
/// logged and contained per action.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Storage operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A persisted action record could not be decoded.
    #[error("corrupt pending action at {key}: {reason}")]
    CorruptRecord { key: String, reason: String },
}

/// Durable retry scheduler for actions that must eventually reach a remote
/// service.
///
/// Pending actions are persisted in the [`ActionStore`]; whenever the
/// [`NetworkMonitor`] reports a transition to online the scheduler replays
/// all of them, and while online it re-attempts delivery on the configured
/// interval. Delivered actions have their stored record and dependent
/// instance snapshot deleted, and the [`ResultCache`] is invalidated for the
/// affected targets in one bulk call per pass.
///
/// The scheduler is cheap to clone; all clones share the same state.
pub struct ActionScheduler<S, R, C> {
    inner: Arc<Inner<S, R, C>>,
}

impl<S, R, C> Clone for ActionScheduler<S, R, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S, R, C> {
    config: SchedulerConfig,
    store: Arc<S>,
    invoker: Arc<R>,
    cache: Arc<C>,
    network: NetworkMonitor,
    event_bus: Arc<EventBus>,
    /// Retry timer task; present iff the last observed network state was online.
    timer: Mutex<Option<JoinHandle<()>>>,
    /// Connectivity driver task, spawned by `start`.
    driver: Mutex<Option<JoinHandle<()>>>,
    /// Single-flight guard: at most one reconciliation pass at a time.
    pass_lock: Mutex<()>,
}

impl<S, R, C> ActionScheduler<S, R, C>
where
    S: ActionStore + 'static,
    R: RemoteInvoker + 'static,
    C: ResultCache + 'static,
{
    /// Create a new scheduler owning its collaborators.
    pub fn new(
        config: SchedulerConfig,
        store: S,
        invoker: R,
        cache: C,
        network: NetworkMonitor,
    ) -> Self {
        Self::with_shared(
            config,
            Arc::new(store),
            Arc::new(invoker),
            Arc::new(cache),
            network,
        )
    }

    /// Create a new scheduler with shared collaborators (for testing, or when
    /// the host application keeps its own handles to them).
    pub fn with_shared(
        config: SchedulerConfig,
        store: Arc<S>,
        invoker: Arc<R>,
        cache: Arc<C>,
        network: NetworkMonitor,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                invoker,
                cache,
                network,
                event_bus: Arc::new(EventBus::new()),
                timer: Mutex::new(None),
                driver: Mutex::new(None),
                pass_lock: Mutex::new(()),
            }),
        }
    }

    /// Get the event bus. Register handlers here before calling [`start`].
    ///
    /// [`start`]: ActionScheduler::start
    pub fn event_bus(&self) -> &EventBus {
        &self.inner.event_bus
    }

    /// Start reacting to connectivity.
    ///
    /// If currently online, the retry timer is started and one reconciliation
    /// pass is spawned immediately. From then on, every transition to online
    /// spawns a pass and (re)starts the timer; every transition to offline
    /// stops the timer. Duplicate notifications are harmless: starting the
    /// timer always clears any existing one first.
    pub async fn start(&self) {
        // Subscribe before reading the initial state so a transition landing
        // in between is observed by the driver rather than lost.
        let mut state = self.inner.network.subscribe();

        if self.inner.network.is_online() {
            Inner::enable_attempts(&self.inner).await;
            Inner::spawn_pass(&self.inner);
        }

        let inner = Arc::clone(&self.inner);
        let driver = tokio::spawn(async move {
            while state.changed().await.is_ok() {
                let online = *state.borrow_and_update();
                if online {
                    debug!("network online, replaying pending actions");
                    Inner::spawn_pass(&inner);
                    Inner::enable_attempts(&inner).await;
                } else {
                    debug!("network offline, suspending delivery attempts");
                    inner.disable_attempts().await;
                }
            }
        });

        let mut slot = self.inner.driver.lock().await;
        if let Some(previous) = slot.replace(driver) {
            previous.abort();
        }
    }

    /// Stop the connectivity driver and the retry timer.
    ///
    /// An in-flight reconciliation pass runs to completion; nothing is
    /// drained or awaited.
    pub async fn stop(&self) {
        if let Some(driver) = self.inner.driver.lock().await.take() {
            driver.abort();
        }
        self.inner.disable_attempts().await;
    }

    /// Whether the retry timer is currently active.
    pub async fn is_retrying(&self) -> bool {
        self.inner.timer.lock().await.is_some()
    }

    /// Persist `action` for later delivery, overwriting any pending action
    /// already queued for the same target.
    pub async fn add_action(
        &self,
        params: &TargetParams,
        action: PendingAction,
    ) -> Result<(), SchedulerError> {
        let key = action_key(params);
        let value = serde_json::to_value(&action)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.inner.store.set_item(key.as_str(), value).await?;
        self.inner.event_bus.emit(Event::action_queued(key)).await;
        Ok(())
    }

    /// Delete the pending action for `params`, if any. Used by callers that
    /// supersede a queued action (e.g. an online write succeeded before the
    /// retry fired).
    pub async fn remove_action(&self, params: &TargetParams) -> Result<(), SchedulerError> {
        self.inner
            .store
            .remove_item(action_key(params).as_str())
            .await?;
        Ok(())
    }

    /// Delete every pending-action record. Instance snapshots and any other
    /// stored keys are left untouched.
    pub async fn clear(&self) -> Result<(), SchedulerError> {
        let keys = self.inner.store.keys().await?;
        for key in keys.into_iter().filter(|k| is_action_key(k)) {
            self.inner.store.remove_item(&key).await?;
        }
        Ok(())
    }

    /// Run one reconciliation pass: attempt delivery of every pending action,
    /// then invalidate the result cache for whichever targets completed.
    ///
    /// A no-op while offline, or while another pass is already in flight.
    /// Never fails outward; per-action errors are logged and contained.
    pub async fn reconcile(&self) {
        Inner::check_pending_actions(&self.inner).await;
    }
}

impl<S, R, C> Inner<S, R, C>
where
    S: ActionStore + 'static,
    R: RemoteInvoker + 'static,
    C: ResultCache + 'static,
{
    /// Spawn a reconciliation pass without awaiting it. Pass failures never
    /// reach the caller.
    fn spawn_pass(this: &Arc<Self>) {
        let inner = Arc::clone(this);
        tokio::spawn(async move {
            Inner::check_pending_actions(&inner).await;
        });
    }

    /// (Re)start the retry timer. Any previous timer is cleared first so that
    /// duplicate online notifications never leave two timers running.
    ///
    /// The first tick fires one full interval after enablement; the immediate
    /// attempt on an online transition comes from the transition-triggered
    /// pass, not the timer.
    async fn enable_attempts(this: &Arc<Self>) {
        let mut slot = this.timer.lock().await;
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        let inner = Arc::clone(this);
        let period = this.config.reattempt_interval;
        *slot = Some(tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            loop {
                ticker.tick().await;
                Inner::check_pending_actions(&inner).await;
            }
        }));
    }

    /// Stop the retry timer. Safe to call when no timer is active.
    async fn disable_attempts(&self) {
        if let Some(timer) = self.timer.lock().await.take() {
            timer.abort();
        }
    }

    /// One reconciliation pass over all pending actions.
    async fn check_pending_actions(this: &Arc<Self>) {
        if !this.network.is_online() {
            return;
        }

        // Single-flight: triggers arriving mid-pass are dropped, not queued.
        let Ok(_guard) = this.pass_lock.try_lock() else {
            debug!("reconciliation pass already in flight, skipping trigger");
            return;
        };

        let keys = match this.store.keys().await {
            Ok(keys) => keys,
            Err(error) => {
                warn!(%error, "failed to enumerate stored keys, pass abandoned");
                return;
            }
        };

        let action_keys: Vec<ActionKey> = keys
            .into_iter()
            .filter(|k| is_action_key(k))
            .map(ActionKey::new)
            .collect();
        let attempted = action_keys.len();

        debug!(pending = attempted, "reconciling pending actions");

        let mut handles = Vec::with_capacity(attempted);
        for key in action_keys {
            let inner = Arc::clone(this);
            handles.push(tokio::spawn(async move {
                match inner.process_action(&key).await {
                    Ok(completed) => completed,
                    Err(error) => {
                        warn!(key = %key, %error, "pending action left for next pass");
                        None
                    }
                }
            }));
        }

        let mut completed = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Some(params)) => completed.push(params),
                Ok(None) => {}
                Err(error) => warn!(%error, "action task aborted"),
            }
        }

        this.cache.invalidate(&completed).await;
        this.event_bus
            .emit(Event::pass_completed(attempted, completed.len()))
            .await;
    }

    /// Reconcile a single pending action.
    ///
    /// Returns the target parameters when the action completed and its stored
    /// state was cleaned up, `None` when it was discarded as stale or stays
    /// pending for the next cycle.
    async fn process_action(&self, key: &ActionKey) -> Result<Option<TargetParams>, SchedulerError> {
        let Some(value) = self.store.get_item(key.as_str()).await? else {
            // Record vanished between enumeration and load; nothing to do.
            return Ok(None);
        };
        let action: PendingAction =
            serde_json::from_value(value).map_err(|e| SchedulerError::CorruptRecord {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        let instance_key = instance_key(&self.config, &action.cache_params);
        let Some(instance) = self.store.get_item(instance_key.as_str()).await? else {
            // The target was evicted or never cached: the action is stale and
            // is discarded without an attempt.
            self.store.remove_item(key.as_str()).await?;
            debug!(key = %key, "discarded stale action");
            self.event_bus
                .emit(Event::action_discarded(key.clone()))
                .await;
            return Ok(None);
        };

        let mut invocation = self
            .invoker
            .invoke(
                &action.action,
                &action.http_params,
                &instance,
                InvokeOptions::http_only(),
            )
            .await;

        // Only the network exchange matters here; the invoker's local-commit
        // phase is a best-effort side channel.
        invocation.detach_storage_phase();

        match invocation.network().await {
            Ok(()) => {
                self.store.remove_item(key.as_str()).await?;
                self.store.remove_item(instance_key.as_str()).await?;
                self.event_bus
                    .emit(Event::action_completed(action.cache_params.clone()))
                    .await;
                Ok(Some(action.cache_params))
            }
            Err(error) => {
                debug!(key = %key, %error, "remote exchange failed, action stays pending");
                self.event_bus
                    .emit(Event::action_deferred(key.clone(), error.to_string()))
                    .await;
                Ok(None)
            }
        }
    }
}
