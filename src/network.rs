//! Network connectivity observation.
//!
//! [`NetworkMonitor`] is the process-wide connectivity flag plus a
//! multi-subscriber change feed. Any number of components may subscribe and
//! every transition reaches all of them; the handle is cheap to clone and is
//! typically created once at startup and fed by the platform's connectivity
//! callbacks.

use tokio::sync::watch;

/// Process-wide connectivity state with change notifications.
#[derive(Clone)]
pub struct NetworkMonitor {
    state: watch::Sender<bool>,
}

impl NetworkMonitor {
    /// Create a monitor with the given initial state.
    pub fn new(online: bool) -> Self {
        let (state, _) = watch::channel(online);
        Self { state }
    }

    /// Create a monitor that starts online.
    pub fn online() -> Self {
        Self::new(true)
    }

    /// Create a monitor that starts offline.
    pub fn offline() -> Self {
        Self::new(false)
    }

    /// Current connectivity state.
    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Record that connectivity is available and notify subscribers.
    pub fn set_online(&self) {
        self.state.send_replace(true);
    }

    /// Record that connectivity was lost and notify subscribers.
    pub fn set_offline(&self) {
        self.state.send_replace(false);
    }

    /// Subscribe to state changes. The receiver observes the current state
    /// immediately and every subsequent transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}
