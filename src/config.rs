//! Scheduler configuration.
//!
//! A small serde-friendly struct wired in once at application startup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default delay between delivery re-attempts while online.
const DEFAULT_REATTEMPT_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for an [`ActionScheduler`](crate::ActionScheduler).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Delay between delivery re-attempts while online.
    #[serde(with = "serde_millis")]
    pub reattempt_interval: Duration,

    /// Namespace prefixing cached instance snapshots in the store.
    pub cache_namespace: String,
}

impl SchedulerConfig {
    /// Create a configuration with the default reattempt interval.
    pub fn new(cache_namespace: impl Into<String>) -> Self {
        Self {
            reattempt_interval: DEFAULT_REATTEMPT_INTERVAL,
            cache_namespace: cache_namespace.into(),
        }
    }

    /// Builder: set the reattempt interval.
    pub fn with_reattempt_interval(mut self, interval: Duration) -> Self {
        self.reattempt_interval = interval;
        self
    }
}

/// Serde helper for Duration serialization.
///
/// Serializes Duration as whole milliseconds (matching host-app config files).
mod serde_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
