//! Deterministic storage-key derivation.
//!
//! Pending-action records and cached instance snapshots share one key-value
//! store; these functions map a target's identifying parameters to the two
//! keys the scheduler cares about.

use std::fmt;

use crate::config::SchedulerConfig;
use crate::types::TargetParams;

/// Prefix shared by every pending-action key, distinguishing action records
/// from all other stored keys.
pub const ACTION_KEY_PREFIX: &str = "action:";

/// Storage key of a pending-action record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionKey(String);

/// Storage key of a cached instance snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceKey(String);

impl ActionKey {
    /// Wrap a raw stored key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the underlying string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl InstanceKey {
    /// Wrap a raw stored key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the underlying string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derive the key under which the pending action for `params` is stored.
///
/// One pending action per target: re-deriving for logically equal parameters
/// always yields the same key, so a second `add_action` overwrites the first.
pub fn action_key(params: &TargetParams) -> ActionKey {
    ActionKey(format!("{ACTION_KEY_PREFIX}{}", params.stable_json()))
}

/// Derive the key of the cached instance snapshot the action depends on.
///
/// The namespace comes from configuration; the cache subsystem owns these
/// entries and the scheduler only reads presence and deletes on success.
pub fn instance_key(config: &SchedulerConfig, params: &TargetParams) -> InstanceKey {
    InstanceKey(format!(
        "{}:{}",
        config.cache_namespace,
        params.stable_json()
    ))
}

/// Whether a raw stored key names a pending-action record.
pub fn is_action_key(key: &str) -> bool {
    key.starts_with(ACTION_KEY_PREFIX)
}
