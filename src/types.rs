//! Core data types for deferred remote actions.
//!
//! A [`PendingAction`] is the record persisted while the client is offline;
//! [`TargetParams`] identifies the instance it targets and doubles as the
//! basis for storage-key derivation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of a remote operation (e.g. `"update"`, `"archive"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionDescriptor(String);

impl ActionDescriptor {
    /// Create a new ActionDescriptor from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActionDescriptor {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ActionDescriptor {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifying parameters of the target instance an action depends on.
///
/// Backed by a sorted map: logically equal parameter sets serialize to the
/// same string regardless of insertion order, which is what makes derived
/// storage keys deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetParams(serde_json::Map<String, Value>);

impl TargetParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add one parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Wrap an existing JSON object.
    pub fn from_map(map: serde_json::Map<String, Value>) -> Self {
        Self(map)
    }

    /// Look up a parameter by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether the parameter set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical serialized form, stable under key insertion order.
    pub fn stable_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }
}

/// A deferred remote operation, persisted locally until delivered.
///
/// Created once and read-only thereafter; the reconciliation pass deletes the
/// record on successful delivery, or immediately when the instance snapshot
/// it depends on no longer exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAction {
    /// Which remote operation to perform.
    pub action: ActionDescriptor,
    /// Request parameters passed through to the remote invoker.
    pub http_params: Value,
    /// Identifying parameters of the target instance.
    pub cache_params: TargetParams,
}

impl PendingAction {
    /// Create a new pending action.
    pub fn new(
        action: impl Into<ActionDescriptor>,
        http_params: Value,
        cache_params: TargetParams,
    ) -> Self {
        Self {
            action: action.into(),
            http_params,
            cache_params,
        }
    }
}
