//! Persistent key-value storage for pending actions and instance snapshots.
//!
//! This module provides a trait-based storage abstraction with
//! pluggable backends (in-memory, SQLite, etc.). Values are JSON documents;
//! the scheduler stores pending-action records here and reads the instance
//! snapshots the surrounding cache subsystem writes into the same store.

mod memory;
#[cfg(any(feature = "sqlite", test))]
mod sqlite;

pub use memory::MemoryStore;
#[cfg(any(feature = "sqlite", test))]
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage lock was poisoned.
    #[error("storage lock poisoned")]
    LockPoisoned,

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Generic storage error.
    #[error("storage error: {0}")]
    Other(String),
}

/// Ordered-key store holding JSON documents.
#[async_trait]
pub trait ActionStore: Send + Sync {
    /// List every stored key in ascending order.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Fetch the document stored under `key`, if any.
    async fn get_item(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Store `value` under `key`, replacing any existing document.
    async fn set_item(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Delete the document under `key`. Deleting a missing key is not an error.
    async fn remove_item(&self, key: &str) -> Result<(), StoreError>;
}
