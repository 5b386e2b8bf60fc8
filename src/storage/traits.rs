//! Storage traits and error types
//!
//! This module defines the trait interface for item stores and
//! associated error types.

use crate::storage::{ItemUpdate, PersistedItem};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store {} is locked by process {holder}; remove the lock file if that process is gone", path.display())]
    Locked { path: PathBuf, holder: String },

    #[error("Snapshot {} is corrupt: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed store of crawled items
///
/// Items are never deleted. `upsert` merges a partial update into the stored item,
/// creating it on first sight.
pub trait ItemStore {
    /// Returns true when an item with this id has been stored
    fn has(&self, id: &str) -> bool;

    /// Gets one item by id
    fn get(&self, id: &str) -> Option<PersistedItem>;

    /// Merges `update` into the item stored under `id`
    ///
    /// # Arguments
    ///
    /// * `id` - Primary key
    /// * `update` - Fields to overwrite; `None` fields keep their stored value
    ///
    /// # Returns
    ///
    /// `true` when the item did not exist before this call. When the write fails
    /// the stored item is left as it was before the call.
    fn upsert(&mut self, id: &str, update: ItemUpdate) -> StoreResult<bool>;

    /// All items, ordered by id
    fn get_all(&self) -> Vec<PersistedItem>;

    /// Number of stored items
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persists any mutations not yet written
    fn flush(&mut self) -> StoreResult<()>;
}
