//! Durable key/value storage for history and cached work metadata.
//!
//! Defines the storage capability the player consumes: point reads and
//! writes into named collections, plus ordered range reads over declared
//! secondary indexes. Ships an in-process store and a JSON file store.

pub mod file_store;
pub mod index;
pub mod memory;

use std::path::PathBuf;

use async_trait::async_trait;
pub use file_store::JsonFileStore;
pub use index::{IndexKey, IndexSpec};
pub use memory::MemoryStore;
use serde_json::Value;

/// Direction of a range read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeOrder {
    /// Ascending key order
    #[default]
    Next,
    /// Descending key order
    Prev,
}

/// Options for a range read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RangeOptions {
    /// Secondary index to walk; `None` walks primary keys
    pub index: Option<String>,
    /// Walk direction
    pub order: RangeOrder,
}

impl RangeOptions {
    /// Range over a named secondary index in the given order.
    pub fn by_index(index: impl Into<String>, order: RangeOrder) -> Self {
        Self {
            index: Some(index.into()),
            order,
        }
    }
}

/// Key/value operations used by the player.
///
/// Values are JSON documents grouped in named collections. A key maps to
/// exactly one value; writing an existing key replaces it.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Loads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// - `StoreError::Io` - If the backing medium could not be read
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// - `StoreError::Io` - If the backing medium could not be written
    /// - `StoreError::Serialization` - If the collection could not be encoded
    async fn set(&self, collection: &str, key: &str, value: Value) -> Result<(), StoreError>;

    /// Reads up to `count` values starting at offset `start` in index order.
    ///
    /// # Errors
    ///
    /// - `StoreError::UnknownIndex` - If the named index was never declared
    async fn get_range(
        &self,
        collection: &str,
        start: usize,
        count: usize,
        options: &RangeOptions,
    ) -> Result<Vec<Value>, StoreError>;
}

/// Errors that occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Range read named an index that is not declared for the collection
    #[error("Unknown index '{index}' on collection '{collection}'")]
    UnknownIndex {
        /// Collection that was read
        collection: String,
        /// Index that was requested
        index: String,
    },

    /// Stored document could not be encoded or decoded
    #[error("Serialization error in collection '{collection}': {reason}")]
    Serialization {
        /// Collection holding the document
        collection: String,
        /// Description of the failure
        reason: String,
    },

    /// File system operation failed
    #[error("I/O error during {operation} on {path}: {source}")]
    Io {
        /// What the store was doing
        operation: &'static str,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}
