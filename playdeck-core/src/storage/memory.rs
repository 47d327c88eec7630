//! In-process key/value store.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::index::{IndexSpec, IndexedCollections};
use super::{KeyValueStore, RangeOptions, StoreError};

/// Key/value store living entirely in memory.
///
/// Used for tests and for sessions that should not leave anything on disk.
#[derive(Debug)]
pub struct MemoryStore {
    collections: RwLock<IndexedCollections>,
}

impl MemoryStore {
    /// Creates an empty store with the given secondary indexes.
    pub fn new(indexes: &[IndexSpec]) -> Self {
        Self {
            collections: RwLock::new(IndexedCollections::new(indexes)),
        }
    }

    /// Number of documents currently stored in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .documents(collection)
            .map_or(0, |documents| documents.len())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.collections.read().get(collection, key))
    }

    async fn set(&self, collection: &str, key: &str, value: Value) -> Result<(), StoreError> {
        self.collections.write().set(collection, key, value);
        Ok(())
    }

    async fn get_range(
        &self,
        collection: &str,
        start: usize,
        count: usize,
        options: &RangeOptions,
    ) -> Result<Vec<Value>, StoreError> {
        self.collections
            .read()
            .range(collection, start, count, options)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::storage::RangeOrder;

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryStore::new(&[]);
        store.set("work", "1", json!({"name": "a"})).await.unwrap();

        let value = store.get("work", "1").await.unwrap();
        assert_eq!(value, Some(json!({"name": "a"})));
        assert_eq!(store.get("work", "2").await.unwrap(), None);
        assert_eq!(store.get("history", "1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_same_key_is_one_entry() {
        let store = MemoryStore::new(&[IndexSpec::new("history", "utime", "utime")]);
        store.set("history", "u", json!({"utime": 1})).await.unwrap();
        store.set("history", "u", json!({"utime": 2})).await.unwrap();

        assert_eq!(store.len("history"), 1);
        let range = store
            .get_range(
                "history",
                0,
                10,
                &RangeOptions::by_index("utime", RangeOrder::Prev),
            )
            .await
            .unwrap();
        assert_eq!(range, vec![json!({"utime": 2})]);
    }
}
