//! Key/value store persisted as JSON documents on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;

use super::index::{IndexSpec, IndexedCollections};
use super::{KeyValueStore, RangeOptions, StoreError};
use crate::config::StorageConfig;

const COLLECTION_EXTENSION: &str = "json";

/// File system-based key/value store.
///
/// Each collection lives in `<data_dir>/<collection>.json` as one JSON
/// object keyed by primary key. Every write rewrites the collection file
/// through a temporary file and a rename, so a crash never leaves a
/// half-written collection behind. Indexes are rebuilt when the store opens.
#[derive(Debug)]
pub struct JsonFileStore {
    data_dir: PathBuf,
    temp_file_suffix: String,
    collections: Mutex<IndexedCollections>,
}

impl JsonFileStore {
    /// Opens the store in `config.data_dir`, loading every existing collection.
    ///
    /// # Errors
    ///
    /// - `StoreError::Io` - If the directory cannot be created or read
    /// - `StoreError::Serialization` - If a collection file is not valid JSON
    pub async fn open(config: &StorageConfig, indexes: &[IndexSpec]) -> Result<Self, StoreError> {
        let data_dir = config.data_dir.clone();
        fs::create_dir_all(&data_dir)
            .await
            .map_err(|source| StoreError::Io {
                operation: "create data directory",
                path: data_dir.clone(),
                source,
            })?;

        let mut collections = IndexedCollections::new(indexes);
        let mut entries = fs::read_dir(&data_dir)
            .await
            .map_err(|source| StoreError::Io {
                operation: "list data directory",
                path: data_dir.clone(),
                source,
            })?;

        while let Some(entry) = entries.next_entry().await.map_err(|source| StoreError::Io {
            operation: "list data directory",
            path: data_dir.clone(),
            source,
        })? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(COLLECTION_EXTENSION) {
                continue;
            }
            let Some(collection) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let documents = read_collection(&path, collection).await?;
            tracing::debug!(
                "Loaded collection '{}' with {} documents",
                collection,
                documents.len()
            );
            collections.load_collection(collection, documents);
        }

        Ok(Self {
            data_dir,
            temp_file_suffix: config.temp_file_suffix.to_string(),
            collections: Mutex::new(collections),
        })
    }

    /// Directory holding the collection files.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.data_dir
            .join(format!("{collection}.{COLLECTION_EXTENSION}"))
    }

    async fn persist(
        &self,
        collection: &str,
        documents: &BTreeMap<String, Value>,
    ) -> Result<(), StoreError> {
        let final_path = self.collection_path(collection);
        let temp_path = self.data_dir.join(format!(
            "{collection}.{COLLECTION_EXTENSION}{}",
            self.temp_file_suffix
        ));

        let encoded =
            serde_json::to_vec_pretty(documents).map_err(|error| StoreError::Serialization {
                collection: collection.to_string(),
                reason: error.to_string(),
            })?;

        fs::write(&temp_path, encoded)
            .await
            .map_err(|source| StoreError::Io {
                operation: "write collection",
                path: temp_path.clone(),
                source,
            })?;
        fs::rename(&temp_path, &final_path)
            .await
            .map_err(|source| StoreError::Io {
                operation: "replace collection",
                path: final_path.clone(),
                source,
            })
    }
}

async fn read_collection(
    path: &Path,
    collection: &str,
) -> Result<BTreeMap<String, Value>, StoreError> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|source| StoreError::Io {
            operation: "read collection",
            path: path.to_path_buf(),
            source,
        })?;

    serde_json::from_str(&raw).map_err(|error| StoreError::Serialization {
        collection: collection.to_string(),
        reason: error.to_string(),
    })
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.collections.lock().await.get(collection, key))
    }

    async fn set(&self, collection: &str, key: &str, value: Value) -> Result<(), StoreError> {
        // Lock is held across the write so collection files are replaced in call order.
        let mut collections = self.collections.lock().await;
        let mut documents = collections
            .documents(collection)
            .cloned()
            .unwrap_or_default();
        documents.insert(key.to_string(), value.clone());

        // The cache only takes the write once it is on disk.
        self.persist(collection, &documents).await?;
        collections.set(collection, key, value);
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
            .lock()
            .await
            .range(collection, start, count, options)
    }
}
