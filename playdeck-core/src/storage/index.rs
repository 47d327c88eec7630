//! In-memory collections with ordered secondary indexes.
//!
//! Shared by every store implementation: the memory store keeps one of
//! these as its whole state, the file store keeps one as a write-through
//! cache of what is on disk.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::Value;

use super::{RangeOptions, RangeOrder, StoreError};

/// Declaration of a secondary index over one field of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Collection the index belongs to
    pub collection: String,
    /// Name used by range reads
    pub name: String,
    /// Top-level document field the index orders by
    pub field: String,
}

impl IndexSpec {
    /// Declares index `name` over `field` in `collection`.
    pub fn new(
        collection: impl Into<String>,
        name: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            name: name.into(),
            field: field.into(),
        }
    }
}

/// Sortable value extracted from an indexed field.
///
/// Integers sort before text. Documents without the field, or with a
/// non-scalar value in it, are left out of the index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndexKey {
    /// Integral number
    Integer(i64),
    /// String, or a number that is not integral
    Text(String),
}

impl IndexKey {
    /// Extracts the index key of `field` from a document.
    pub fn from_document(document: &Value, field: &str) -> Option<Self> {
        match document.get(field)? {
            Value::Number(number) => Some(match number.as_i64() {
                Some(integer) => IndexKey::Integer(integer),
                None => IndexKey::Text(number.to_string()),
            }),
            Value::String(text) => Some(IndexKey::Text(text.clone())),
            Value::Bool(flag) => Some(IndexKey::Integer(i64::from(*flag))),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct SecondaryIndex {
    field: String,
    entries: BTreeSet<(IndexKey, String)>,
}

/// Named collections of JSON documents with their secondary indexes.
#[derive(Debug, Default)]
pub struct IndexedCollections {
    records: HashMap<String, BTreeMap<String, Value>>,
    indexes: HashMap<(String, String), SecondaryIndex>,
}

impl IndexedCollections {
    /// Creates empty collections with the given indexes declared.
    pub fn new(specs: &[IndexSpec]) -> Self {
        let indexes = specs
            .iter()
            .map(|spec| {
                (
                    (spec.collection.clone(), spec.name.clone()),
                    SecondaryIndex {
                        field: spec.field.clone(),
                        entries: BTreeSet::new(),
                    },
                )
            })
            .collect();

        Self {
            records: HashMap::new(),
            indexes,
        }
    }

    /// Replaces a whole collection and rebuilds its indexes.
    pub fn load_collection(&mut self, collection: &str, documents: BTreeMap<String, Value>) {
        for ((owner, _), index) in self.indexes.iter_mut() {
            if owner != collection {
                continue;
            }
            index.entries = documents
                .iter()
                .filter_map(|(key, document)| {
                    IndexKey::from_document(document, &index.field)
                        .map(|index_key| (index_key, key.clone()))
                })
                .collect();
        }
        self.records.insert(collection.to_string(), documents);
    }

    /// All documents of a collection keyed by primary key.
    pub fn documents(&self, collection: &str) -> Option<&BTreeMap<String, Value>> {
        self.records.get(collection)
    }

    /// Point lookup.
    pub fn get(&self, collection: &str, key: &str) -> Option<Value> {
        self.records.get(collection)?.get(key).cloned()
    }

    /// Upserts a document and keeps every index of its collection in step.
    pub fn set(&mut self, collection: &str, key: &str, value: Value) {
        let documents = self.records.entry(collection.to_string()).or_default();
        let previous = documents.insert(key.to_string(), value);
        let current = &documents[key];

        for ((owner, _), index) in self.indexes.iter_mut() {
            if owner != collection {
                continue;
            }
            if let Some(old_key) = previous
                .as_ref()
                .and_then(|document| IndexKey::from_document(document, &index.field))
            {
                index.entries.remove(&(old_key, key.to_string()));
            }
            if let Some(new_key) = IndexKey::from_document(current, &index.field) {
                index.entries.insert((new_key, key.to_string()));
            }
        }
    }

    /// Ordered range read, skipping `start` entries and returning at most `count`.
    ///
    /// # Errors
    ///
    /// - `StoreError::UnknownIndex` - If `options.index` is not declared
    pub fn range(
        &self,
        collection: &str,
        start: usize,
        count: usize,
        options: &RangeOptions,
    ) -> Result<Vec<Value>, StoreError> {
        let empty = BTreeMap::new();
        let documents = self.records.get(collection).unwrap_or(&empty);

        let keys: Box<dyn Iterator<Item = &String> + '_> = match &options.index {
            Some(name) => {
                let index = self
                    .indexes
                    .get(&(collection.to_string(), name.clone()))
                    .ok_or_else(|| StoreError::UnknownIndex {
                        collection: collection.to_string(),
                        index: name.clone(),
                    })?;
                let entries = index.entries.iter().map(|(_, key)| key);
                match options.order {
                    RangeOrder::Next => Box::new(entries),
                    RangeOrder::Prev => Box::new(entries.rev()),
                }
            }
            None => match options.order {
                RangeOrder::Next => Box::new(documents.keys()),
                RangeOrder::Prev => Box::new(documents.keys().rev()),
            },
        };

        Ok(keys
            .skip(start)
            .take(count)
            .filter_map(|key| documents.get(key).cloned())
            .collect())
    }
}
