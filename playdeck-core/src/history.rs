//! Viewing history persistence.
//!
//! Every successful play of a playlist chapter leaves two records behind:
//! the work's metadata (without its playlist) keyed by work id, and a
//! history entry keyed by the resolved URL. Replaying a URL overwrites its
//! entry, so the history holds one entry per distinct URL.

use std::sync::Arc;

use playdeck_catalog::{Work, WorkId, WorkSnapshot};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::{IndexSpec, KeyValueStore, RangeOptions, RangeOrder, StoreError};

/// Collection holding work snapshots keyed by work id.
pub const WORK_COLLECTION: &str = "work";
/// Collection holding history entries keyed by resolved URL.
pub const HISTORY_COLLECTION: &str = "history";
/// Secondary index ordering history entries by play time.
pub const UTIME_INDEX: &str = "utime";

/// One played chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    /// Resolved URL that was played
    pub url: String,
    /// Chapter display name
    pub chap: String,
    /// Unix seconds of the play
    pub utime: i64,
    /// Work the chapter belongs to
    pub work: WorkSnapshot,
}

/// Source of wall-clock time for history entries.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time in unix seconds.
    fn now_unix(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Typed access to history and cached works on top of a key/value store.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl HistoryStore {
    /// Creates a history store using the system clock.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Creates a history store with an explicit clock.
    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Indexes the backing store must declare for history queries.
    pub fn index_specs() -> Vec<IndexSpec> {
        vec![IndexSpec::new(HISTORY_COLLECTION, UTIME_INDEX, "utime")]
    }

    /// Records a play of chapter `chap` at `url` belonging to `work`.
    ///
    /// The work snapshot is written first; the history entry is only written
    /// once that completes, so an entry never points at a missing work.
    ///
    /// # Errors
    ///
    /// - `StoreError::Io` - If either write fails
    /// - `StoreError::Serialization` - If a record cannot be encoded
    pub async fn record_play(
        &self,
        url: &str,
        chap: &str,
        work: &Work,
    ) -> Result<HistoryItem, StoreError> {
        let snapshot = work.snapshot();
        self.store
            .set(
                WORK_COLLECTION,
                &work.id().to_string(),
                encode(WORK_COLLECTION, &snapshot)?,
            )
            .await?;

        let item = HistoryItem {
            url: url.to_string(),
            chap: chap.to_string(),
            utime: self.clock.now_unix(),
            work: snapshot,
        };
        self.store
            .set(HISTORY_COLLECTION, url, encode(HISTORY_COLLECTION, &item)?)
            .await?;

        tracing::debug!(
            "Recorded play of '{}' ({}) for work {} at {}",
            item.chap,
            item.url,
            work.id(),
            item.utime
        );
        Ok(item)
    }

    /// Most recent plays first, at most `limit` of them.
    ///
    /// # Errors
    ///
    /// - `StoreError::UnknownIndex` - If the store lacks the `utime` index
    /// - `StoreError::Serialization` - If a stored entry is malformed
    pub async fn recent_history(&self, limit: usize) -> Result<Vec<HistoryItem>, StoreError> {
        let options = RangeOptions::by_index(UTIME_INDEX, RangeOrder::Prev);
        self.store
            .get_range(HISTORY_COLLECTION, 0, limit, &options)
            .await?
            .into_iter()
            .map(|value| decode(HISTORY_COLLECTION, value))
            .collect()
    }

    /// History entry for a resolved URL, if it was ever played.
    ///
    /// # Errors
    ///
    /// - `StoreError::Serialization` - If the stored entry is malformed
    pub async fn history_entry(&self, url: &str) -> Result<Option<HistoryItem>, StoreError> {
        self.store
            .get(HISTORY_COLLECTION, url)
            .await?
            .map(|value| decode(HISTORY_COLLECTION, value))
            .transpose()
    }

    /// Cached metadata of a work that was played before.
    ///
    /// # Errors
    ///
    /// - `StoreError::Serialization` - If the stored snapshot is malformed
    pub async fn cached_work(&self, id: WorkId) -> Result<Option<WorkSnapshot>, StoreError> {
        self.store
            .get(WORK_COLLECTION, &id.to_string())
            .await?
            .map(|value| decode(WORK_COLLECTION, value))
            .transpose()
    }
}

fn encode<T: Serialize>(collection: &str, record: &T) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|error| StoreError::Serialization {
        collection: collection.to_string(),
        reason: error.to_string(),
    })
}

fn decode<T: DeserializeOwned>(collection: &str, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|error| StoreError::Serialization {
        collection: collection.to_string(),
        reason: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use playdeck_catalog::{PlaylistItem, WorkDetail, WorkSummary};

    use super::*;
    use crate::storage::MemoryStore;
    use crate::test_fixtures::ManualClock;

    fn sample_work(id: i64) -> Work {
        Work::from_parts(
            WorkSummary::new(WorkId::new(id), format!("Work {id}")),
            WorkDetail {
                play_list: vec![
                    PlaylistItem::new(format!("http://cdn.test/{id}/1.mp4"), "EP1"),
                    PlaylistItem::new(format!("http://cdn.test/{id}/2.mp4"), "EP2"),
                ],
                image: format!("https://img.test/{id}.jpg"),
            },
        )
    }

    fn history_with_clock(start: i64) -> (HistoryStore, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new(&HistoryStore::index_specs()));
        let clock = Arc::new(ManualClock::new(start));
        let history = HistoryStore::with_clock(store.clone(), clock.clone());
        (history, store, clock)
    }

    #[tokio::test]
    async fn test_record_play_writes_work_and_entry() {
        let (history, store, _clock) = history_with_clock(1_700_000_000);
        let work = sample_work(1);

        let item = history
            .record_play("https://cdn.test/1/1.mp4", "EP1", &work)
            .await
            .unwrap();

        assert_eq!(item.utime, 1_700_000_000);
        assert_eq!(store.len(WORK_COLLECTION), 1);
        assert_eq!(store.len(HISTORY_COLLECTION), 1);

        let cached = history.cached_work(WorkId::new(1)).await.unwrap().unwrap();
        assert_eq!(cached, work.snapshot());

        let entry = history
            .history_entry("https://cdn.test/1/1.mp4")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.chap, "EP1");
        assert_eq!(entry.work.id(), WorkId::new(1));
    }

    #[tokio::test]
    async fn test_chapters_get_separate_entries() {
        let (history, store, clock) = history_with_clock(100);
        let work = sample_work(1);

        history
            .record_play("https://cdn.test/1/1.mp4", "EP1", &work)
            .await
            .unwrap();
        clock.advance(5);
        history
            .record_play("https://cdn.test/1/2.mp4", "EP2", &work)
            .await
            .unwrap();

        assert_eq!(store.len(HISTORY_COLLECTION), 2);
        assert_eq!(store.len(WORK_COLLECTION), 1);
    }

    #[tokio::test]
    async fn test_recent_history_newest_first_and_limited() {
        let (history, _store, clock) = history_with_clock(1_000);

        for id in 1..=4 {
            let work = sample_work(id);
            history
                .record_play(&format!("https://cdn.test/{id}/1.mp4"), "EP1", &work)
                .await
                .unwrap();
            clock.advance(10);
        }

        let recent = history.recent_history(3).await.unwrap();
        let times: Vec<i64> = recent.iter().map(|item| item.utime).collect();
        assert_eq!(times, vec![1_030, 1_020, 1_010]);
    }

    #[tokio::test]
    async fn test_replay_moves_entry_to_front() {
        let (history, _store, clock) = history_with_clock(500);
        let first = sample_work(1);
        let second = sample_work(2);

        history
            .record_play("https://cdn.test/1/1.mp4", "EP1", &first)
            .await
            .unwrap();
        clock.advance(1);
        history
            .record_play("https://cdn.test/2/1.mp4", "EP1", &second)
            .await
            .unwrap();
        clock.advance(1);
        history
            .record_play("https://cdn.test/1/1.mp4", "EP1", &first)
            .await
            .unwrap();

        let recent = history.recent_history(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].url, "https://cdn.test/1/1.mp4");
        assert_eq!(recent[0].utime, 502);
    }

    #[tokio::test]
    async fn test_missing_index_is_reported() {
        let store = Arc::new(MemoryStore::new(&[]));
        let history = HistoryStore::new(store);

        let result = history.recent_history(10).await;
        assert!(matches!(result, Err(StoreError::UnknownIndex { .. })));
    }
}
