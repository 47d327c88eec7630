//! History surviving a restart through the JSON file store.

use std::sync::Arc;

use playdeck_catalog::{MockCatalog, PlaylistItem, WorkDetail, WorkId, WorkSummary};
use playdeck_core::config::StorageConfig;
use playdeck_core::history::{HISTORY_COLLECTION, WORK_COLLECTION};
use playdeck_core::test_fixtures::ManualClock;
use playdeck_core::{HistoryStore, JsonFileStore, KeyValueStore};
use playdeck_tests::TestPlayer;
use tempfile::TempDir;

fn storage_config(dir: &TempDir) -> StorageConfig {
    StorageConfig {
        data_dir: dir.path().to_path_buf(),
        ..StorageConfig::default()
    }
}

async fn open_store(dir: &TempDir) -> Arc<JsonFileStore> {
    Arc::new(
        JsonFileStore::open(&storage_config(dir), &HistoryStore::index_specs())
            .await
            .unwrap(),
    )
}

#[tokio::test]
async fn test_history_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = MockCatalog::new().with_detail(
        WorkId::new(20),
        WorkDetail {
            play_list: vec![
                PlaylistItem::new("http://cdn.test/20/1.mp4", "Part 1"),
                PlaylistItem::new("http://cdn.test/20/2.mp4", "Part 2"),
            ],
            image: "https://img.test/20.jpg".to_string(),
        },
    );

    {
        let player = TestPlayer::mount(Arc::new(catalog.clone()), open_store(&dir).await);
        player
            .session
            .select_play_list(WorkSummary::new(WorkId::new(20), "Twenty"))
            .await
            .unwrap();
        let controller = player.session.controller();
        controller
            .play("http://cdn.test/20/1.mp4")
            .unwrap()
            .recorded()
            .await
            .unwrap();
        controller
            .play("http://cdn.test/20/2.mp4")
            .unwrap()
            .recorded()
            .await
            .unwrap();
    }

    let history = HistoryStore::new(open_store(&dir).await);
    let entries = history.recent_history(10).await.unwrap();
    let mut urls: Vec<&str> = entries.iter().map(|item| item.url.as_str()).collect();
    urls.sort_unstable();
    assert_eq!(
        urls,
        vec!["https://cdn.test/20/1.mp4", "https://cdn.test/20/2.mp4"]
    );

    let cached = history.cached_work(WorkId::new(20)).await.unwrap().unwrap();
    assert_eq!(cached.summary.name, "Twenty");
    assert_eq!(cached.image, "https://img.test/20.jpg");
}

#[tokio::test]
async fn test_reopened_index_keeps_recency_order() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(1_700_000_000));

    {
        let history = HistoryStore::with_clock(open_store(&dir).await, clock.clone());
        for id in 1..=3 {
            let work = playdeck_catalog::Work::from_parts(
                WorkSummary::new(WorkId::new(id), format!("Work {id}")),
                WorkDetail {
                    play_list: vec![PlaylistItem::new(
                        format!("https://cdn.test/{id}.mp4"),
                        "Full",
                    )],
                    image: String::new(),
                },
            );
            history
                .record_play(&format!("https://cdn.test/{id}.mp4"), "Full", &work)
                .await
                .unwrap();
            clock.advance(60);
        }
    }

    let history = HistoryStore::new(open_store(&dir).await);
    let recent = history.recent_history(2).await.unwrap();
    let ids: Vec<i64> = recent.iter().map(|item| item.work.id().as_i64()).collect();
    assert_eq!(ids, vec![3, 2]);
}

#[tokio::test]
async fn test_collections_are_plain_json_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let history = HistoryStore::new(store.clone());
    let work = playdeck_catalog::Work::from_parts(
        WorkSummary::new(WorkId::new(5), "Five"),
        WorkDetail {
            play_list: vec![PlaylistItem::new("https://cdn.test/5.mp4", "Full")],
            image: String::new(),
        },
    );

    history
        .record_play("https://cdn.test/5.mp4", "Full", &work)
        .await
        .unwrap();

    for collection in [WORK_COLLECTION, HISTORY_COLLECTION] {
        let raw = std::fs::read_to_string(dir.path().join(format!("{collection}.json"))).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(parsed.is_object(), "{collection} should hold a JSON object");
    }

    let stored = store
        .get(HISTORY_COLLECTION, "https://cdn.test/5.mp4")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["chap"], "Full");
    assert_eq!(stored["work"]["name"], "Five");
    assert!(stored["work"].get("playList").is_none());
}
