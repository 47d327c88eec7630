//! Search, select, play and browse back through history.

use std::sync::Arc;

use playdeck_catalog::{DemoCatalog, MockCatalog, PlaylistItem, WorkDetail, WorkId, WorkSummary};
use playdeck_core::session::EMPTY_KEYWORD;
use playdeck_core::test_fixtures::SinkCall;
use playdeck_core::{HistoryStore, MemoryStore, PlaybackMode, SelectionOutcome};
use playdeck_tests::TestPlayer;

fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(&HistoryStore::index_specs()))
}

#[tokio::test]
async fn test_search_select_play_records_history() {
    let catalog = MockCatalog::new()
        .with_search_results(vec![WorkSummary::new(WorkId::new(1), "Foo")])
        .with_detail(
            WorkId::new(1),
            WorkDetail {
                play_list: vec![PlaylistItem::new("http://example.com/v.mp4", "EP1")],
                image: String::new(),
            },
        );
    let player = TestPlayer::mount(Arc::new(catalog.clone()), memory_store());

    let results = player.session.search("foo").await.unwrap();
    assert_eq!(results.len(), 1);

    let selection = player
        .session
        .select_search_result(results[0].clone(), "foo")
        .await
        .unwrap();
    assert_eq!(selection, SelectionOutcome::Selected);

    let work = player.session.work().unwrap();
    let played_after = chrono::Utc::now().timestamp();
    let outcome = player
        .session
        .controller()
        .play(&work.play_list[0].url)
        .unwrap();
    assert_eq!(outcome.mode, PlaybackMode::Progressive);
    outcome.recorded().await.unwrap();
    let played_before = chrono::Utc::now().timestamp();

    assert_eq!(player.session.video_url(), "https://example.com/v.mp4");
    assert_eq!(
        player.sink.calls(),
        vec![
            SinkCall::SetSource("https://example.com/v.mp4".to_string()),
            SinkCall::Play,
        ]
    );

    let history = player.history.recent_history(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].url, "https://example.com/v.mp4");
    assert_eq!(history[0].chap, "EP1");
    assert_eq!(history[0].work.summary.keywords.as_deref(), Some("foo"));
    assert!(
        (played_after..=played_before).contains(&history[0].utime),
        "utime {} outside {}..={}",
        history[0].utime,
        played_after,
        played_before
    );
}

#[tokio::test]
async fn test_demo_catalog_session() {
    let player = TestPlayer::mount(Arc::new(DemoCatalog::new()), memory_store());

    let results = player.session.search("harbor").await.unwrap();
    let names: Vec<&str> = results.iter().map(|work| work.name.as_str()).collect();
    assert!(names.contains(&"Harbor Lights"));
    assert!(names.contains(&"Harbor Lights: The Return"));

    let sequel = results
        .iter()
        .find(|work| work.name == "Harbor Lights: The Return")
        .cloned()
        .unwrap();
    player
        .session
        .select_search_result(sequel, "harbor")
        .await
        .unwrap();

    // The sequel's only source has padding and no scheme
    let raw = player.session.work().unwrap().play_list[0].url.clone();
    let outcome = player.session.controller().play(&raw).unwrap();
    let item = outcome.recorded().await.unwrap();

    assert_eq!(
        player.session.video_url(),
        "media.demo.playdeck/harbor-return/full.mp4"
    );
    assert_eq!(item.url, "media.demo.playdeck/harbor-return/full.mp4");
}

#[tokio::test]
async fn test_demo_work_without_sources() {
    let player = TestPlayer::mount(Arc::new(DemoCatalog::new()), memory_store());

    let results = player.session.search("lost reel").await.unwrap();
    let lost = results
        .iter()
        .find(|work| work.name == "Lost Reel")
        .cloned()
        .unwrap();

    let outcome = player
        .session
        .select_search_result(lost, "lost reel")
        .await
        .unwrap();

    assert_eq!(outcome, SelectionOutcome::NoPlayableSource);
    assert!(player.session.work().is_none());
    assert_eq!(player.notifier.messages().len(), 1);
    assert!(player.history.recent_history(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_search_is_rejected() {
    let catalog = MockCatalog::new();
    let player = TestPlayer::mount(Arc::new(catalog.clone()), memory_store());

    let results = player.session.search("").await.unwrap();

    assert!(results.is_empty());
    assert_eq!(catalog.search_query_count(), 0);
    assert_eq!(player.notifier.messages(), vec![EMPTY_KEYWORD.to_string()]);
}

#[tokio::test]
async fn test_browse_back_through_history() {
    let catalog = MockCatalog::new()
        .with_detail(
            WorkId::new(1),
            WorkDetail {
                play_list: vec![PlaylistItem::new("https://a.test/1.mp4", "A1")],
                image: String::new(),
            },
        )
        .with_detail(
            WorkId::new(2),
            WorkDetail {
                play_list: vec![PlaylistItem::new("https://b.test/1.m3u8", "B1")],
                image: String::new(),
            },
        );
    let player = TestPlayer::mount(Arc::new(catalog.clone()), memory_store());
    let controller = player.session.controller();

    for (id, url) in [(1, "https://a.test/1.mp4"), (2, "https://b.test/1.m3u8")] {
        player
            .session
            .select_play_list(WorkSummary::new(WorkId::new(id), format!("Work {id}")))
            .await
            .unwrap();
        controller.play(url).unwrap().recorded().await.unwrap();
    }

    let entries = player.history.recent_history(10).await.unwrap();
    assert_eq!(entries.len(), 2);
    let first_work = entries
        .iter()
        .find(|item| item.work.id() == WorkId::new(1))
        .unwrap();

    let outcome = player.session.resume(first_work).await.unwrap().unwrap();

    assert_eq!(outcome.mode, PlaybackMode::Progressive);
    assert_eq!(player.session.work().unwrap().id(), WorkId::new(1));
    assert_eq!(player.session.video_url(), "https://a.test/1.mp4");
}
