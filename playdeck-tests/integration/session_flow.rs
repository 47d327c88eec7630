//! Session, controller and adapter working together.

use std::sync::Arc;

use playdeck_catalog::{MockCatalog, PlaylistItem, Work, WorkDetail, WorkId, WorkSummary};
use playdeck_core::history::HistoryItem;
use playdeck_core::session::NO_PLAYABLE_SOURCE;
use playdeck_core::streaming::EngineEvent;
use playdeck_core::test_fixtures::{EngineCall, SinkCall};
use playdeck_core::{MemoryStore, PlaybackMode, SelectionOutcome};
use playdeck_tests::TestPlayer;

fn series_detail() -> WorkDetail {
    WorkDetail {
        play_list: vec![
            PlaylistItem::new("http://cdn.test/series/1.mp4", "EP1"),
            PlaylistItem::new("http://cdn.test/series/2.m3u8", "EP2"),
        ],
        image: "https://img.test/series.jpg".to_string(),
    }
}

fn player_with(catalog: &MockCatalog) -> TestPlayer {
    let store = Arc::new(MemoryStore::new(&playdeck_core::HistoryStore::index_specs()));
    TestPlayer::mount(Arc::new(catalog.clone()), store)
}

#[tokio::test]
async fn test_history_resume_reuses_active_work() {
    let catalog = MockCatalog::new().with_detail(WorkId::new(10), series_detail());
    let player = player_with(&catalog);
    let candidate = WorkSummary::new(WorkId::new(10), "Series");

    player.session.select_play_list(candidate).await.unwrap();
    let first = player
        .session
        .controller()
        .play("http://cdn.test/series/1.mp4")
        .unwrap();
    first.recorded().await.unwrap();

    let entries = player.history.recent_history(10).await.unwrap();
    let outcome = player.session.resume(&entries[0]).await.unwrap().unwrap();
    let item = outcome.recorded().await.unwrap();

    assert_eq!(catalog.detail_query_count(), 1);
    assert_eq!(item.url, "https://cdn.test/series/1.mp4");
    assert_eq!(player.history.recent_history(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_resume_switches_work() {
    let catalog = MockCatalog::new()
        .with_detail(WorkId::new(10), series_detail())
        .with_detail(
            WorkId::new(11),
            WorkDetail {
                play_list: vec![PlaylistItem::new("https://cdn.test/other.mp4", "Full")],
                image: String::new(),
            },
        );
    let player = player_with(&catalog);

    player
        .session
        .select_play_list(WorkSummary::new(WorkId::new(11), "Other"))
        .await
        .unwrap();
    let other = player
        .session
        .controller()
        .play("https://cdn.test/other.mp4")
        .unwrap()
        .recorded()
        .await
        .unwrap();

    player
        .session
        .select_play_list(WorkSummary::new(WorkId::new(10), "Series"))
        .await
        .unwrap();
    assert_eq!(player.session.work().unwrap().id(), WorkId::new(10));

    player.session.resume(&other).await.unwrap().unwrap();

    assert_eq!(player.session.work().unwrap().id(), WorkId::new(11));
    assert_eq!(player.session.video_url(), "https://cdn.test/other.mp4");
    assert_eq!(catalog.detail_query_count(), 3);
}

#[tokio::test]
async fn test_resume_of_emptied_work_plays_nothing() {
    let catalog = MockCatalog::new()
        .with_detail(WorkId::new(10), series_detail())
        .with_detail(WorkId::new(12), WorkDetail::default());
    let player = player_with(&catalog);
    player
        .session
        .select_play_list(WorkSummary::new(WorkId::new(10), "Series"))
        .await
        .unwrap();
    let stale = HistoryItem {
        url: "https://cdn.test/12/1.mp4".to_string(),
        chap: "Full".to_string(),
        utime: 1_700_000_000,
        work: Work::from_parts(
            WorkSummary::new(WorkId::new(12), "Withdrawn"),
            WorkDetail {
                play_list: vec![PlaylistItem::new("https://cdn.test/12/1.mp4", "Full")],
                image: String::new(),
            },
        )
        .snapshot(),
    };

    let outcome = player.session.resume(&stale).await.unwrap();

    assert!(outcome.is_none());
    assert_eq!(player.session.work().unwrap().id(), WorkId::new(10));
    assert_eq!(player.session.video_url(), "");
    assert!(player.sink.calls().is_empty());
    assert!(player.engine.calls().is_empty());
    assert_eq!(player.notifier.messages(), vec![NO_PLAYABLE_SOURCE.to_string()]);
}

#[tokio::test]
async fn test_url_outside_playlist_writes_no_history() {
    let catalog = MockCatalog::new().with_detail(WorkId::new(10), series_detail());
    let player = player_with(&catalog);
    player
        .session
        .select_play_list(WorkSummary::new(WorkId::new(10), "Series"))
        .await
        .unwrap();

    let outcome = player
        .session
        .controller()
        .play("https://elsewhere.test/trailer.mp4")
        .unwrap();

    assert!(outcome.history_write.is_none());
    assert_eq!(player.session.video_url(), "https://elsewhere.test/trailer.mp4");
    assert!(player.history.recent_history(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_playlist_keeps_session() {
    let catalog = MockCatalog::new()
        .with_detail(WorkId::new(10), series_detail())
        .with_detail(WorkId::new(12), WorkDetail::default());
    let player = player_with(&catalog);
    player
        .session
        .select_play_list(WorkSummary::new(WorkId::new(10), "Series"))
        .await
        .unwrap();

    let outcome = player
        .session
        .select_play_list(WorkSummary::new(WorkId::new(12), "Nothing"))
        .await
        .unwrap();

    assert_eq!(outcome, SelectionOutcome::NoPlayableSource);
    assert_eq!(player.session.work().unwrap().id(), WorkId::new(10));
    assert_eq!(player.notifier.messages(), vec![NO_PLAYABLE_SOURCE.to_string()]);
    assert!(player.history.recent_history(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_adaptive_chapter_starts_after_manifest() {
    let catalog = MockCatalog::new().with_detail(WorkId::new(10), series_detail());
    let player = player_with(&catalog);
    player
        .session
        .select_play_list(WorkSummary::new(WorkId::new(10), "Series"))
        .await
        .unwrap();

    let outcome = player
        .session
        .controller()
        .play("http://cdn.test/series/2.m3u8")
        .unwrap();
    assert_eq!(outcome.mode, PlaybackMode::Adaptive);
    assert_eq!(outcome.recorded().await.unwrap().chap, "EP2");
    assert!(player.sink.calls().is_empty());
    assert_eq!(
        player.engine.calls(),
        vec![
            EngineCall::DetachMedia,
            EngineCall::AttachMedia,
            EngineCall::LoadSource("https://cdn.test/series/2.m3u8".to_string()),
        ]
    );

    player.engine.emit(EngineEvent::ManifestParsed {
        url: "https://cdn.test/series/2.m3u8".to_string(),
    });
    for _ in 0..100 {
        if !player.sink.calls().is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(player.sink.calls(), vec![SinkCall::Play]);
}

#[tokio::test]
async fn test_switching_sources_detaches_first() {
    let catalog = MockCatalog::new().with_detail(WorkId::new(10), series_detail());
    let player = player_with(&catalog);
    let controller = player.session.controller();

    controller.play("https://cdn.test/series/2.m3u8").unwrap();
    controller.play("https://cdn.test/series/1.mp4").unwrap();

    assert_eq!(
        player.engine.calls(),
        vec![
            EngineCall::DetachMedia,
            EngineCall::AttachMedia,
            EngineCall::LoadSource("https://cdn.test/series/2.m3u8".to_string()),
            EngineCall::DetachMedia,
        ]
    );
    assert_eq!(
        player.sink.calls(),
        vec![
            SinkCall::SetSource("https://cdn.test/series/1.mp4".to_string()),
            SinkCall::Play,
        ]
    );
}

#[tokio::test]
async fn test_unmounted_player_ignores_requests() {
    let catalog = MockCatalog::new();
    let player = player_with(&catalog);
    let controller = player.session.controller();

    player.adapter.unmount();

    assert!(controller.play("https://cdn.test/series/1.mp4").is_none());
    assert_eq!(player.session.video_url(), "");
    assert_eq!(
        player.engine.calls(),
        vec![EngineCall::DetachMedia, EngineCall::Destroy]
    );
}
