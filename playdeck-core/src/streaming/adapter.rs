//! Binds a media sink and engine to a player session.

use std::sync::Arc;

use playdeck_catalog::Work;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::{EngineEvent, MediaEngine, MediaSink, PlaybackMode, PlaybackOutcome};
use crate::config::PlaybackConfig;
use crate::controller::{ControllerError, ControllerWriter, PlayCapability};
use crate::history::{HistoryItem, HistoryStore};
use crate::resolver::{ResolvePolicy, ResolvedUrl, resolve_with};
use crate::session::PlayerSession;
use crate::storage::StoreError;

/// Owner of the media sink for one mount.
///
/// While mounted, the adapter's play capability is published to the
/// session's controller, so any surface holding the controller can start
/// playback. Unmounting (or dropping) detaches and destroys the engine and
/// unbinds the controller.
#[derive(Debug)]
pub struct StreamingAdapter {
    backend: Arc<Backend>,
    writer: Option<ControllerWriter>,
    listener: JoinHandle<()>,
}

#[derive(Debug)]
struct Backend {
    engine: Arc<dyn MediaEngine>,
    sink: Arc<dyn MediaSink>,
    session: PlayerSession,
    history: HistoryStore,
    policy: ResolvePolicy,
    manifest_suffix: String,
    runtime: Handle,
}

impl StreamingAdapter {
    /// Mounts the sink and publishes its play capability.
    ///
    /// Must be called from within a tokio runtime. The engine event
    /// listener and history writes run on that runtime, so the controller
    /// may be played from threads outside it.
    ///
    /// # Errors
    ///
    /// - `ControllerError::WriterAlreadyClaimed` - If another adapter is
    ///   mounted on the same session
    pub fn mount(
        session: &PlayerSession,
        engine: Arc<dyn MediaEngine>,
        sink: Arc<dyn MediaSink>,
        history: HistoryStore,
        config: &PlaybackConfig,
    ) -> Result<Self, ControllerError> {
        let writer = session.controller().claim_writer()?;

        let backend = Arc::new(Backend {
            engine,
            sink,
            session: session.clone(),
            history,
            policy: ResolvePolicy {
                upgrade_insecure: config.upgrade_insecure,
            },
            manifest_suffix: config.adaptive_manifest_suffix.to_string(),
            runtime: Handle::current(),
        });

        let listener = spawn_event_listener(
            &backend.runtime,
            backend.engine.subscribe(),
            Arc::clone(&backend.sink),
        );
        writer.publish(backend.clone());

        tracing::debug!("Streaming adapter mounted");
        Ok(Self {
            backend,
            writer: Some(writer),
            listener,
        })
    }

    /// Republishes the play capability.
    pub fn refresh(&self) {
        if let Some(writer) = &self.writer {
            writer.publish(self.backend.clone());
        }
    }

    /// Plays `raw_url` directly, bypassing the controller.
    pub fn play(&self, raw_url: &str) -> Option<PlaybackOutcome> {
        self.backend.start(raw_url)
    }

    /// Tears the mount down.
    pub fn unmount(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        let Some(writer) = self.writer.take() else {
            return;
        };
        drop(writer);
        self.listener.abort();
        self.backend.engine.detach_media();
        self.backend.engine.destroy();
        tracing::debug!("Streaming adapter unmounted");
    }
}

impl Drop for StreamingAdapter {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl PlayCapability for Backend {
    fn play(&self, raw_url: &str) -> Option<PlaybackOutcome> {
        self.start(raw_url)
    }
}

impl Backend {
    fn start(&self, raw_url: &str) -> Option<PlaybackOutcome> {
        self.engine.detach_media();

        let url = match resolve_with(raw_url, self.policy) {
            Ok(url) => url,
            Err(e) => {
                // Unresolvable sources are dropped without user feedback.
                tracing::debug!("Ignoring play request: {}", e);
                return None;
            }
        };

        self.session.set_video_url(url.as_str());
        let history_write = self
            .session
            .work()
            .and_then(|work| self.spawn_history_write(&url, raw_url, work));

        let mode = if url.has_path_suffix(&self.manifest_suffix) {
            self.engine.attach_media(Arc::clone(&self.sink));
            self.engine.load_source(url.as_str());
            PlaybackMode::Adaptive
        } else {
            self.sink.set_source(url.as_str());
            self.sink.play();
            PlaybackMode::Progressive
        };

        tracing::info!("Playing {} ({})", url, mode);
        Some(PlaybackOutcome {
            url,
            mode,
            history_write,
        })
    }

    fn spawn_history_write(
        &self,
        url: &ResolvedUrl,
        raw_url: &str,
        work: Work,
    ) -> Option<JoinHandle<Result<HistoryItem, StoreError>>> {
        let chapter = work
            .play_list
            .iter()
            .find(|item| self.is_chapter_of(item.url.as_str(), raw_url, url))?
            .name
            .clone();

        let history = self.history.clone();
        let url = url.as_str().to_string();
        Some(self.runtime.spawn(async move {
            let result = history.record_play(&url, &chapter, &work).await;
            if let Err(e) = &result {
                tracing::warn!("Failed to record play of {}: {}", url, e);
            }
            result
        }))
    }

    fn is_chapter_of(&self, chapter_url: &str, raw_url: &str, resolved: &ResolvedUrl) -> bool {
        chapter_url.trim() == raw_url.trim()
            || resolve_with(chapter_url, self.policy)
                .is_ok_and(|chapter| chapter.as_str() == resolved.as_str())
    }
}

fn spawn_event_listener(
    runtime: &Handle,
    mut events: broadcast::Receiver<EngineEvent>,
    sink: Arc<dyn MediaSink>,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        loop {
            match events.recv().await {
                Ok(EngineEvent::ManifestParsed { url }) => {
                    tracing::debug!("Manifest parsed for {}, starting playback", url);
                    sink.play();
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Engine event listener lagged by {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use playdeck_catalog::{MockCatalog, PlaylistItem, WorkDetail, WorkId, WorkSummary};

    use super::*;
    use crate::storage::MemoryStore;
    use crate::test_fixtures::{
        EngineCall, RecordingEngine, RecordingNotifier, RecordingSink, SinkCall,
    };

    struct Fixture {
        session: PlayerSession,
        engine: Arc<RecordingEngine>,
        sink: Arc<RecordingSink>,
        history: HistoryStore,
        catalog: MockCatalog,
    }

    impl Fixture {
        fn new() -> Self {
            let catalog = MockCatalog::new();
            let session = PlayerSession::new(
                Arc::new(catalog.clone()),
                Arc::new(RecordingNotifier::default()),
            );
            let store = Arc::new(MemoryStore::new(&HistoryStore::index_specs()));
            Self {
                session,
                engine: Arc::new(RecordingEngine::new()),
                sink: Arc::new(RecordingSink::default()),
                history: HistoryStore::new(store),
                catalog,
            }
        }

        fn mount(&self) -> StreamingAdapter {
            StreamingAdapter::mount(
                &self.session,
                self.engine.clone(),
                self.sink.clone(),
                self.history.clone(),
                &PlaybackConfig::default(),
            )
            .unwrap()
        }

        async fn select_work(&self, id: i64, urls: &[&str]) {
            let detail = WorkDetail {
                play_list: urls
                    .iter()
                    .enumerate()
                    .map(|(i, url)| PlaylistItem::new(*url, format!("EP{}", i + 1)))
                    .collect(),
                image: String::new(),
            };
            self.catalog.clone().with_detail(WorkId::new(id), detail);
            self.session
                .select_play_list(WorkSummary::new(WorkId::new(id), "Sample"))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_progressive_source_goes_to_sink() {
        let fixture = Fixture::new();
        let adapter = fixture.mount();

        let outcome = adapter.play("http://a.test/v.mp4").unwrap();

        assert_eq!(outcome.mode, PlaybackMode::Progressive);
        assert_eq!(outcome.url.as_str(), "https://a.test/v.mp4");
        assert_eq!(
            fixture.sink.calls(),
            vec![
                SinkCall::SetSource("https://a.test/v.mp4".to_string()),
                SinkCall::Play
            ]
        );
        assert_eq!(fixture.engine.calls(), vec![EngineCall::DetachMedia]);
        assert_eq!(fixture.session.video_url(), "https://a.test/v.mp4");
    }

    #[tokio::test]
    async fn test_manifest_goes_through_engine() {
        let fixture = Fixture::new();
        let adapter = fixture.mount();

        let outcome = adapter.play("https://a.test/live/index.M3U8").unwrap();

        assert_eq!(outcome.mode, PlaybackMode::Adaptive);
        assert_eq!(
            fixture.engine.calls(),
            vec![
                EngineCall::DetachMedia,
                EngineCall::AttachMedia,
                EngineCall::LoadSource("https://a.test/live/index.M3U8".to_string()),
            ]
        );
        assert!(fixture.sink.calls().is_empty());

        fixture.engine.emit(EngineEvent::ManifestParsed {
            url: "https://a.test/live/index.M3U8".to_string(),
        });
        for _ in 0..50 {
            if !fixture.sink.calls().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(fixture.sink.calls(), vec![SinkCall::Play]);
    }

    #[tokio::test]
    async fn test_unresolvable_source_only_detaches() {
        let fixture = Fixture::new();
        let adapter = fixture.mount();

        assert!(adapter.play("   ").is_none());

        assert_eq!(fixture.engine.calls(), vec![EngineCall::DetachMedia]);
        assert!(fixture.sink.calls().is_empty());
        assert_eq!(fixture.session.video_url(), "");
    }

    #[tokio::test]
    async fn test_chapter_play_records_history() {
        let fixture = Fixture::new();
        fixture
            .select_work(7, &["http://cdn.test/7/1.mp4", "http://cdn.test/7/2.mp4"])
            .await;
        let adapter = fixture.mount();

        let outcome = adapter.play("http://cdn.test/7/2.mp4").unwrap();
        let item = outcome.recorded().await.unwrap();

        assert_eq!(item.url, "https://cdn.test/7/2.mp4");
        assert_eq!(item.chap, "EP2");
        assert_eq!(item.work.id(), WorkId::new(7));
        assert!(
            fixture
                .history
                .cached_work(WorkId::new(7))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_resolved_form_matches_chapter() {
        let fixture = Fixture::new();
        fixture.select_work(8, &["http://cdn.test/8/1.mp4"]).await;
        let adapter = fixture.mount();

        let outcome = adapter.play("https://cdn.test/8/1.mp4").unwrap();
        let item = outcome.recorded().await.unwrap();

        assert_eq!(item.chap, "EP1");
    }

    #[tokio::test]
    async fn test_foreign_url_is_not_recorded() {
        let fixture = Fixture::new();
        fixture.select_work(9, &["http://cdn.test/9/1.mp4"]).await;
        let adapter = fixture.mount();

        let outcome = adapter.play("https://elsewhere.test/v.mp4").unwrap();

        assert!(outcome.history_write.is_none());
        assert!(fixture.history.recent_history(10).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_play_from_thread_outside_runtime() {
        let fixture = Fixture::new();
        fixture.select_work(11, &["http://a.test/v.mp4"]).await;
        let _adapter = fixture.mount();
        let controller = fixture.session.controller();

        let outcome = std::thread::spawn(move || controller.play("http://a.test/v.mp4"))
            .join()
            .unwrap()
            .unwrap();
        let item = outcome.recorded().await.unwrap();

        assert_eq!(item.url, "https://a.test/v.mp4");
        assert_eq!(item.chap, "EP1");
        assert_eq!(fixture.history.recent_history(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_controller_routes_to_adapter() {
        let fixture = Fixture::new();
        let controller = fixture.session.controller();
        assert!(controller.play("https://a.test/v.mp4").is_none());

        let adapter = fixture.mount();
        let outcome = controller.play("https://a.test/v.mp4").unwrap();
        assert_eq!(outcome.mode, PlaybackMode::Progressive);

        adapter.refresh();
        assert_eq!(controller.publication_count(), 2);
    }

    #[tokio::test]
    async fn test_second_mount_is_rejected() {
        let fixture = Fixture::new();
        let _adapter = fixture.mount();

        let second = StreamingAdapter::mount(
            &fixture.session,
            Arc::new(RecordingEngine::new()),
            Arc::new(RecordingSink::default()),
            fixture.history.clone(),
            &PlaybackConfig::default(),
        );
        assert!(matches!(second, Err(ControllerError::WriterAlreadyClaimed)));
    }

    #[tokio::test]
    async fn test_unmount_releases_engine_and_controller() {
        let fixture = Fixture::new();
        let adapter = fixture.mount();

        adapter.unmount();

        assert_eq!(
            fixture.engine.calls(),
            vec![EngineCall::DetachMedia, EngineCall::Destroy]
        );
        assert!(!fixture.session.controller().is_bound());
        assert!(fixture.session.controller().play("https://a.test/v.mp4").is_none());

        // A new mount can take over
        let _again = fixture.mount();
        assert!(fixture.session.controller().is_bound());
    }
}
