//! Shared setup for Playdeck integration and end-to-end tests.

use std::sync::Arc;

use playdeck_catalog::CatalogService;
use playdeck_core::config::PlaybackConfig;
use playdeck_core::test_fixtures::{RecordingEngine, RecordingNotifier, RecordingSink};
use playdeck_core::{HistoryStore, KeyValueStore, PlayerSession, StreamingAdapter};

/// A session with a mounted recording backend.
pub struct TestPlayer {
    pub session: PlayerSession,
    pub history: HistoryStore,
    pub notifier: Arc<RecordingNotifier>,
    pub engine: Arc<RecordingEngine>,
    pub sink: Arc<RecordingSink>,
    pub adapter: StreamingAdapter,
}

impl TestPlayer {
    /// Builds a player over `catalog` persisting history in `store`.
    ///
    /// # Panics
    ///
    /// Panics if the adapter cannot be mounted, which only happens when the
    /// session already has a mounted adapter.
    pub fn mount(catalog: Arc<dyn CatalogService>, store: Arc<dyn KeyValueStore>) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let session = PlayerSession::new(catalog, notifier.clone());
        let history = HistoryStore::new(store);
        let engine = Arc::new(RecordingEngine::new());
        let sink = Arc::new(RecordingSink::default());
        let adapter = StreamingAdapter::mount(
            &session,
            engine.clone(),
            sink.clone(),
            history.clone(),
            &PlaybackConfig::default(),
        )
        .expect("fresh session has no mounted adapter");

        Self {
            session,
            history,
            notifier,
            engine,
            sink,
            adapter,
        }
    }
}
