//! Engine and sink without a display, used by the command line.
//!
//! The headless engine treats every manifest as parsed the moment it is
//! loaded, so playback state can be followed end to end in logs.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::{EngineEvent, MediaEngine, MediaSink};

const EVENT_CAPACITY: usize = 16;

/// Media engine that acknowledges manifests immediately.
#[derive(Debug)]
pub struct HeadlessEngine {
    events: broadcast::Sender<EngineEvent>,
    attached: RwLock<Option<Arc<dyn MediaSink>>>,
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessEngine {
    /// Creates a detached engine.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            events,
            attached: RwLock::new(None),
        }
    }

    /// Returns true while a sink is attached.
    pub fn is_attached(&self) -> bool {
        self.attached.read().is_some()
    }
}

impl MediaEngine for HeadlessEngine {
    fn attach_media(&self, sink: Arc<dyn MediaSink>) {
        *self.attached.write() = Some(sink);
    }

    fn detach_media(&self) {
        self.attached.write().take();
    }

    fn load_source(&self, url: &str) {
        if !self.is_attached() {
            tracing::warn!("Manifest {} loaded with no sink attached", url);
            return;
        }
        tracing::debug!("Loaded manifest {}", url);
        // No receivers only means nobody listens yet.
        let _ = self.events.send(EngineEvent::ManifestParsed {
            url: url.to_string(),
        });
    }

    fn destroy(&self) {
        self.detach_media();
        tracing::debug!("Headless engine destroyed");
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

/// What a headless sink is currently doing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkState {
    /// Source assigned directly, if any
    pub source: Option<String>,
    /// Whether playback was started
    pub playing: bool,
}

/// Media sink that only tracks its state.
#[derive(Debug, Default)]
pub struct HeadlessSink {
    state: RwLock<SinkState>,
}

impl HeadlessSink {
    /// Creates an idle sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current sink state.
    pub fn state(&self) -> SinkState {
        self.state.read().clone()
    }
}

impl MediaSink for HeadlessSink {
    fn set_source(&self, url: &str) {
        let mut state = self.state.write();
        state.source = Some(url.to_string());
        state.playing = false;
    }

    fn play(&self) {
        self.state.write().playing = true;
        tracing::info!("Playback started");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manifest_parsed_after_load() {
        let engine = HeadlessEngine::new();
        let mut events = engine.subscribe();

        engine.attach_media(Arc::new(HeadlessSink::new()));
        engine.load_source("https://a.test/index.m3u8");

        assert_eq!(
            events.recv().await.unwrap(),
            EngineEvent::ManifestParsed {
                url: "https://a.test/index.m3u8".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_detached_engine_stays_silent() {
        let engine = HeadlessEngine::new();
        let mut events = engine.subscribe();

        engine.load_source("https://a.test/index.m3u8");

        assert!(events.try_recv().is_err());
        assert!(!engine.is_attached());
    }

    #[test]
    fn test_sink_tracks_source_and_play() {
        let sink = HeadlessSink::new();
        sink.set_source("https://a.test/v.mp4");
        assert!(!sink.state().playing);

        sink.play();
        assert_eq!(
            sink.state(),
            SinkState {
                source: Some("https://a.test/v.mp4".to_string()),
                playing: true,
            }
        );
    }
}
