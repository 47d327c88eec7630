//! Playback backend abstractions.
//!
//! A resolved source is played through one of two backends. Adaptive
//! manifests go through a [`MediaEngine`] that parses the manifest and feeds
//! segments into the sink; everything else is handed to the [`MediaSink`]
//! directly. [`StreamingAdapter`] owns both and decides per source.

pub mod adapter;
pub mod headless;

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub use adapter::StreamingAdapter;
pub use headless::{HeadlessEngine, HeadlessSink, SinkState};

use crate::history::HistoryItem;
use crate::resolver::ResolvedUrl;
use crate::storage::StoreError;

/// Notifications emitted by a media engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The manifest at `url` was parsed and media can start.
    ManifestParsed {
        /// Source the engine was loading
        url: String,
    },
}

/// Adaptive streaming engine that parses manifests and feeds a sink.
///
/// Engine I/O runs on the engine's own tasks; these calls only issue
/// commands. Failures after `load_source` are the engine's concern.
pub trait MediaEngine: Send + Sync + std::fmt::Debug {
    /// Binds the engine to `sink` for segment output.
    fn attach_media(&self, sink: Arc<dyn MediaSink>);

    /// Unbinds the engine from whatever sink it fed.
    fn detach_media(&self);

    /// Starts loading the manifest at `url`.
    fn load_source(&self, url: &str);

    /// Releases all engine resources. No calls are valid afterwards.
    fn destroy(&self);

    /// Subscribes to engine events.
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;
}

/// Media element capable of playing a URL directly.
pub trait MediaSink: Send + Sync + std::fmt::Debug {
    /// Points the sink at `url`.
    fn set_source(&self, url: &str);

    /// Begins playback of the current source.
    fn play(&self);
}

/// Which backend a source was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Manifest loaded through the media engine
    Adaptive,
    /// URL assigned to the sink directly
    Progressive,
}

impl std::fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackMode::Adaptive => write!(f, "adaptive"),
            PlaybackMode::Progressive => write!(f, "progressive"),
        }
    }
}

/// Result of a successful play request.
#[derive(Debug)]
pub struct PlaybackOutcome {
    /// Normalized source that is now playing
    pub url: ResolvedUrl,
    /// Backend the source was routed to
    pub mode: PlaybackMode,
    /// Background history write, present when the URL is a chapter of the
    /// active work
    pub history_write: Option<JoinHandle<Result<HistoryItem, StoreError>>>,
}

impl PlaybackOutcome {
    /// Waits for the history write to finish, if one was started.
    ///
    /// Returns `None` when no write was started or it failed.
    pub async fn recorded(self) -> Option<HistoryItem> {
        let handle = self.history_write?;
        match handle.await {
            Ok(Ok(item)) => Some(item),
            Ok(Err(e)) => {
                tracing::warn!("History write for {} failed: {}", self.url, e);
                None
            }
            Err(e) => {
                tracing::warn!("History write task for {} did not finish: {}", self.url, e);
                None
            }
        }
    }
}
