//! Test doubles for sessions, backends and history.
//!
//! Recording implementations capture every call so tests can assert the
//! exact sequence a component issued.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::history::Clock;
use crate::session::Notifier;
use crate::streaming::{EngineEvent, MediaEngine, MediaSink};

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Creates a clock reading `start` unix seconds.
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Notifier that keeps every message and loading change.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    loading: Mutex<Vec<bool>>,
}

impl RecordingNotifier {
    /// Advisory messages shown so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Every loading indicator change, in order.
    pub fn loading_changes(&self) -> Vec<bool> {
        self.loading.lock().clone()
    }

    /// Whether the loading indicator is currently on.
    pub fn is_loading(&self) -> bool {
        self.loading.lock().last().copied().unwrap_or(false)
    }
}

impl Notifier for RecordingNotifier {
    fn show_message(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }

    fn set_loading(&self, loading: bool) {
        self.loading.lock().push(loading);
    }
}

/// Calls received by a [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    AttachMedia,
    DetachMedia,
    LoadSource(String),
    Destroy,
}

/// Media engine that records calls and emits events on demand.
#[derive(Debug)]
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
    events: broadcast::Sender<EngineEvent>,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingEngine {
    /// Creates an engine with no recorded calls.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            calls: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    /// Delivers `event` to all subscribers.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }
}

impl MediaEngine for RecordingEngine {
    fn attach_media(&self, _sink: Arc<dyn MediaSink>) {
        self.calls.lock().push(EngineCall::AttachMedia);
    }

    fn detach_media(&self) {
        self.calls.lock().push(EngineCall::DetachMedia);
    }

    fn load_source(&self, url: &str) {
        self.calls.lock().push(EngineCall::LoadSource(url.to_string()));
    }

    fn destroy(&self) {
        self.calls.lock().push(EngineCall::Destroy);
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

/// Calls received by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    SetSource(String),
    Play,
}

/// Media sink that records calls.
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
}

impl RecordingSink {
    /// Calls received so far.
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().clone()
    }
}

impl MediaSink for RecordingSink {
    fn set_source(&self, url: &str) {
        self.calls.lock().push(SinkCall::SetSource(url.to_string()));
    }

    fn play(&self) {
        self.calls.lock().push(SinkCall::Play);
    }
}
