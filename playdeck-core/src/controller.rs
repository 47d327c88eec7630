//! Late-bound playback command slot.
//!
//! The media sink is mounted in exactly one place, while requests to play
//! something come from surfaces that never see it (the history list, the
//! search results). The sink owner claims the single writer of a shared
//! slot and publishes its play capability there; everyone else holds a
//! cheap reader handle and invokes whatever is currently published.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::streaming::PlaybackOutcome;

/// Something that can start playback of a raw source.
pub trait PlayCapability: Send + Sync {
    /// Plays `raw_url`; `None` when nothing was started.
    fn play(&self, raw_url: &str) -> Option<PlaybackOutcome>;
}

/// Errors raised by the controller slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    /// A second sink owner tried to take the writer
    #[error("playback controller writer is already claimed")]
    WriterAlreadyClaimed,
}

#[derive(Default)]
struct ControllerSlot {
    current: RwLock<Option<Arc<dyn PlayCapability>>>,
    claimed: AtomicBool,
    publications: AtomicU64,
}

impl std::fmt::Debug for ControllerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerSlot")
            .field("bound", &self.current.read().is_some())
            .field("claimed", &self.claimed.load(Ordering::SeqCst))
            .field("publications", &self.publications.load(Ordering::SeqCst))
            .finish()
    }
}

/// Reader handle used to request playback from anywhere in the app.
///
/// Cloning is cheap; all clones observe the same slot.
#[derive(Debug, Clone, Default)]
pub struct PlaybackController {
    slot: Arc<ControllerSlot>,
}

impl PlaybackController {
    /// Creates an unbound controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when a sink owner has published a capability.
    pub fn is_bound(&self) -> bool {
        self.slot.current.read().is_some()
    }

    /// Number of publications so far, across all writers.
    pub fn publication_count(&self) -> u64 {
        self.slot.publications.load(Ordering::SeqCst)
    }

    /// Plays `raw_url` through the published capability.
    ///
    /// Returns `None` without error when no sink is mounted yet.
    pub fn play(&self, raw_url: &str) -> Option<PlaybackOutcome> {
        // Clone out of the lock so a capability may republish while playing.
        let capability = self.slot.current.read().clone();
        match capability {
            Some(capability) => capability.play(raw_url),
            None => {
                tracing::debug!("Play request for '{}' ignored: no sink mounted", raw_url);
                None
            }
        }
    }

    /// Takes the single writer of this slot.
    ///
    /// # Errors
    ///
    /// - `ControllerError::WriterAlreadyClaimed` - If another writer is alive
    pub fn claim_writer(&self) -> Result<ControllerWriter, ControllerError> {
        self.slot
            .claimed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ControllerError::WriterAlreadyClaimed)?;

        Ok(ControllerWriter {
            slot: Arc::clone(&self.slot),
        })
    }
}

/// Exclusive write access to the controller slot.
///
/// Dropping the writer clears the slot and releases the claim, so a later
/// mount can take over.
#[derive(Debug)]
pub struct ControllerWriter {
    slot: Arc<ControllerSlot>,
}

impl ControllerWriter {
    /// Publishes `capability`, replacing whatever was published before.
    ///
    /// Sink owners call this on every update so readers never invoke a
    /// capability built from outdated state.
    pub fn publish(&self, capability: Arc<dyn PlayCapability>) {
        *self.slot.current.write() = Some(capability);
        self.slot.publications.fetch_add(1, Ordering::SeqCst);
    }

    /// Clears the slot; subsequent plays become no-ops.
    pub fn revoke(&self) {
        *self.slot.current.write() = None;
    }
}

impl Drop for ControllerWriter {
    fn drop(&mut self) {
        self.revoke();
        self.slot.claimed.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingCapability {
        label: &'static str,
        calls: Mutex<Vec<String>>,
    }

    impl PlayCapability for RecordingCapability {
        fn play(&self, raw_url: &str) -> Option<PlaybackOutcome> {
            self.calls.lock().push(format!("{}:{raw_url}", self.label));
            None
        }
    }

    #[test]
    fn test_unbound_play_is_noop() {
        let controller = PlaybackController::new();

        assert!(!controller.is_bound());
        assert!(controller.play("https://a.test/v.mp4").is_none());
    }

    #[test]
    fn test_published_capability_receives_calls() {
        let controller = PlaybackController::new();
        let reader = controller.clone();
        let writer = controller.claim_writer().unwrap();
        let capability = Arc::new(RecordingCapability {
            label: "sink",
            ..Default::default()
        });

        writer.publish(capability.clone());
        reader.play("https://a.test/v.mp4");

        assert!(reader.is_bound());
        assert_eq!(*capability.calls.lock(), vec!["sink:https://a.test/v.mp4"]);
    }

    #[test]
    fn test_republish_replaces_previous() {
        let controller = PlaybackController::new();
        let writer = controller.claim_writer().unwrap();
        let stale = Arc::new(RecordingCapability {
            label: "stale",
            ..Default::default()
        });
        let fresh = Arc::new(RecordingCapability {
            label: "fresh",
            ..Default::default()
        });

        writer.publish(stale.clone());
        writer.publish(fresh.clone());
        controller.play("x.test/1");

        assert!(stale.calls.lock().is_empty());
        assert_eq!(fresh.calls.lock().len(), 1);
        assert_eq!(controller.publication_count(), 2);
    }

    #[test]
    fn test_single_writer() {
        let controller = PlaybackController::new();
        let writer = controller.claim_writer().unwrap();

        assert_eq!(
            controller.claim_writer().unwrap_err(),
            ControllerError::WriterAlreadyClaimed
        );

        drop(writer);
        assert!(controller.claim_writer().is_ok());
    }

    #[test]
    fn test_dropping_writer_unbinds() {
        let controller = PlaybackController::new();
        let writer = controller.claim_writer().unwrap();
        writer.publish(Arc::new(RecordingCapability::default()));
        assert!(controller.is_bound());

        drop(writer);
        assert!(!controller.is_bound());
        assert!(controller.play("x.test/1").is_none());
    }
}
