//! Playdeck Core - Playback session core for a video catalog player
//!
//! This crate holds everything between a catalog query and a playing video:
//! source resolution, backend selection, the player session with its
//! selection rules, the playback controller shared across UI surfaces,
//! viewing history persistence and the auto-hiding search overlay.

pub mod config;
pub mod controller;
pub mod history;
pub mod overlay;
pub mod resolver;
pub mod session;
pub mod storage;
pub mod streaming;
pub mod tracing_setup;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;

// Re-export main types for convenient access
pub use config::PlaydeckConfig;
pub use controller::{ControllerError, ControllerWriter, PlayCapability, PlaybackController};
pub use history::{HistoryItem, HistoryStore};
pub use overlay::{OverlayHandle, SearchOverlay};
pub use resolver::{ResolveError, ResolvedUrl, resolve};
pub use session::{Notifier, PlayerSession, SelectionOutcome, SessionState};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};
pub use streaming::{MediaEngine, MediaSink, PlaybackMode, PlaybackOutcome, StreamingAdapter};

use playdeck_catalog::CatalogError;

/// Errors that can bubble up from any Playdeck subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PlaydeckError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Controller error: {0}")]
    Controller(#[from] ControllerError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

impl PlaydeckError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            PlaydeckError::Catalog(e) => match e {
                CatalogError::WorkNotFound { id } => format!("Work {id} is not in the catalog"),
                CatalogError::NetworkError { .. } => {
                    "Could not reach the catalog service".to_string()
                }
                _ => "Catalog error occurred".to_string(),
            },
            PlaydeckError::Storage(_) => "Could not access viewing history".to_string(),
            PlaydeckError::Controller(_) => "Another player is already active".to_string(),
            PlaydeckError::Configuration { reason } => format!("Invalid configuration: {reason}"),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            PlaydeckError::Configuration { .. }
                | PlaydeckError::Catalog(CatalogError::WorkNotFound { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, PlaydeckError>;

#[cfg(test)]
mod tests {
    use playdeck_catalog::WorkId;

    use super::*;

    #[test]
    fn test_user_messages() {
        let missing = PlaydeckError::from(CatalogError::WorkNotFound {
            id: WorkId::new(9),
        });
        assert_eq!(missing.user_message(), "Work 9 is not in the catalog");
        assert!(missing.is_user_error());

        let offline = PlaydeckError::from(CatalogError::NetworkError {
            reason: "timeout".to_string(),
        });
        assert_eq!(offline.user_message(), "Could not reach the catalog service");
        assert!(!offline.is_user_error());
    }

    #[test]
    fn test_controller_error_converts() {
        let error = PlaydeckError::from(ControllerError::WriterAlreadyClaimed);
        assert!(matches!(error, PlaydeckError::Controller(_)));
        assert!(!error.is_user_error());
    }
}
