//! Centralized configuration for Playdeck.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;

/// Central configuration for all Playdeck components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct PlaydeckConfig {
    pub storage: StorageConfig,
    pub history: HistoryConfig,
    pub playback: PlaybackConfig,
    pub overlay: OverlayConfig,
}

/// Durable store location and file handling.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding one JSON file per collection
    pub data_dir: PathBuf,
    /// Suffix for files being written before they replace a collection
    pub temp_file_suffix: &'static str,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("playdeck-data"),
            temp_file_suffix: ".tmp",
        }
    }
}

/// Viewing history settings.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Number of entries the history list shows
    pub recent_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { recent_limit: 10 }
    }
}

/// Source resolution and backend selection.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Rewrite `http:` sources to `https:` before playback
    pub upgrade_insecure: bool,
    /// Path suffix identifying adaptive manifests
    pub adaptive_manifest_suffix: &'static str,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            upgrade_insecure: true,
            adaptive_manifest_suffix: crate::resolver::ADAPTIVE_MANIFEST_SUFFIX,
        }
    }
}

/// Search overlay geometry.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Overlay height assumed until the first height observation
    pub initial_height: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            initial_height: 74.0,
        }
    }
}

impl PlaydeckConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(data_dir) = std::env::var("PLAYDECK_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(limit) = std::env::var("PLAYDECK_HISTORY_LIMIT") {
            if let Ok(count) = limit.parse::<usize>() {
                config.history.recent_limit = count;
            }
        }

        if let Ok(upgrade) = std::env::var("PLAYDECK_UPGRADE_HTTP") {
            config.playback.upgrade_insecure = upgrade.parse().unwrap_or(true);
        }

        if let Ok(height) = std::env::var("PLAYDECK_OVERLAY_HEIGHT") {
            if let Ok(pixels) = height.parse::<f64>() {
                if pixels.is_finite() && pixels >= 0.0 {
                    config.overlay.initial_height = pixels;
                }
            }
        }

        config
    }

    /// Creates a configuration optimized for testing.
    ///
    /// Points storage at a directory that tests are expected to replace
    /// with a temporary one and keeps the history list short.
    pub fn for_testing() -> Self {
        Self {
            storage: StorageConfig {
                data_dir: std::env::temp_dir().join("playdeck-test-data"),
                ..StorageConfig::default()
            },
            history: HistoryConfig { recent_limit: 5 },
            ..Default::default()
        }
    }
}
