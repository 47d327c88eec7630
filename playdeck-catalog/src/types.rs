//! Data types for catalog works and their chapters.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable catalog identifier of a work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkId(i64);

impl WorkId {
    /// Creates a work identifier from its raw catalog value.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw catalog value.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for WorkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Search result record returned by a keyword query.
///
/// Carries identity and display metadata only. The playlist is fetched
/// separately through a detail query once the user picks a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSummary {
    /// Catalog identifier
    pub id: WorkId,
    /// Display title
    pub name: String,
    /// Catalog category, opaque to the player
    #[serde(default)]
    pub cate: String,
    /// Catalog tag line, opaque to the player
    #[serde(default)]
    pub tag: String,
    /// Catalog update time, opaque to the player; kept as sent
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub utime: Value,
    /// Search text that led to this work, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
}

impl WorkSummary {
    /// Creates a summary with empty catalog metadata.
    pub fn new(id: WorkId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cate: String::new(),
            tag: String::new(),
            utime: Value::Null,
            keywords: None,
        }
    }
}

/// One playable chapter of a work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistItem {
    /// Raw source address; must be resolved before playback
    pub url: String,
    /// Chapter display name
    pub name: String,
}

impl PlaylistItem {
    /// Creates a chapter from a raw url and a display name.
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
        }
    }
}

/// Detail payload returned for a single work.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkDetail {
    /// Ordered chapters; may be empty when no source is known
    #[serde(rename = "playList", default)]
    pub play_list: Vec<PlaylistItem>,
    /// Poster image address
    #[serde(default)]
    pub image: String,
}

/// A catalog work merged with its detail.
///
/// A work only becomes the active session work when its playlist is
/// non-empty; the session manager enforces that before constructing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    /// Search-result fields
    #[serde(flatten)]
    pub summary: WorkSummary,
    /// Poster image address
    #[serde(default)]
    pub image: String,
    /// Ordered chapters
    #[serde(rename = "playList")]
    pub play_list: Vec<PlaylistItem>,
}

impl Work {
    /// Merges a search result with its fetched detail.
    pub fn from_parts(summary: WorkSummary, detail: WorkDetail) -> Self {
        Self {
            summary,
            image: detail.image,
            play_list: detail.play_list,
        }
    }

    /// Catalog identifier of this work.
    pub fn id(&self) -> WorkId {
        self.summary.id
    }

    /// Display title of this work.
    pub fn name(&self) -> &str {
        &self.summary.name
    }

    /// Returns true when the work has at least one chapter.
    pub fn is_playable(&self) -> bool {
        !self.play_list.is_empty()
    }

    /// Copy of the work without its playlist, as cached alongside history.
    pub fn snapshot(&self) -> WorkSnapshot {
        WorkSnapshot {
            summary: self.summary.clone(),
            image: self.image.clone(),
        }
    }
}

/// Work metadata without the playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSnapshot {
    /// Search-result fields
    #[serde(flatten)]
    pub summary: WorkSummary,
    /// Poster image address
    #[serde(default)]
    pub image: String,
}

impl WorkSnapshot {
    /// Catalog identifier of this work.
    pub fn id(&self) -> WorkId {
        self.summary.id
    }
}
