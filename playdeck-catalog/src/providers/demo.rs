//! Demo provider implementation for development and offline use.

use async_trait::async_trait;
use serde_json::Value;
use strsim::normalized_levenshtein;

use super::CatalogService;
use crate::errors::CatalogError;
use crate::types::{PlaylistItem, WorkDetail, WorkId, WorkSummary};

/// Minimum title similarity for a fuzzy keyword hit.
const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone)]
struct DemoEntry {
    summary: WorkSummary,
    detail: WorkDetail,
}

/// Demo catalog with a fixed set of built-in works.
///
/// Serves realistic catalog data without external services. Covers the
/// shapes the player has to handle: progressive chapters over plain http,
/// adaptive manifests, and a work with no playable source at all.
#[derive(Debug)]
pub struct DemoCatalog {
    entries: Vec<DemoEntry>,
    similarity_threshold: f64,
}

impl Default for DemoCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoCatalog {
    /// Creates the demo catalog with its built-in works.
    pub fn new() -> Self {
        Self {
            entries: built_in_entries(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    /// Creates the demo catalog with a custom fuzzy-match threshold.
    ///
    /// # Arguments
    /// * `threshold` - Minimum similarity score (0.0-1.0) for title matches
    pub fn with_similarity_threshold(threshold: f64) -> Self {
        Self {
            entries: built_in_entries(),
            similarity_threshold: threshold.clamp(0.0, 1.0),
        }
    }

    /// Number of works in the demo catalog.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the catalog holds no works.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn matches(&self, keyword: &str, title: &str) -> bool {
        let keyword = keyword.to_lowercase();
        let title = title.to_lowercase();

        title.contains(&keyword)
            || normalized_levenshtein(&keyword, &title) >= self.similarity_threshold
    }
}

#[async_trait]
impl CatalogService for DemoCatalog {
    async fn find_works(&self, keyword: &str) -> Result<Vec<WorkSummary>, CatalogError> {
        let keyword = keyword.trim();
        let results: Vec<WorkSummary> = self
            .entries
            .iter()
            .filter(|entry| self.matches(keyword, &entry.summary.name))
            .map(|entry| entry.summary.clone())
            .collect();

        tracing::debug!("Demo catalog matched {} works for '{}'", results.len(), keyword);
        Ok(results)
    }

    async fn work_detail(&self, id: WorkId) -> Result<WorkDetail, CatalogError> {
        self.entries
            .iter()
            .find(|entry| entry.summary.id == id)
            .map(|entry| entry.detail.clone())
            .ok_or(CatalogError::WorkNotFound { id })
    }
}

fn summary(id: i64, name: &str, cate: &str, tag: &str, utime: &str) -> WorkSummary {
    WorkSummary {
        id: WorkId::new(id),
        name: name.to_string(),
        cate: cate.to_string(),
        tag: tag.to_string(),
        utime: Value::from(utime),
        keywords: None,
    }
}

fn built_in_entries() -> Vec<DemoEntry> {
    vec![
        DemoEntry {
            summary: summary(1001, "Harbor Lights", "drama", "HD", "2024-03-02"),
            detail: WorkDetail {
                play_list: (1..=3)
                    .map(|episode| {
                        PlaylistItem::new(
                            format!("http://media.demo.playdeck/harbor-lights/ep{episode}.mp4"),
                            format!("Episode {episode}"),
                        )
                    })
                    .collect(),
                image: "https://img.demo.playdeck/posters/1001.jpg".to_string(),
            },
        },
        DemoEntry {
            summary: summary(1002, "Northern Drift", "documentary", "4K", "2023-11-18"),
            detail: WorkDetail {
                play_list: vec![
                    PlaylistItem::new(
                        "https://stream.demo.playdeck/northern-drift/part1/index.m3u8",
                        "Part 1",
                    ),
                    PlaylistItem::new(
                        "https://stream.demo.playdeck/northern-drift/part2/index.m3u8",
                        "Part 2",
                    ),
                ],
                image: "https://img.demo.playdeck/posters/1002.jpg".to_string(),
            },
        },
        DemoEntry {
            summary: summary(1003, "Harbor Lights: The Return", "drama", "HD", "2025-01-09"),
            detail: WorkDetail {
                play_list: vec![PlaylistItem::new(
                    " media.demo.playdeck/harbor-return/full.mp4 ",
                    "Full",
                )],
                image: "https://img.demo.playdeck/posters/1003.jpg".to_string(),
            },
        },
        DemoEntry {
            summary: summary(1004, "Lost Reel", "classic", "SD", "1998-07-30"),
            detail: WorkDetail {
                play_list: Vec::new(),
                image: "https://img.demo.playdeck/posters/1004.jpg".to_string(),
            },
        },
    ]
}
