//! Playdeck Catalog - Video catalog data model and query providers

#![deny(missing_docs)]
#![deny(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Describes catalog works and their chapters, and the two read-only queries
//! the player needs from a catalog service: keyword search and work detail.

pub mod errors;
pub mod providers;
pub mod types;

// Re-export main types
pub use errors::CatalogError;
#[cfg(any(test, feature = "test-utils"))]
pub use providers::MockCatalog;
pub use providers::{CatalogService, DemoCatalog};
pub use types::{PlaylistItem, Work, WorkDetail, WorkId, WorkSnapshot, WorkSummary};

/// Convenience type alias for Results with CatalogError.
pub type Result<T> = std::result::Result<T, CatalogError>;
