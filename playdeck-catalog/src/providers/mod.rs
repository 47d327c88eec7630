//! Provider implementations for catalog queries.

use async_trait::async_trait;

use crate::errors::CatalogError;
use crate::types::{WorkDetail, WorkId, WorkSummary};

pub mod demo;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use demo::DemoCatalog;
#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockCatalog;

/// Read-only access to the video catalog.
///
/// Implementations provide catalog lookups through different backends
/// (built-in demo data, remote query services, mocks for testing).
#[async_trait]
pub trait CatalogService: Send + Sync + std::fmt::Debug {
    /// Finds works matching a keyword.
    ///
    /// # Errors
    /// - `CatalogError::QueryFailed` - Service rejected the query
    /// - `CatalogError::NetworkError` - Network connectivity issues
    async fn find_works(&self, keyword: &str) -> Result<Vec<WorkSummary>, CatalogError>;

    /// Fetches the playlist and poster of a single work.
    ///
    /// # Errors
    /// - `CatalogError::WorkNotFound` - No work with this identifier
    /// - `CatalogError::NetworkError` - Network connectivity issues
    async fn work_detail(&self, id: WorkId) -> Result<WorkDetail, CatalogError>;
}
