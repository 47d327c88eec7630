//! Error types for catalog queries.

use thiserror::Error;

use crate::types::WorkId;

/// Errors that can occur while querying the catalog service.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Query was rejected or failed on the service side.
    #[error("Catalog query '{query}' failed: {reason}")]
    QueryFailed {
        /// The query that failed
        query: String,
        /// The reason for the failure
        reason: String,
    },

    /// Network communication error occurred while reaching the service.
    #[error("Network error: {reason}")]
    NetworkError {
        /// The reason for the network error
        reason: String,
    },

    /// Failed to parse the service response.
    #[error("Parse error: {reason}")]
    ParseError {
        /// The reason for the parse error
        reason: String,
    },

    /// The requested work does not exist in the catalog.
    #[error("Work {id} not found")]
    WorkNotFound {
        /// Identifier that was looked up
        id: WorkId,
    },
}

