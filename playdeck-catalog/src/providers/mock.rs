//! Mock provider implementation for testing.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::CatalogService;
use crate::errors::CatalogError;
use crate::types::{WorkDetail, WorkId, WorkSummary};

/// Mock catalog for testing.
///
/// Holds scripted search results and details, counts every query, and can
/// be switched into a failing mode or given an artificial latency so tests
/// can observe overlapping requests. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockCatalog {
    search_results: Arc<Mutex<Vec<WorkSummary>>>,
    details: Arc<Mutex<HashMap<WorkId, WorkDetail>>>,
    search_queries: Arc<AtomicUsize>,
    detail_queries: Arc<AtomicUsize>,
    fail_queries: Arc<AtomicBool>,
    latency: Arc<Mutex<Option<Duration>>>,
}

impl MockCatalog {
    /// Creates an empty mock catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the works returned by every keyword search.
    pub fn with_search_results(self, results: Vec<WorkSummary>) -> Self {
        *self.search_results.lock() = results;
        self
    }

    /// Registers the detail returned for a work.
    pub fn with_detail(self, id: WorkId, detail: WorkDetail) -> Self {
        self.details.lock().insert(id, detail);
        self
    }

    /// Delays every query by the given duration.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock() = Some(latency);
        self
    }

    /// Makes subsequent queries fail with a network error.
    pub fn set_failing(&self, failing: bool) {
        self.fail_queries.store(failing, Ordering::SeqCst);
    }

    /// Number of keyword searches received so far.
    pub fn search_query_count(&self) -> usize {
        self.search_queries.load(Ordering::SeqCst)
    }

    /// Number of detail queries received so far.
    pub fn detail_query_count(&self) -> usize {
        self.detail_queries.load(Ordering::SeqCst)
    }

    async fn simulate_network(&self) -> Result<(), CatalogError> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(CatalogError::NetworkError {
                reason: "mock catalog unreachable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogService for MockCatalog {
    async fn find_works(&self, _keyword: &str) -> Result<Vec<WorkSummary>, CatalogError> {
        self.search_queries.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;
        Ok(self.search_results.lock().clone())
    }

    async fn work_detail(&self, id: WorkId) -> Result<WorkDetail, CatalogError> {
        self.detail_queries.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;
        self.details
            .lock()
            .get(&id)
            .cloned()
            .ok_or(CatalogError::WorkNotFound { id })
    }
}
