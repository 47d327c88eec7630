//! Player session state and catalog orchestration.
//!
//! A [`PlayerSession`] holds the active work and the URL currently playing.
//! Selection queries the catalog for a candidate's playlist and activates the
//! work only when it has something to play. Playback itself happens through
//! the session's [`PlaybackController`], which a mounted streaming adapter
//! binds to its sink.

pub mod feedback;

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use playdeck_catalog::{CatalogService, Work, WorkId, WorkSummary};

pub use feedback::{
    EMPTY_KEYWORD, LoadingGuard, LoadingTracker, NO_PLAYABLE_SOURCE, Notifier, TracingNotifier,
};

use crate::controller::PlaybackController;
use crate::history::HistoryItem;
use crate::streaming::PlaybackOutcome;

/// Snapshot of the session's observable state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Active work, present only with a non-empty playlist
    pub work: Option<Work>,
    /// Last resolved URL handed to the player
    pub video_url: String,
}

/// What a selection request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// The candidate became the active work
    Selected,
    /// The candidate was already active; nothing was queried
    AlreadyActive,
    /// A query for the same candidate was still running
    InFlight,
    /// The candidate has an empty playlist; state is unchanged
    NoPlayableSource,
}

/// Cloneable handle to one playback session.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    state: RwLock<SessionState>,
    catalog: Arc<dyn CatalogService>,
    notifier: Arc<dyn Notifier>,
    loading: LoadingTracker,
    in_flight: Mutex<HashSet<WorkId>>,
    controller: PlaybackController,
}

impl PlayerSession {
    /// Creates an empty session backed by `catalog`.
    pub fn new(catalog: Arc<dyn CatalogService>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                state: RwLock::new(SessionState::default()),
                catalog,
                notifier,
                loading: LoadingTracker::default(),
                in_flight: Mutex::new(HashSet::new()),
                controller: PlaybackController::new(),
            }),
        }
    }

    /// The active work, if any.
    pub fn work(&self) -> Option<Work> {
        self.inner.state.read().work.clone()
    }

    /// The URL most recently handed to the player.
    pub fn video_url(&self) -> String {
        self.inner.state.read().video_url.clone()
    }

    /// Copy of the whole session state.
    pub fn state(&self) -> SessionState {
        self.inner.state.read().clone()
    }

    /// Records the URL the player is now showing.
    pub fn set_video_url(&self, url: &str) {
        self.inner.state.write().video_url = url.to_string();
    }

    /// Reader handle for requesting playback.
    pub fn controller(&self) -> PlaybackController {
        self.inner.controller.clone()
    }

    /// Number of catalog queries currently outstanding.
    pub fn outstanding_queries(&self) -> usize {
        self.inner.loading.outstanding()
    }

    /// Clears the active work and URL.
    pub fn reset(&self) {
        *self.inner.state.write() = SessionState::default();
        tracing::debug!("Session reset");
    }

    /// Searches the catalog for `keyword`.
    ///
    /// A blank keyword shows an advisory and returns no results without
    /// querying the catalog.
    ///
    /// # Errors
    ///
    /// - `PlaydeckError::Catalog` - If the catalog query fails
    pub async fn search(&self, keyword: &str) -> crate::Result<Vec<WorkSummary>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            self.inner.notifier.show_message(EMPTY_KEYWORD);
            return Ok(Vec::new());
        }

        let _loading = self.inner.loading.begin(self.inner.notifier.as_ref());
        let works = self.inner.catalog.find_works(keyword).await?;
        tracing::debug!("Search '{}' returned {} works", keyword, works.len());
        Ok(works)
    }

    /// Makes `candidate` the active work if it has something to play.
    ///
    /// Reselecting the active work, or a work whose query is still running,
    /// does nothing. An empty playlist shows an advisory and leaves the
    /// session untouched. History is never written here.
    ///
    /// # Errors
    ///
    /// - `PlaydeckError::Catalog` - If the detail query fails
    pub async fn select_play_list(
        &self,
        candidate: WorkSummary,
    ) -> crate::Result<SelectionOutcome> {
        let id = candidate.id;
        if self.active_work_id() == Some(id) {
            tracing::debug!("Work {} already active", id);
            return Ok(SelectionOutcome::AlreadyActive);
        }

        let Some(_token) = InFlightToken::acquire(&self.inner.in_flight, id) else {
            tracing::debug!("Work {} detail query already in flight", id);
            return Ok(SelectionOutcome::InFlight);
        };

        let detail = {
            let _loading = self.inner.loading.begin(self.inner.notifier.as_ref());
            self.inner.catalog.work_detail(id).await?
        };

        if detail.play_list.is_empty() {
            self.inner.notifier.show_message(NO_PLAYABLE_SOURCE);
            return Ok(SelectionOutcome::NoPlayableSource);
        }

        let work = Work::from_parts(candidate, detail);
        tracing::debug!(
            "Selected work {} '{}' with {} chapters",
            id,
            work.name(),
            work.play_list.len()
        );
        self.inner.state.write().work = Some(work);
        Ok(SelectionOutcome::Selected)
    }

    /// Selects a search result, remembering the text that found it.
    ///
    /// # Errors
    ///
    /// - `PlaydeckError::Catalog` - If the detail query fails
    pub async fn select_search_result(
        &self,
        mut candidate: WorkSummary,
        keywords: &str,
    ) -> crate::Result<SelectionOutcome> {
        candidate.keywords = Some(keywords.to_string());
        self.select_play_list(candidate).await
    }

    /// Reopens a history entry: selects its work, then plays its URL.
    ///
    /// Returns `None` when no sink is mounted, the URL cannot be played, or
    /// the entry's work could not be made active (its playlist is now empty
    /// or its detail query is already in flight). Nothing is played then.
    ///
    /// # Errors
    ///
    /// - `PlaydeckError::Catalog` - If the detail query fails
    pub async fn resume(&self, item: &HistoryItem) -> crate::Result<Option<PlaybackOutcome>> {
        match self.select_play_list(item.work.summary.clone()).await? {
            SelectionOutcome::Selected | SelectionOutcome::AlreadyActive => {
                Ok(self.inner.controller.play(&item.url))
            }
            outcome => {
                tracing::debug!("Not resuming {}: {:?}", item.url, outcome);
                Ok(None)
            }
        }
    }

    fn active_work_id(&self) -> Option<WorkId> {
        self.inner.state.read().work.as_ref().map(Work::id)
    }
}

/// Marks a work id as having a detail query in flight until dropped.
struct InFlightToken<'a> {
    registry: &'a Mutex<HashSet<WorkId>>,
    id: WorkId,
}

impl<'a> InFlightToken<'a> {
    fn acquire(registry: &'a Mutex<HashSet<WorkId>>, id: WorkId) -> Option<Self> {
        registry
            .lock()
            .insert(id)
            .then_some(Self { registry, id })
    }
}

impl Drop for InFlightToken<'_> {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use playdeck_catalog::{CatalogError, MockCatalog, PlaylistItem, WorkDetail};

    use super::*;
    use crate::PlaydeckError;
    use crate::test_fixtures::RecordingNotifier;

    fn playable(id: i64) -> WorkDetail {
        WorkDetail {
            play_list: vec![PlaylistItem::new(format!("http://cdn.test/{id}.mp4"), "Full")],
            image: format!("https://img.test/{id}.jpg"),
        }
    }

    fn session_with(catalog: &MockCatalog) -> (PlayerSession, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let session = PlayerSession::new(Arc::new(catalog.clone()), notifier.clone());
        (session, notifier)
    }

    #[tokio::test]
    async fn test_select_activates_work() {
        let catalog = MockCatalog::new().with_detail(WorkId::new(1), playable(1));
        let (session, notifier) = session_with(&catalog);

        let outcome = session
            .select_play_list(WorkSummary::new(WorkId::new(1), "One"))
            .await
            .unwrap();

        assert_eq!(outcome, SelectionOutcome::Selected);
        let work = session.work().unwrap();
        assert_eq!(work.name(), "One");
        assert_eq!(work.image, "https://img.test/1.jpg");
        assert_eq!(work.play_list.len(), 1);
        assert_eq!(notifier.loading_changes(), vec![true, false]);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_reselecting_active_work_skips_query() {
        let catalog = MockCatalog::new().with_detail(WorkId::new(1), playable(1));
        let (session, _notifier) = session_with(&catalog);
        let candidate = WorkSummary::new(WorkId::new(1), "One");

        session.select_play_list(candidate.clone()).await.unwrap();
        let again = session.select_play_list(candidate).await.unwrap();

        assert_eq!(again, SelectionOutcome::AlreadyActive);
        assert_eq!(catalog.detail_query_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_selection_queries_once() {
        let catalog = MockCatalog::new()
            .with_detail(WorkId::new(1), playable(1))
            .with_latency(Duration::from_millis(20));
        let (session, notifier) = session_with(&catalog);
        let candidate = WorkSummary::new(WorkId::new(1), "One");

        let (first, second) = tokio::join!(
            session.select_play_list(candidate.clone()),
            session.select_play_list(candidate.clone()),
        );

        let mut outcomes = vec![first.unwrap(), second.unwrap()];
        outcomes.sort_by_key(|outcome| *outcome == SelectionOutcome::InFlight);
        assert_eq!(
            outcomes,
            vec![SelectionOutcome::Selected, SelectionOutcome::InFlight]
        );
        assert_eq!(catalog.detail_query_count(), 1);
        assert_eq!(notifier.loading_changes(), vec![true, false]);
    }

    #[tokio::test]
    async fn test_empty_playlist_leaves_state_and_advises_once() {
        let catalog = MockCatalog::new()
            .with_detail(WorkId::new(1), playable(1))
            .with_detail(WorkId::new(2), WorkDetail::default());
        let (session, notifier) = session_with(&catalog);
        session
            .select_play_list(WorkSummary::new(WorkId::new(1), "One"))
            .await
            .unwrap();

        let outcome = session
            .select_play_list(WorkSummary::new(WorkId::new(2), "Empty"))
            .await
            .unwrap();

        assert_eq!(outcome, SelectionOutcome::NoPlayableSource);
        assert_eq!(session.work().unwrap().id(), WorkId::new(1));
        assert_eq!(notifier.messages(), vec![NO_PLAYABLE_SOURCE.to_string()]);
        assert!(!notifier.is_loading());
    }

    #[tokio::test]
    async fn test_catalog_failure_releases_loading_and_token() {
        let catalog = MockCatalog::new().with_detail(WorkId::new(1), playable(1));
        let (session, notifier) = session_with(&catalog);
        let candidate = WorkSummary::new(WorkId::new(1), "One");

        catalog.set_failing(true);
        let result = session.select_play_list(candidate.clone()).await;
        assert!(matches!(
            result,
            Err(PlaydeckError::Catalog(CatalogError::NetworkError { .. }))
        ));
        assert!(!notifier.is_loading());
        assert_eq!(session.outstanding_queries(), 0);
        assert!(session.work().is_none());

        catalog.set_failing(false);
        let retry = session.select_play_list(candidate).await.unwrap();
        assert_eq!(retry, SelectionOutcome::Selected);
    }

    #[tokio::test]
    async fn test_unknown_work_propagates_not_found() {
        let catalog = MockCatalog::new();
        let (session, _notifier) = session_with(&catalog);

        let result = session
            .select_play_list(WorkSummary::new(WorkId::new(42), "Ghost"))
            .await;

        assert!(matches!(
            result,
            Err(PlaydeckError::Catalog(CatalogError::WorkNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_blank_search_advises_without_query() {
        let catalog = MockCatalog::new();
        let (session, notifier) = session_with(&catalog);

        let results = session.search("   ").await.unwrap();

        assert!(results.is_empty());
        assert_eq!(catalog.search_query_count(), 0);
        assert_eq!(notifier.messages(), vec![EMPTY_KEYWORD.to_string()]);
        assert!(notifier.loading_changes().is_empty());
    }

    #[tokio::test]
    async fn test_search_trims_and_queries() {
        let catalog = MockCatalog::new()
            .with_search_results(vec![WorkSummary::new(WorkId::new(3), "Foo Story")]);
        let (session, notifier) = session_with(&catalog);

        let results = session.search("  foo ").await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(catalog.search_query_count(), 1);
        assert_eq!(notifier.loading_changes(), vec![true, false]);
    }

    #[tokio::test]
    async fn test_search_result_keeps_keywords() {
        let catalog = MockCatalog::new().with_detail(WorkId::new(3), playable(3));
        let (session, _notifier) = session_with(&catalog);

        session
            .select_search_result(WorkSummary::new(WorkId::new(3), "Foo Story"), "foo")
            .await
            .unwrap();

        assert_eq!(
            session.work().unwrap().summary.keywords.as_deref(),
            Some("foo")
        );
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let catalog = MockCatalog::new().with_detail(WorkId::new(1), playable(1));
        let (session, _notifier) = session_with(&catalog);
        session
            .select_play_list(WorkSummary::new(WorkId::new(1), "One"))
            .await
            .unwrap();
        session.set_video_url("https://cdn.test/1.mp4");

        session.reset();

        assert_eq!(session.state(), SessionState::default());
    }

    #[tokio::test]
    async fn test_resume_without_sink_selects_only() {
        let catalog = MockCatalog::new().with_detail(WorkId::new(1), playable(1));
        let (session, _notifier) = session_with(&catalog);
        let work = Work::from_parts(WorkSummary::new(WorkId::new(1), "One"), playable(1));
        let item = HistoryItem {
            url: "https://cdn.test/1.mp4".to_string(),
            chap: "Full".to_string(),
            utime: 10,
            work: work.snapshot(),
        };

        let outcome = session.resume(&item).await.unwrap();

        assert!(outcome.is_none());
        assert_eq!(session.work().unwrap().id(), WorkId::new(1));
        assert_eq!(session.video_url(), "");
    }
}
