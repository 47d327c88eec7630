//! User-facing feedback: advisory messages and the loading indicator.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Shown when a selected work has nothing to play.
pub const NO_PLAYABLE_SOURCE: &str = "no playable source found";
/// Shown when a search is submitted without a keyword.
pub const EMPTY_KEYWORD: &str = "movie name cannot be empty";

/// Receives advisory messages and loading state changes.
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Displays a short advisory message.
    fn show_message(&self, message: &str);

    /// Shows or hides the loading indicator.
    fn set_loading(&self, loading: bool);
}

/// Notifier that writes everything to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show_message(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn set_loading(&self, loading: bool) {
        tracing::debug!("Loading indicator {}", if loading { "on" } else { "off" });
    }
}

/// Counts outstanding catalog queries.
///
/// The indicator turns on with the first outstanding query and off when the
/// last one finishes, so overlapping queries never hide it early.
#[derive(Debug, Default)]
pub struct LoadingTracker {
    outstanding: AtomicUsize,
}

impl LoadingTracker {
    /// Marks a query as outstanding until the returned guard drops.
    pub fn begin<'a>(&'a self, notifier: &'a dyn Notifier) -> LoadingGuard<'a> {
        if self.outstanding.fetch_add(1, Ordering::SeqCst) == 0 {
            notifier.set_loading(true);
        }
        LoadingGuard {
            tracker: self,
            notifier,
        }
    }

    /// Number of queries currently outstanding.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }
}

/// Keeps the loading indicator on while alive.
///
/// Dropping the guard, including on error or cancellation, releases it.
#[must_use = "the indicator turns off as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LoadingGuard<'a> {
    tracker: &'a LoadingTracker,
    notifier: &'a dyn Notifier,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.tracker.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notifier.set_loading(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::RecordingNotifier;

    #[test]
    fn test_guard_toggles_indicator() {
        let tracker = LoadingTracker::default();
        let notifier = RecordingNotifier::default();

        {
            let _guard = tracker.begin(&notifier);
            assert!(notifier.is_loading());
            assert_eq!(tracker.outstanding(), 1);
        }

        assert!(!notifier.is_loading());
        assert_eq!(notifier.loading_changes(), vec![true, false]);
    }

    #[test]
    fn test_overlapping_guards_keep_indicator_on() {
        let tracker = LoadingTracker::default();
        let notifier = RecordingNotifier::default();

        let first = tracker.begin(&notifier);
        let second = tracker.begin(&notifier);
        drop(first);
        assert!(notifier.is_loading());

        drop(second);
        assert!(!notifier.is_loading());
        assert_eq!(notifier.loading_changes(), vec![true, false]);
    }
}
