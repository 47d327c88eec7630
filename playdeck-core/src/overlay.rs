//! Auto-hiding search overlay.
//!
//! The search input sits above a scrolling page. Scrolling down slides it
//! up out of view, scrolling up brings it back. The overlay never moves
//! further than its own rendered height, which is observed from the layout
//! and may change at any time.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::OverlayConfig;

/// Query-string parameter that pre-fills the search input.
pub const SEARCH_QUERY_PARAM: &str = "search";

/// Offset, height and input text of the overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOverlay {
    offset: f64,
    max_hidden: f64,
    last_scroll_top: f64,
    input: String,
}

impl SearchOverlay {
    /// Creates a fully visible overlay of the given height.
    pub fn new(initial_height: f64) -> Self {
        Self {
            offset: 0.0,
            max_hidden: sanitize_height(initial_height).unwrap_or(0.0),
            last_scroll_top: 0.0,
            input: String::new(),
        }
    }

    /// Creates an overlay with the configured initial height.
    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(config.initial_height)
    }

    /// Current vertical offset, in `[-max_hidden, 0]`.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// How far the overlay may slide out of view.
    pub fn max_hidden(&self) -> f64 {
        self.max_hidden
    }

    /// Top padding the scroll container needs so content starts below the
    /// overlay.
    pub fn content_padding(&self) -> f64 {
        self.max_hidden
    }

    /// Moves the overlay by `delta`; positive values reveal it.
    pub fn apply_scroll_delta(&mut self, delta: f64) -> f64 {
        if delta.is_finite() {
            self.offset = (self.offset + delta).clamp(-self.max_hidden, 0.0);
        }
        self.offset
    }

    /// Moves the overlay for a container now scrolled to `scroll_top`.
    pub fn on_scroll(&mut self, scroll_top: f64) -> f64 {
        if !scroll_top.is_finite() {
            return self.offset;
        }
        let delta = self.last_scroll_top - scroll_top;
        self.last_scroll_top = scroll_top;
        self.apply_scroll_delta(delta)
    }

    /// Adopts a newly measured overlay height.
    ///
    /// Negative or non-finite measurements are ignored.
    pub fn observe_height(&mut self, height: f64) {
        let Some(height) = sanitize_height(height) else {
            tracing::debug!("Ignoring overlay height {}", height);
            return;
        };
        self.max_hidden = height;
        self.offset = self.offset.clamp(-self.max_hidden, 0.0);
    }

    /// Current search input text.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replaces the search input text.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Pre-fills the input from the `search` parameter of a query string.
    ///
    /// Returns true when the input was changed.
    pub fn apply_location_query(&mut self, query: &str) -> bool {
        let query = query.strip_prefix('?').unwrap_or(query);
        let value = url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == SEARCH_QUERY_PARAM)
            .map(|(_, value)| value.into_owned());

        match value {
            Some(value) if !value.is_empty() => {
                self.input = value;
                true
            }
            _ => false,
        }
    }
}

fn sanitize_height(height: f64) -> Option<f64> {
    (height.is_finite() && height >= 0.0).then_some(height)
}

/// Shared overlay with an optional height observer task.
///
/// Dropping the handle stops the observer.
#[derive(Debug)]
pub struct OverlayHandle {
    overlay: Arc<Mutex<SearchOverlay>>,
    observer: Option<JoinHandle<()>>,
}

impl OverlayHandle {
    /// Wraps `overlay` without observing heights yet.
    pub fn new(overlay: SearchOverlay) -> Self {
        Self {
            overlay: Arc::new(Mutex::new(overlay)),
            observer: None,
        }
    }

    /// Copy of the current overlay state.
    pub fn snapshot(&self) -> SearchOverlay {
        self.overlay.lock().clone()
    }

    /// See [`SearchOverlay::on_scroll`].
    pub fn on_scroll(&self, scroll_top: f64) -> f64 {
        self.overlay.lock().on_scroll(scroll_top)
    }

    /// See [`SearchOverlay::apply_scroll_delta`].
    pub fn apply_scroll_delta(&self, delta: f64) -> f64 {
        self.overlay.lock().apply_scroll_delta(delta)
    }

    /// See [`SearchOverlay::set_input`].
    pub fn set_input(&self, text: impl Into<String>) {
        self.overlay.lock().set_input(text);
    }

    /// See [`SearchOverlay::apply_location_query`].
    pub fn apply_location_query(&self, query: &str) -> bool {
        self.overlay.lock().apply_location_query(query)
    }

    /// Follows height measurements published on `heights`.
    ///
    /// The current value is applied immediately, later ones as they
    /// arrive. Replaces any previous observer. Must be called from within a
    /// tokio runtime.
    pub fn observe_heights(&mut self, mut heights: watch::Receiver<f64>) {
        self.unobserve();

        let initial = *heights.borrow_and_update();
        self.overlay.lock().observe_height(initial);

        let overlay = Arc::clone(&self.overlay);
        self.observer = Some(tokio::spawn(async move {
            while heights.changed().await.is_ok() {
                let height = *heights.borrow_and_update();
                overlay.lock().observe_height(height);
            }
            tracing::debug!("Overlay height source closed");
        }));
    }

    /// Returns true while a height observer is running.
    pub fn is_observing(&self) -> bool {
        self.observer
            .as_ref()
            .is_some_and(|observer| !observer.is_finished())
    }

    /// Stops following height measurements.
    pub fn unobserve(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.abort();
        }
    }
}

impl Drop for OverlayHandle {
    fn drop(&mut self) {
        self.unobserve();
    }
}
