//! The filter controller.

use todoflow_core::FilterState;
use tokio::sync::watch;

/// Holds the user-selected [`FilterState`] and publishes every change.
///
/// Constructed explicitly and shared (usually as `Arc<FilterController>`)
/// between the writer (the view model) and its readers (the derived list).
/// Starts at [`FilterState::All`].
///
/// # Example
///
/// ```
/// use todoflow_core::FilterState;
/// use todoflow_runtime::FilterController;
///
/// let filter = FilterController::new();
/// let mut updates = filter.subscribe();
///
/// assert!(filter.set_filter(FilterState::Active));
/// assert!(!filter.set_filter(FilterState::Active)); // no-op, nothing published
/// assert_eq!(*updates.borrow_and_update(), FilterState::Active);
/// ```
#[derive(Debug)]
pub struct FilterController {
    state: watch::Sender<FilterState>,
}

impl FilterController {
    /// Create a controller in the [`FilterState::All`] state
    #[must_use]
    pub fn new() -> Self {
        Self::with_initial(FilterState::default())
    }

    /// Create a controller in the given state
    #[must_use]
    pub fn with_initial(initial: FilterState) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    /// Move to `filter`.
    ///
    /// Returns `true` if the state changed. Setting the current state again
    /// notifies nobody.
    pub fn set_filter(&self, filter: FilterState) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == filter {
                false
            } else {
                *current = filter;
                true
            }
        });

        if changed {
            tracing::debug!(%filter, "Filter changed");
        }
        changed
    }

    /// The current state
    #[must_use]
    pub fn current(&self) -> FilterState {
        *self.state.borrow()
    }

    /// Observe the state; the receiver starts at the current value
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FilterState> {
        self.state.subscribe()
    }
}

impl Default for FilterController {
    fn default() -> Self {
        Self::new()
    }
}
