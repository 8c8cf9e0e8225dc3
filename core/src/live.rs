//! Live queries.
//!
//! A live query is a stream of result sets: it yields the current rows as soon
//! as it is polled, then re-runs whenever the table is invalidated and yields
//! again if (and only if) its own result set changed.
//!
//! Stores own an [`InvalidationTracker`] and call
//! [`InvalidationTracker::invalidate`] after every committed write. Live
//! queries are built with [`live_query`] from a tracker and a fetch closure.
//!
//! ```text
//!  write ──► commit ──► invalidate() ──► broadcast ──┬──► all       (re-query, emit if changed)
//!                                                    ├──► active    (re-query, emit if changed)
//!                                                    └──► completed (re-query, emit if changed)
//! ```

use crate::error::Result;
use crate::filter::TodoQuery;
use crate::todo::Todo;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// A subscribable, continuously refreshed ordered sequence of todos.
///
/// Dropping the stream cancels the subscription.
pub type LiveList = Pin<Box<dyn Stream<Item = Vec<Todo>> + Send>>;

const DEFAULT_CAPACITY: usize = 64;

/// Table-level change notification shared by a store and its live queries.
///
/// Every call to [`invalidate`](Self::invalidate) bumps a version counter and
/// broadcasts the new version. Slow subscribers that lag simply re-query;
/// versions are never replayed individually.
#[derive(Clone, Debug)]
pub struct InvalidationTracker {
    sender: broadcast::Sender<u64>,
    version: Arc<AtomicU64>,
}

impl InvalidationTracker {
    /// Create a tracker with the default broadcast capacity
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a tracker with a custom broadcast capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            version: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Signal that the table changed. Returns the new version.
    pub fn invalidate(&self) -> u64 {
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        // Err only means nobody is observing right now
        let _ = self.sender.send(version);
        tracing::trace!(version, observers = self.sender.receiver_count(), "Table invalidated");
        version
    }

    /// Number of invalidations so far
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Register for future invalidations
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<u64> {
        self.sender.subscribe()
    }

    /// Number of live queries currently registered
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InvalidationTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a live query from a tracker and a fetch closure.
///
/// The invalidation subscription is taken *before* the first fetch, so a
/// write committed between the first read and the registration cannot be
/// missed. A fetch that fails is logged and skipped; the stream keeps waiting
/// for the next invalidation. The stream ends once every tracker clone is
/// dropped.
pub fn live_query<F, Fut>(tracker: &InvalidationTracker, query: TodoQuery, fetch: F) -> LiveList
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<Todo>>> + Send + 'static,
{
    let mut invalidations = tracker.subscribe();

    Box::pin(async_stream::stream! {
        let mut last: Option<Vec<Todo>> = None;

        'refresh: loop {
            match fetch().await {
                Ok(rows) => {
                    if last.as_ref() != Some(&rows) {
                        tracing::trace!(%query, rows = rows.len(), "Live query emitting");
                        last = Some(rows.clone());
                        yield rows;
                    }
                }
                Err(error) => {
                    tracing::warn!(%query, %error, "Live query refresh failed");
                }
            }

            match invalidations.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break 'refresh,
            }

            // Coalesce a burst of writes into a single re-query
            loop {
                match invalidations.try_recv() {
                    Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Closed) => break 'refresh,
                }
            }
        }

        tracing::debug!(%query, "Live query finished");
    })
}
