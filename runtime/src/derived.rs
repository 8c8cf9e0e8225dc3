//! The derived list combinator.
//!
//! Joins the current [`FilterState`] with the repository's three live lists
//! into the single list the presentation layer shows.
//!
//! ```text
//!  filter ───────┐
//!  all ──────────┤   one task owns      ┌──────────────┐
//!  active ───────┼──► (filter, all,  ──►│ watch<Vec<_>>│──► subscribers
//!  completed ────┘    active, done)     └──────────────┘
//! ```
//!
//! The combining task starts with the first subscriber and stops once no
//! subscriber has been around for the idle timeout; the last published list
//! stays readable while it is stopped.

use crate::repository::TodoRepository;
use futures::StreamExt;
use futures::stream::FusedStream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use todoflow_core::{FilterState, LiveList, Todo, TodoStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// The list a filter displays.
///
/// # Examples
///
/// ```
/// use todoflow_core::FilterState;
/// use todoflow_runtime::derived::select;
///
/// let (all, active, completed) = (vec![], vec![], vec![]);
/// assert!(select(FilterState::Active, &all, &active, &completed).is_empty());
/// ```
#[must_use]
pub const fn select<'a>(
    filter: FilterState,
    all: &'a [Todo],
    active: &'a [Todo],
    completed: &'a [Todo],
) -> &'a [Todo] {
    match filter {
        FilterState::All => all,
        FilterState::Active => active,
        FilterState::Completed => completed,
    }
}

/// Latest value of every input, owned by the combining task
#[derive(Debug, Default)]
struct Snapshot {
    filter: FilterState,
    all: Option<Vec<Todo>>,
    active: Option<Vec<Todo>>,
    completed: Option<Vec<Todo>>,
}

impl Snapshot {
    /// `None` until every list has delivered once
    fn selected(&self) -> Option<&[Todo]> {
        match (&self.all, &self.active, &self.completed) {
            (Some(all), Some(active), Some(completed)) => {
                Some(select(self.filter, all, active, completed))
            },
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Shared {
    output: watch::Sender<Vec<Todo>>,
    task: Mutex<Option<JoinHandle<()>>>,
    /// Bumped by every `subscribe`
    generation: AtomicU64,
}

/// One live list derived from a filter and three upstream live lists.
///
/// Subscribers receive a `watch::Receiver<Vec<Todo>>`: the current value is
/// always readable with `borrow()`, and `changed()` fires only when the
/// displayed list really changed. The value starts as an empty list and is
/// first published once all three upstream lists have delivered.
///
/// Dropping the combinator stops its task.
///
/// # Example
///
/// ```ignore
/// let derived = DerivedTodoList::new(repository, filter.subscribe(), Duration::from_secs(5));
///
/// let mut todos = derived.subscribe();
/// todos.changed().await?;
/// println!("{} todos", todos.borrow().len());
/// ```
pub struct DerivedTodoList<S> {
    repository: TodoRepository<S>,
    filter: watch::Receiver<FilterState>,
    idle_timeout: Duration,
    shared: Arc<Shared>,
}

impl<S: TodoStore> DerivedTodoList<S> {
    /// Create a stopped combinator.
    ///
    /// Nothing is subscribed upstream until the first [`subscribe`](Self::subscribe).
    #[must_use]
    pub fn new(
        repository: TodoRepository<S>,
        filter: watch::Receiver<FilterState>,
        idle_timeout: Duration,
    ) -> Self {
        let (output, _) = watch::channel(Vec::new());
        Self {
            repository,
            filter,
            idle_timeout,
            shared: Arc::new(Shared {
                output,
                task: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Observe the derived list, starting the combining task if needed.
    ///
    /// After a restart the receiver sees the last published list until
    /// fresh upstream data arrives.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Todo>> {
        // Register before checking the task so an idle shutdown racing with
        // this call either sees the receiver or leaves the slot empty
        let receiver = self.shared.output.subscribe();
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        self.ensure_running();
        receiver
    }

    /// The last published list
    #[must_use]
    pub fn current(&self) -> Vec<Todo> {
        self.shared.output.borrow().clone()
    }

    /// Whether the combining task is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Number of live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.output.receiver_count()
    }

    fn ensure_running(&self) {
        let mut slot = self.shared.task.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        tracing::debug!(idle_timeout = ?self.idle_timeout, "Starting derived list");
        metrics::counter!("todo.view.combinator_starts").increment(1);

        *slot = Some(tokio::spawn(run(
            self.filter.clone(),
            Upstream {
                all: self.repository.all_todos(),
                active: self.repository.active_todos(),
                completed: self.repository.completed_todos(),
            },
            Arc::clone(&self.shared),
            self.idle_timeout,
        )));
    }
}

impl<S> Drop for DerivedTodoList<S> {
    fn drop(&mut self) {
        let task = self
            .shared
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

impl<S> std::fmt::Debug for DerivedTodoList<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedTodoList")
            .field("idle_timeout", &self.idle_timeout)
            .field("subscribers", &self.shared.output.receiver_count())
            .finish_non_exhaustive()
    }
}

struct Upstream {
    all: LiveList,
    active: LiveList,
    completed: LiveList,
}

async fn run(
    mut filter: watch::Receiver<FilterState>,
    upstream: Upstream,
    shared: Arc<Shared>,
    idle_timeout: Duration,
) {
    let mut all = upstream.all.fuse();
    let mut active = upstream.active.fuse();
    let mut completed = upstream.completed.fuse();

    let mut snapshot = Snapshot {
        filter: *filter.borrow_and_update(),
        ..Snapshot::default()
    };
    let mut filter_open = true;
    let mut idle_deadline: Option<Instant> = None;
    let mut armed_generation = 0;

    loop {
        if all.is_terminated() && active.is_terminated() && completed.is_terminated() {
            tracing::debug!("Upstream lists ended, stopping derived list");
            break;
        }

        let deadline = idle_deadline.unwrap_or_else(Instant::now);

        tokio::select! {
            changed = filter.changed(), if filter_open => {
                if changed.is_ok() {
                    snapshot.filter = *filter.borrow_and_update();
                } else {
                    // Controller gone; keep serving the last filter
                    filter_open = false;
                }
            }
            Some(rows) = all.next(), if !all.is_terminated() => snapshot.all = Some(rows),
            Some(rows) = active.next(), if !active.is_terminated() => snapshot.active = Some(rows),
            Some(rows) = completed.next(), if !completed.is_terminated() => {
                snapshot.completed = Some(rows);
            }
            () = shared.output.closed(), if idle_deadline.is_none() => {
                tracing::debug!(?idle_timeout, "Last subscriber gone, idle timer started");
                armed_generation = shared.generation.load(Ordering::Acquire);
                idle_deadline = Some(Instant::now() + idle_timeout);
                continue;
            }
            () = tokio::time::sleep_until(deadline), if idle_deadline.is_some() => {
                match release_if_idle(&shared, armed_generation) {
                    IdleCheck::Released => {
                        tracing::debug!("Derived list idle, stopping");
                        return;
                    },
                    IdleCheck::Observed => idle_deadline = None,
                    IdleCheck::Rearm(generation) => {
                        tracing::debug!(?idle_timeout, "Subscriber came and went, idle timer restarted");
                        armed_generation = generation;
                        idle_deadline = Some(Instant::now() + idle_timeout);
                    },
                }
                continue;
            }
            else => break,
        }

        publish(&shared.output, &snapshot);
    }
}

/// What an expired idle deadline found
#[derive(Debug, PartialEq, Eq)]
enum IdleCheck {
    /// Somebody is subscribed
    Observed,
    /// Nobody is subscribed, but someone subscribed after the timer started
    Rearm(u64),
    /// Nobody subscribed for the whole period; the task slot is now empty
    Released,
}

/// Empties the task slot if nobody subscribed since `armed_generation`.
///
/// Checked under the slot lock so a concurrent `subscribe` either is counted
/// here or finds the slot empty and starts a new task.
fn release_if_idle(shared: &Shared, armed_generation: u64) -> IdleCheck {
    let mut slot = shared.task.lock().unwrap_or_else(PoisonError::into_inner);
    if shared.output.receiver_count() > 0 {
        return IdleCheck::Observed;
    }
    let generation = shared.generation.load(Ordering::Acquire);
    if generation != armed_generation {
        return IdleCheck::Rearm(generation);
    }
    slot.take();
    IdleCheck::Released
}

fn publish(output: &watch::Sender<Vec<Todo>>, snapshot: &Snapshot) {
    let Some(rows) = snapshot.selected() else {
        return;
    };

    let changed = output.send_if_modified(|current| {
        if current.as_slice() == rows {
            false
        } else {
            *current = rows.to_vec();
            true
        }
    });

    if changed {
        tracing::trace!(filter = %snapshot.filter, rows = rows.len(), "Derived list published");
        metrics::counter!("todo.view.emissions").increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use todoflow_core::TodoId;

    fn todo(id: i64, completed: bool) -> Todo {
        let todo = Todo::new(format!("todo {id}"), "", Utc::now()).with_id(TodoId::new(id));
        if completed { todo.toggled(Utc::now()) } else { todo }
    }

    #[test]
    fn select_passes_through_per_state() {
        let all = vec![todo(1, false), todo(2, true)];
        let active = vec![todo(1, false)];
        let completed = vec![todo(2, true)];

        assert_eq!(select(FilterState::All, &all, &active, &completed), all.as_slice());
        assert_eq!(select(FilterState::Active, &all, &active, &completed), active.as_slice());
        assert_eq!(
            select(FilterState::Completed, &all, &active, &completed),
            completed.as_slice()
        );
    }

    #[test]
    fn snapshot_waits_for_every_list() {
        let mut snapshot = Snapshot {
            all: Some(vec![todo(1, false)]),
            ..Snapshot::default()
        };
        assert!(snapshot.selected().is_none());

        snapshot.active = Some(vec![todo(1, false)]);
        assert!(snapshot.selected().is_none());

        snapshot.completed = Some(vec![]);
        assert_eq!(snapshot.selected().map(<[Todo]>::len), Some(1));
    }

    #[test]
    fn publish_skips_identical_lists() {
        let (output, mut receiver) = watch::channel(Vec::new());
        let snapshot = Snapshot {
            filter: FilterState::Active,
            all: Some(vec![todo(1, false)]),
            active: Some(vec![todo(1, false)]),
            completed: Some(vec![]),
        };

        publish(&output, &snapshot);
        assert!(receiver.has_changed().unwrap());
        receiver.borrow_and_update();

        publish(&output, &snapshot);
        assert!(!receiver.has_changed().unwrap());
    }

    #[test]
    fn idle_check_rearms_after_a_passing_subscriber() {
        let (output, _) = watch::channel(Vec::new());
        let shared = Shared {
            output,
            task: Mutex::new(None),
            generation: AtomicU64::new(3),
        };

        assert_eq!(release_if_idle(&shared, 2), IdleCheck::Rearm(3));

        let receiver = shared.output.subscribe();
        assert_eq!(release_if_idle(&shared, 3), IdleCheck::Observed);

        drop(receiver);
        assert_eq!(release_if_idle(&shared, 3), IdleCheck::Released);
    }
}
