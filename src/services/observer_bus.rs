//! Observer bus for task snapshots.
//!
//! Listeners are invoked synchronously, in subscription order, with a
//! snapshot of the task every time its state changes. A listener that
//! returns an error or panics is logged and skipped; it never stops the
//! pipeline or the listeners after it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc;
use tracing::warn;

use crate::domain::models::Task;

/// Receives task snapshots.
pub trait TaskListener: Send + Sync {
    fn on_task_update(&self, task: &Task) -> anyhow::Result<()>;
}

impl<F> TaskListener for F
where
    F: Fn(&Task) -> anyhow::Result<()> + Send + Sync,
{
    fn on_task_update(&self, task: &Task) -> anyhow::Result<()> {
        self(task)
    }
}

/// Forwards every snapshot into an unbounded channel, for streaming
/// consumers that prefer to `await` updates.
pub struct ChannelListener {
    sender: mpsc::UnboundedSender<Task>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Task>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl TaskListener for ChannelListener {
    fn on_task_update(&self, task: &Task) -> anyhow::Result<()> {
        self.sender
            .send(task.clone())
            .map_err(|_| anyhow::anyhow!("snapshot receiver dropped"))
    }
}

type ListenerEntry = (u64, Arc<dyn TaskListener>);

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<ListenerEntry>>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, Vec<ListenerEntry>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: u64) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(entry_id, _)| *entry_id != id);
        listeners.len() != before
    }
}

/// Handle returned by [`TaskObserverBus::subscribe`].
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Remove the listener. Returns false if it was already removed or the
    /// bus is gone.
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(self.id))
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Publish/subscribe bus pushing task snapshots to listeners.
///
/// Cloning shares the same listener set.
#[derive(Clone, Default)]
pub struct TaskObserverBus {
    registry: Arc<Registry>,
}

impl TaskObserverBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<L>(&self, listener: L) -> Subscription
    where
        L: TaskListener + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.lock().push((id, Arc::new(listener)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Invoke every listener registered when the call starts.
    ///
    /// Returns how many listeners handled the snapshot without error.
    pub fn notify(&self, task: &Task) -> usize {
        // Snapshot the list so listeners can (un)subscribe while running.
        let listeners: Vec<ListenerEntry> = self.registry.lock().clone();
        let mut delivered = 0;

        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener.on_task_update(task))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => {
                    warn!(listener_id = id, task_id = %task.id, error = %err, "Task listener failed");
                }
                Err(_) => {
                    warn!(listener_id = id, task_id = %task.id, "Task listener panicked");
                }
            }
        }

        delivered
    }

    /// Drop every listener.
    pub fn clear(&self) {
        self.registry.lock().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.registry.lock().len()
    }
}

impl std::fmt::Debug for TaskObserverBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskObserverBus")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}
